use std::path::PathBuf;

use thiserror::Error;

use crate::codec::ConfigFormat;
use crate::value::ConfigType;

/// Exit code for command line usage errors (clap convention).
pub const EXIT_USAGE: u8 = 2;
/// Exit code for configuration and schema errors (sysexits `EX_CONFIG`).
pub const EXIT_CONFIG: u8 = 78;
/// Exit code for a failing command handler.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code after an interrupt (128 + SIGINT).
pub const EXIT_INTERRUPTED: u8 = 130;

/// Where a rejected value came from, for error messages.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Origin {
    /// Set from code (or unknown).
    #[default]
    Code,
    /// Read from a config file.
    File { format: ConfigFormat, path: PathBuf },
    /// Read from an environment variable.
    Env(String),
    /// Passed as a global command line flag.
    Cli(String),
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Code => Ok(()),
            Origin::File { format, path } => write!(f, " in {format} config {}", path.display()),
            Origin::Env(name) => write!(f, " from env var {name}"),
            Origin::Cli(flag) => write!(f, " from --{flag}"),
        }
    }
}

/// The error categories a [`ClapdeckError`] falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed schema or command declarations. Raised before anything runs.
    Schema,
    /// Unreadable or malformed config file, or a value of the wrong type.
    Config,
    /// Command line input does not match the command tree.
    Parse,
    /// Raised by a command handler.
    Handler,
    /// The handler was interrupted.
    Aborted,
}

#[derive(Debug, Error)]
pub enum ClapdeckError {
    #[error("Duplicate config field '{name}' in section '{section}'")]
    DuplicateField { section: String, name: String },

    #[error("Duplicate command '{name}' under '{parent}'")]
    DuplicateCommand { parent: String, name: String },

    #[error("Duplicate global flag '--{flag}'")]
    DuplicateGlobal { flag: String },

    #[error("Invalid argument '{name}' on command '{command}': {reason}")]
    InvalidArgument {
        command: String,
        name: String,
        reason: String,
    },

    #[error("Invalid default for '{key}': expected {expected}, got {found}")]
    InvalidDefault {
        key: String,
        expected: ConfigType,
        found: String,
    },

    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Section '{key}' cannot be exposed as a global flag")]
    UnsupportedGlobal { key: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config {path}: {reason}")]
    Parse {
        format: ConfigFormat,
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to serialize config as {format}: {reason}")]
    Serialize { format: ConfigFormat, reason: String },

    #[error("Invalid value for '{key}'{origin}: expected {expected}, got {found}")]
    TypeMismatch {
        key: String,
        expected: ConfigType,
        found: String,
        origin: Origin,
    },

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("'{0}' is a config section, not a value")]
    NotAValue(String),

    #[error("'{0}' is a value, not a config section")]
    NotASection(String),

    #[error("Config file {0} does not exist")]
    ConfigFileNotFound(PathBuf),

    #[error("No output path for dump-config: pass one or configure a config file")]
    NoDumpPath,

    #[error(transparent)]
    Usage(#[from] clap::Error),

    #[error("{0:#}")]
    Handler(#[from] anyhow::Error),

    #[error("Interrupted")]
    Aborted,
}

impl ClapdeckError {
    /// Attach the source of a rejected value to a type error.
    pub(crate) fn with_origin(self, new_origin: Origin) -> Self {
        match self {
            ClapdeckError::TypeMismatch {
                key,
                expected,
                found,
                ..
            } => ClapdeckError::TypeMismatch {
                key,
                expected,
                found,
                origin: new_origin,
            },
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ClapdeckError::DuplicateField { .. }
            | ClapdeckError::DuplicateCommand { .. }
            | ClapdeckError::DuplicateGlobal { .. }
            | ClapdeckError::InvalidArgument { .. }
            | ClapdeckError::InvalidDefault { .. }
            | ClapdeckError::InvalidName { .. }
            | ClapdeckError::UnsupportedGlobal { .. } => ErrorKind::Schema,
            ClapdeckError::Usage(_) => ErrorKind::Parse,
            ClapdeckError::Handler(_) => ErrorKind::Handler,
            ClapdeckError::Aborted => ErrorKind::Aborted,
            _ => ErrorKind::Config,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Schema | ErrorKind::Config => EXIT_CONFIG,
            ErrorKind::Parse => EXIT_USAGE,
            ErrorKind::Handler => EXIT_FAILURE,
            ErrorKind::Aborted => EXIT_INTERRUPTED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_names_key_and_type() {
        let err = ClapdeckError::TypeMismatch {
            key: "port".into(),
            expected: ConfigType::Integer,
            found: "\"abc\"".into(),
            origin: Origin::Code,
        };
        let msg = err.to_string();
        assert!(msg.contains("port"));
        assert!(msg.contains("integer"));
        assert!(msg.contains("abc"));
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn parse_error_names_format_and_path() {
        let err = ClapdeckError::Parse {
            format: ConfigFormat::Yaml,
            path: "/home/user/.config/myapp/config.yml".into(),
            reason: "bad indentation".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("YAML"));
        assert!(msg.contains("config.yml"));
    }

    #[test]
    fn origin_adds_file_context() {
        let err = ClapdeckError::TypeMismatch {
            key: "port".into(),
            expected: ConfigType::Integer,
            found: "\"abc\"".into(),
            origin: Origin::Code,
        }
        .with_origin(Origin::File {
            format: ConfigFormat::Ini,
            path: "app.ini".into(),
        });
        let msg = err.to_string();
        assert!(msg.contains("INI"));
        assert!(msg.contains("app.ini"));
        assert!(msg.contains("port"));
        assert!(msg.contains("integer"));
    }

    #[test]
    fn schema_errors_are_fatal_config_codes() {
        let err = ClapdeckError::DuplicateField {
            section: "root".into(),
            name: "port".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Schema);
        assert_eq!(err.exit_code(), EXIT_CONFIG);
    }

    #[test]
    fn handler_and_abort_exit_codes() {
        let err = ClapdeckError::from(anyhow::anyhow!("boom"));
        assert_eq!(err.exit_code(), EXIT_FAILURE);
        assert!(err.to_string().contains("boom"));
        assert_eq!(ClapdeckError::Aborted.exit_code(), EXIT_INTERRUPTED);
    }
}
