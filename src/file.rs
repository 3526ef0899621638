//! Config file discovery.
//!
//! An app is given an ordered list of [`SearchPath`]s. Each one resolves to a
//! single candidate file: directory variants are joined with the app's config
//! file name, [`SearchPath::File`] is used as is. The **first** candidate
//! that exists is the config file; the rest are never read.
//!
//! Missing files are skipped. Only real I/O errors (permissions, a directory
//! where a file should be) are propagated.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ClapdeckError;

/// Where to look for the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".myapp".into())`.
    Home(String),
    /// Current working directory.
    Cwd,
    /// An explicit directory.
    Dir(PathBuf),
    /// An explicit file; the config file name is not appended.
    File(PathBuf),
}

impl SearchPath {
    /// Resolve to a candidate file path.
    ///
    /// `None` if the location can't be determined (no home directory).
    pub fn candidate(&self, app_name: &str, file_name: &str) -> Option<PathBuf> {
        match self {
            SearchPath::Platform => {
                let proj = directories::ProjectDirs::from("", "", app_name)?;
                Some(proj.config_dir().join(file_name))
            }
            SearchPath::Home(subdir) => {
                let user = directories::UserDirs::new()?;
                Some(user.home_dir().join(subdir).join(file_name))
            }
            SearchPath::Cwd => std::env::current_dir().ok().map(|d| d.join(file_name)),
            SearchPath::Dir(dir) => Some(dir.join(file_name)),
            SearchPath::File(path) => Some(path.clone()),
        }
    }
}

impl From<PathBuf> for SearchPath {
    fn from(path: PathBuf) -> Self {
        SearchPath::File(path)
    }
}

impl From<&Path> for SearchPath {
    fn from(path: &Path) -> Self {
        SearchPath::File(path.to_path_buf())
    }
}

impl From<&str> for SearchPath {
    fn from(path: &str) -> Self {
        SearchPath::File(PathBuf::from(path))
    }
}

/// All candidate files, in priority order.
pub fn candidate_paths(search_paths: &[SearchPath], app_name: &str, file_name: &str) -> Vec<PathBuf> {
    search_paths
        .iter()
        .filter_map(|sp| sp.candidate(app_name, file_name))
        .collect()
}

/// Read the first candidate that exists.
pub fn load_first(candidates: &[PathBuf]) -> Result<Option<(PathBuf, String)>, ClapdeckError> {
    for path in candidates {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "using config file");
                return Ok(Some((path.clone(), content)));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "config file not found, skipping");
            }
            Err(e) => {
                return Err(ClapdeckError::Io {
                    path: path.clone(),
                    source: e,
                });
            }
        }
    }
    Ok(None)
}

/// Read a file the user named explicitly. Unlike candidates, it must exist.
pub fn load_required(path: &Path) -> Result<String, ClapdeckError> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ClapdeckError::ConfigFileNotFound(path.to_path_buf())
        } else {
            ClapdeckError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

/// Write `content` to `path`, creating parent directories as needed.
pub fn write_file(path: &Path, content: &str) -> Result<(), ClapdeckError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| ClapdeckError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, content).map_err(|e| ClapdeckError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn dir_candidate_joins_file_name() {
        let sp = SearchPath::Dir(PathBuf::from("/etc/myapp"));
        assert_eq!(
            sp.candidate("ignored", "config.toml"),
            Some(PathBuf::from("/etc/myapp/config.toml"))
        );
    }

    #[test]
    fn file_candidate_is_used_as_is() {
        let sp = SearchPath::from("/tmp/custom.yml");
        assert_eq!(sp.candidate("ignored", "config.toml"), Some(PathBuf::from("/tmp/custom.yml")));
    }

    #[test]
    fn no_candidates_exist() {
        let dir = TempDir::new().unwrap();
        let found = load_first(&[dir.path().join("a.toml"), dir.path().join("b.toml")]).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn falls_back_to_later_candidate() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.toml");
        let b = dir.path().join("b.toml");
        fs::write(&b, "port = 1\n").unwrap();
        let (path, content) = load_first(&[a, b.clone()]).unwrap().unwrap();
        assert_eq!(path, b);
        assert_eq!(content, "port = 1\n");
    }

    #[test]
    fn first_existing_wins() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.toml");
        let b = dir.path().join("b.toml");
        fs::write(&a, "host = \"first\"\n").unwrap();
        fs::write(&b, "host = \"second\"\n").unwrap();
        let (path, content) = load_first(&[a.clone(), b]).unwrap().unwrap();
        assert_eq!(path, a);
        assert!(content.contains("first"));
    }

    #[test]
    fn directory_in_place_of_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let result = load_first(&[dir.path().to_path_buf()]);
        assert!(matches!(result, Err(ClapdeckError::Io { .. })));
    }

    #[test]
    fn required_file_must_exist() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            load_required(&missing),
            Err(ClapdeckError::ConfigFileNotFound(p)) if p == missing
        ));
    }

    #[test]
    fn write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("out.toml");
        write_file(&path, "x = 1\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "x = 1\n");
    }

    #[test]
    fn candidate_paths_keeps_order() {
        let paths = candidate_paths(
            &[SearchPath::Dir("/one".into()), SearchPath::File("/two/x.ini".into())],
            "app",
            "app.toml",
        );
        assert_eq!(paths, vec![PathBuf::from("/one/app.toml"), PathBuf::from("/two/x.ini")]);
    }
}
