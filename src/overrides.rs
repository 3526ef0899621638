//! Global CLI flags bound to config fields.
//!
//! Every field with a global name contributes one `--flag` that is accepted
//! before or after any sub-command and overrides every other source for that
//! field. Values are type-checked by clap, so a malformed override is a usage
//! error rather than a config error.

use std::collections::HashSet;

use clap::{Arg, ArgAction, ArgMatches};

use crate::error::ClapdeckError;
use crate::schema::Schema;
use crate::value::ConfigType;

/// Arg ids are namespaced so they never clash with command arguments.
const ID_PREFIX: &str = "config:";

/// A config field exposed as a global flag.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalOverride {
    /// Dotted path of the field.
    pub key: String,
    /// Dashed flag name, without `--`.
    pub flag: String,
    pub config_type: ConfigType,
    pub help: Option<String>,
}

impl GlobalOverride {
    fn id(&self) -> String {
        format!("{ID_PREFIX}{}", self.key)
    }

    /// The clap argument for this flag.
    pub fn arg(&self) -> Arg {
        let key = self.key.clone();
        let ty = self.config_type;
        let mut arg = Arg::new(self.id())
            .long(self.flag.clone())
            .global(true)
            .action(ArgAction::Set)
            .value_name(ty.to_string().to_uppercase())
            .value_parser(move |raw: &str| {
                ty.parse_str(&key, raw)
                    .map(|_| raw.to_string())
                    .map_err(|e| e.to_string())
            });
        if ty == ConfigType::Boolean {
            // `--debug` alone means true; `--debug=false` is still possible.
            arg = arg
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true");
        }
        if let Some(help) = &self.help {
            arg = arg.help(help.clone());
        }
        arg
    }
}

/// Collect the global flags a schema declares.
///
/// Fails if two fields map to the same flag or a flag clashes with `reserved`
/// (the app's built-in and user-declared global arguments).
pub fn global_overrides(
    schema: &Schema,
    reserved: &[&str],
) -> Result<Vec<GlobalOverride>, ClapdeckError> {
    let mut seen: HashSet<String> = reserved.iter().map(|s| s.to_string()).collect();
    let mut out = Vec::new();
    for (key, field) in schema.leaves() {
        let Some(flag) = field.global_flag() else {
            continue;
        };
        if flag.is_empty() {
            return Err(ClapdeckError::InvalidName {
                name: key,
                reason: "global flag name is empty".into(),
            });
        }
        if !seen.insert(flag.clone()) {
            return Err(ClapdeckError::DuplicateGlobal { flag });
        }
        out.push(GlobalOverride {
            key,
            flag,
            config_type: field.config_type(),
            help: field.comment_text().map(str::to_string),
        });
    }
    Ok(out)
}

/// A global override given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct CliOverride {
    pub key: String,
    pub flag: String,
    pub raw: String,
}

/// Read the override values out of parsed matches.
///
/// Pass the matches of the deepest sub-command: clap propagates global values
/// downward, so the leaf sees flags given at any level.
pub fn overrides_from_matches(globals: &[GlobalOverride], matches: &ArgMatches) -> Vec<CliOverride> {
    globals
        .iter()
        .filter_map(|g| {
            let raw = matches.try_get_one::<String>(&g.id()).ok().flatten()?;
            Some(CliOverride {
                key: g.key.clone(),
                flag: g.flag.clone(),
                raw: raw.clone(),
            })
        })
        .collect()
}
