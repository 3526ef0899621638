//! Tagged config values and the closed set of config types.
//!
//! Every resolved value is a [`Value`]. Codecs convert between their native
//! representation and `Value` at the boundary; everything past the codec works
//! on `Value` and [`ConfigType`] only.
//!
//! Coercion has two modes:
//!
//! - **strict**: the value must already have the right shape. An integer is
//!   accepted for a float field; nothing else is converted. Used for TOML,
//!   JSON and values set from code.
//! - **lenient**: strings are parsed into the target type and scalars are
//!   stringified for string fields. Used for YAML, INI, env vars and CLI
//!   flags, where the source either has no types or guesses them.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ClapdeckError, Origin};

/// A single config value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
}

impl Value {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, and integers widened to floats.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Render for display, without quotes around strings.
    pub fn display(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Literal form: strings are quoted, lists use brackets.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<PathBuf> for Value {
    fn from(v: PathBuf) -> Self {
        Value::String(v.to_string_lossy().into_owned())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

/// The declared type of a config field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigType {
    String,
    Integer,
    Float,
    Boolean,
    List,
    /// A filesystem path, stored as a string.
    Path,
    /// A nested section. Never holds a [`Value`] directly.
    Section,
}

impl fmt::Display for ConfigType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigType::String => "string",
            ConfigType::Integer => "integer",
            ConfigType::Float => "float",
            ConfigType::Boolean => "boolean",
            ConfigType::List => "list",
            ConfigType::Path => "path",
            ConfigType::Section => "section",
        };
        f.write_str(name)
    }
}

impl ConfigType {
    /// Infer the type of a default value.
    pub fn of(value: &Value) -> ConfigType {
        match value {
            Value::Boolean(_) => ConfigType::Boolean,
            Value::Integer(_) => ConfigType::Integer,
            Value::Float(_) => ConfigType::Float,
            Value::String(_) => ConfigType::String,
            Value::List(_) => ConfigType::List,
        }
    }

    /// Check `value` against this type, converting where the mode allows.
    ///
    /// `key` is only used for the error message.
    pub fn coerce(self, key: &str, value: Value, lenient: bool) -> Result<Value, ClapdeckError> {
        let mismatch = |value: &Value| ClapdeckError::TypeMismatch {
            key: key.to_string(),
            expected: self,
            found: value.to_string(),
            origin: Origin::Code,
        };

        match (self, value) {
            (ConfigType::String | ConfigType::Path, Value::String(s)) => Ok(Value::String(s)),
            (ConfigType::Integer, Value::Integer(i)) => Ok(Value::Integer(i)),
            (ConfigType::Float, Value::Float(f)) => Ok(Value::Float(f)),
            (ConfigType::Float, Value::Integer(i)) => Ok(Value::Float(i as f64)),
            (ConfigType::Boolean, Value::Boolean(b)) => Ok(Value::Boolean(b)),
            (ConfigType::List, Value::List(items)) => Ok(Value::List(items)),
            (ty, Value::String(s)) if lenient => ty.parse_str(key, &s),
            (ConfigType::String | ConfigType::Path, v @ (Value::Integer(_) | Value::Float(_) | Value::Boolean(_)))
                if lenient =>
            {
                Ok(Value::String(v.display()))
            }
            (ConfigType::Integer, Value::Float(f)) if lenient && f.fract() == 0.0 => {
                Ok(Value::Integer(f as i64))
            }
            (_, v) => Err(mismatch(&v)),
        }
    }

    /// Parse a raw string (env var, INI value, CLI flag) as this type.
    pub fn parse_str(self, key: &str, raw: &str) -> Result<Value, ClapdeckError> {
        let mismatch = || ClapdeckError::TypeMismatch {
            key: key.to_string(),
            expected: self,
            found: format!("{raw:?}"),
            origin: Origin::Code,
        };
        let trimmed = raw.trim();

        match self {
            ConfigType::String | ConfigType::Path => Ok(Value::String(raw.to_string())),
            ConfigType::Integer => trimmed
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| mismatch()),
            ConfigType::Float => trimmed
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| mismatch()),
            ConfigType::Boolean => parse_bool(trimmed).map(Value::Boolean).ok_or_else(mismatch),
            ConfigType::List => parse_list(trimmed).ok_or_else(mismatch),
            ConfigType::Section => Err(mismatch()),
        }
    }
}

/// Accepts the usual spellings: true/false, yes/no, on/off, 1/0.
fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// A JSON array, or a bare comma-separated list of scalars.
fn parse_list(s: &str) -> Option<Value> {
    if s.is_empty() {
        return Some(Value::List(vec![]));
    }
    if s.starts_with('[') {
        let parsed: Vec<Value> = serde_json::from_str(s).ok()?;
        return Some(Value::List(parsed));
    }
    let items = s.split(',').map(|item| guess_scalar(item.trim())).collect();
    Some(Value::List(items))
}

/// Heuristic scalar parse: bool > integer > float > string.
fn guess_scalar(s: &str) -> Value {
    if s.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if s.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    if s.contains('.')
        && let Ok(f) = s.parse::<f64>()
    {
        return Value::Float(f);
    }
    Value::String(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_accepts_matching_types() {
        let v = ConfigType::Integer.coerce("port", Value::Integer(8080), false).unwrap();
        assert_eq!(v, Value::Integer(8080));
    }

    #[test]
    fn strict_widens_integer_to_float() {
        let v = ConfigType::Float.coerce("rate", Value::Integer(2), false).unwrap();
        assert_eq!(v, Value::Float(2.0));
    }

    #[test]
    fn strict_rejects_string_for_integer() {
        let err = ConfigType::Integer
            .coerce("port", Value::String("abc".into()), false)
            .unwrap_err();
        match err {
            ClapdeckError::TypeMismatch { key, expected, .. } => {
                assert_eq!(key, "port");
                assert_eq!(expected, ConfigType::Integer);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn strict_rejects_number_for_string() {
        assert!(ConfigType::String.coerce("name", Value::Integer(1), false).is_err());
    }

    #[test]
    fn lenient_parses_numeric_string() {
        let v = ConfigType::Integer
            .coerce("port", Value::String("3000".into()), true)
            .unwrap();
        assert_eq!(v, Value::Integer(3000));
    }

    #[test]
    fn lenient_still_rejects_garbage() {
        let err = ConfigType::Float
            .coerce("rate", Value::String("fast".into()), true)
            .unwrap_err();
        assert!(err.to_string().contains("rate"));
        assert!(err.to_string().contains("float"));
    }

    #[test]
    fn lenient_stringifies_scalars() {
        let v = ConfigType::String.coerce("name", Value::Integer(7), true).unwrap();
        assert_eq!(v, Value::String("7".into()));
    }

    #[test]
    fn path_accepts_strings() {
        let v = ConfigType::Path
            .coerce("dir", Value::String("/tmp".into()), false)
            .unwrap();
        assert_eq!(v.as_str(), Some("/tmp"));
    }

    #[test]
    fn parse_bool_spellings() {
        for s in ["true", "True", "yes", "on", "1"] {
            assert_eq!(parse_bool(s), Some(true), "{s}");
        }
        for s in ["false", "FALSE", "no", "off", "0"] {
            assert_eq!(parse_bool(s), Some(false), "{s}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_list_json() {
        let v = ConfigType::List.parse_str("items", "[5, 4, 5]").unwrap();
        assert_eq!(v, Value::from(vec![5i64, 4, 5]));
    }

    #[test]
    fn parse_list_comma_separated() {
        let v = ConfigType::List.parse_str("items", "a, b, 3").unwrap();
        assert_eq!(
            v,
            Value::List(vec!["a".into(), "b".into(), Value::Integer(3)])
        );
    }

    #[test]
    fn parse_empty_list() {
        let v = ConfigType::List.parse_str("items", "").unwrap();
        assert_eq!(v, Value::List(vec![]));
    }

    #[test]
    fn string_keeps_raw_text() {
        let v = ConfigType::String.parse_str("name", " padded ").unwrap();
        assert_eq!(v.as_str(), Some(" padded "));
    }

    #[test]
    fn display_quotes_strings() {
        assert_eq!(Value::from("x").to_string(), "\"x\"");
        assert_eq!(Value::from("x").display(), "x");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::from(vec![1i64, 2]).to_string(), "[1, 2]");
    }

    #[test]
    fn guess_scalar_order() {
        assert_eq!(guess_scalar("TRUE"), Value::Boolean(true));
        assert_eq!(guess_scalar("-5"), Value::Integer(-5));
        assert_eq!(guess_scalar("1.5"), Value::Float(1.5));
        assert_eq!(guess_scalar("inf"), Value::String("inf".into()));
    }
}
