//! YAML via `serde_yaml`.
//!
//! The dump is emitted by hand so each field's comment can sit on the line
//! above it; scalars are still encoded by `serde_yaml`, so strings that would
//! otherwise read back as another type (`"true"`, `"1.0"`) come out quoted.
//! Lists use flow style (`[a, b]`). Keys go through the same encoding, so a
//! field named `null` or `0x1` is written quoted and reads back as itself.

use super::{Codec, ConfigFormat, Loaded, Mapping, Tree, comment_lines};
use crate::value::Value;

const INDENT: &str = "  ";

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl Codec for YamlCodec {
    fn format(&self) -> ConfigFormat {
        ConfigFormat::Yaml
    }

    fn load(&self, text: &str) -> Result<Mapping, String> {
        let doc: serde_yaml::Value = serde_yaml::from_str(text).map_err(|e| e.to_string())?;
        match doc {
            serde_yaml::Value::Null => Ok(Mapping::new()),
            serde_yaml::Value::Mapping(map) => Ok(from_mapping(map)),
            other => Err(format!("expected a mapping at the top level, found {}", kind(&other))),
        }
    }

    fn dump(&self, tree: &Tree) -> Result<String, String> {
        let mut out = String::new();
        if let Some(comment) = &tree.comment {
            out.push_str(&comment_lines(comment, "", "# "));
        }
        write_mapping(&mut out, tree, 0)?;
        Ok(out)
    }
}

fn kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}

fn from_mapping(map: serde_yaml::Mapping) -> Mapping {
    map.into_iter()
        .filter_map(|(key, value)| {
            let key = match key {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                _ => return None,
            };
            Some((key, from_yaml(value)))
        })
        .collect()
}

fn from_yaml(value: serde_yaml::Value) -> Loaded {
    match value {
        serde_yaml::Value::Null => Loaded::Null,
        serde_yaml::Value::Bool(b) => Loaded::Value(Value::Boolean(b)),
        serde_yaml::Value::Number(n) => match n.as_i64() {
            Some(i) => Loaded::Value(Value::Integer(i)),
            None => match n.as_f64() {
                Some(f) => Loaded::Value(Value::Float(f)),
                None => Loaded::Unsupported(format!("number {n}")),
            },
        },
        serde_yaml::Value::String(s) => Loaded::Value(Value::String(s)),
        serde_yaml::Value::Sequence(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                match from_yaml(item) {
                    Loaded::Value(v) => list.push(v),
                    _ => return Loaded::Unsupported("a sequence of mappings or nulls".into()),
                }
            }
            Loaded::Value(Value::List(list))
        }
        serde_yaml::Value::Mapping(map) => Loaded::Section(from_mapping(map)),
        other @ serde_yaml::Value::Tagged(_) => Loaded::Unsupported(kind(&other).into()),
    }
}

fn write_mapping(out: &mut String, tree: &Tree, depth: usize) -> Result<(), String> {
    let indent = INDENT.repeat(depth);
    for entry in &tree.entries {
        if let Some(c) = &entry.comment {
            out.push_str(&comment_lines(c, &indent, "# "));
        }
        let key = encode(&Value::String(entry.key.clone()))?;
        match &entry.item {
            super::TreeItem::Value(value) => {
                let encoded = match value {
                    Some(v) => encode(v)?,
                    None => "null".to_string(),
                };
                out.push_str(&format!("{indent}{key}: {encoded}\n"));
            }
            super::TreeItem::Section(section) if section.entries.is_empty() => {
                out.push_str(&format!("{indent}{key}: {{}}\n"));
            }
            super::TreeItem::Section(section) => {
                out.push_str(&format!("{indent}{key}:\n"));
                write_mapping(out, section, depth + 1)?;
            }
        }
    }
    Ok(())
}

/// Encode a value on a single line.
fn encode(value: &Value) -> Result<String, String> {
    match value {
        Value::List(items) => {
            let parts = items.iter().map(encode).collect::<Result<Vec<_>, _>>()?;
            Ok(format!("[{}]", parts.join(", ")))
        }
        // JSON strings are valid YAML double-quoted scalars and stay on one line.
        Value::String(s) if s.contains('\n') || needs_flow_quoting(s) => {
            serde_json::to_string(s).map_err(|e| e.to_string())
        }
        other => {
            let text = serde_yaml::to_string(other).map_err(|e| e.to_string())?;
            Ok(text.trim_end().to_string())
        }
    }
}

/// Characters that are plain-safe in block context but not inside `[...]`.
fn needs_flow_quoting(s: &str) -> bool {
    s.contains([',', '[', ']', '{', '}'])
}
