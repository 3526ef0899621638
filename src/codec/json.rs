//! JSON via `serde_json`. No comments; keys keep schema order.

use super::{Codec, ConfigFormat, Loaded, Mapping, Tree, TreeItem};
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn format(&self) -> ConfigFormat {
        ConfigFormat::Json
    }

    fn load(&self, text: &str) -> Result<Mapping, String> {
        if text.trim().is_empty() {
            return Ok(Mapping::new());
        }
        match serde_json::from_str(text).map_err(|e| e.to_string())? {
            serde_json::Value::Object(map) => Ok(from_object(map)),
            _ => Err("expected an object at the top level".into()),
        }
    }

    fn dump(&self, tree: &Tree) -> Result<String, String> {
        let mut text = serde_json::to_string_pretty(&to_object(tree)).map_err(|e| e.to_string())?;
        text.push('\n');
        Ok(text)
    }
}

fn from_object(map: serde_json::Map<String, serde_json::Value>) -> Mapping {
    map.into_iter()
        .map(|(key, value)| (key, from_json(value)))
        .collect()
}

fn from_json(value: serde_json::Value) -> Loaded {
    match value {
        serde_json::Value::Null => Loaded::Null,
        serde_json::Value::Object(map) => Loaded::Section(from_object(map)),
        other => match serde_json::from_value::<Value>(other) {
            Ok(v) => Loaded::Value(v),
            Err(e) => Loaded::Unsupported(e.to_string()),
        },
    }
}

fn to_object(tree: &Tree) -> serde_json::Value {
    let map = tree
        .entries
        .iter()
        .map(|entry| {
            let value = match &entry.item {
                TreeItem::Value(Some(v)) => serde_json::to_value(v).unwrap_or(serde_json::Value::Null),
                TreeItem::Value(None) => serde_json::Value::Null,
                TreeItem::Section(section) => to_object(section),
            };
            (entry.key.clone(), value)
        })
        .collect();
    serde_json::Value::Object(map)
}
