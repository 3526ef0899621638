//! The resolved config tree.
//!
//! A [`ConfigNode`] holds the effective value of every field in one
//! [`Section`], plus one child node per nested section. Nodes own their
//! children exclusively; instead of a parent pointer each node carries its
//! dotted path from the root, which is what error messages and env/global
//! naming need.
//!
//! Values set through [`ConfigNode::set`] are code-level values: they are
//! marked [`Source::Code`] and survive resolution against files and env vars.
//! Only a global CLI override can replace them.

use std::path::PathBuf;
use std::sync::Arc;

use crate::codec::{Tree, TreeEntry, TreeItem};
use crate::error::ClapdeckError;
use crate::schema::{Descriptor, Field, Schema, Section, qualify};
use crate::value::{ConfigType, Value};

/// Which layer supplied a field's current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Default,
    Env,
    File,
    Code,
    Cli,
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Value { value: Option<Value>, source: Source },
    Section(ConfigNode),
}

/// Resolved values for one section of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigNode {
    section: Arc<Section>,
    path: String,
    slots: Vec<Slot>,
}

impl ConfigNode {
    /// A root node holding every field's default.
    pub fn new(schema: &Schema) -> Self {
        Self::for_section(Arc::clone(schema.root()), String::new())
    }

    fn for_section(section: Arc<Section>, path: String) -> Self {
        let slots = section
            .entries()
            .iter()
            .map(|entry| match entry {
                Descriptor::Field(f) => Slot::Value {
                    value: f.default_value().cloned(),
                    source: Source::Default,
                },
                Descriptor::Section(s) => {
                    Slot::Section(Self::for_section(Arc::clone(s), qualify(&path, s.name())))
                }
            })
            .collect();
        Self {
            section,
            path,
            slots,
        }
    }

    /// Dotted path of this node from the root (empty for the root).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The section descriptor this node resolves.
    pub fn schema(&self) -> &Section {
        &self.section
    }

    fn key(&self, name: &str) -> String {
        qualify(&self.path, name)
    }

    fn index(&self, name: &str) -> Result<usize, ClapdeckError> {
        self.section
            .entries()
            .iter()
            .position(|d| d.name() == name)
            .ok_or_else(|| ClapdeckError::KeyNotFound(self.key(name)))
    }

    fn field(&self, idx: usize) -> Option<&Field> {
        match &self.section.entries()[idx] {
            Descriptor::Field(f) => Some(f),
            Descriptor::Section(_) => None,
        }
    }

    /// Current value of a field in this section. `None` means null/unset.
    pub fn get(&self, name: &str) -> Result<Option<&Value>, ClapdeckError> {
        let idx = self.index(name)?;
        match &self.slots[idx] {
            Slot::Value { value, .. } => Ok(value.as_ref()),
            Slot::Section(_) => Err(ClapdeckError::NotAValue(self.key(name))),
        }
    }

    pub fn get_str(&self, name: &str) -> Result<Option<&str>, ClapdeckError> {
        Ok(self.get(name)?.and_then(Value::as_str))
    }

    pub fn get_int(&self, name: &str) -> Result<Option<i64>, ClapdeckError> {
        Ok(self.get(name)?.and_then(Value::as_integer))
    }

    pub fn get_float(&self, name: &str) -> Result<Option<f64>, ClapdeckError> {
        Ok(self.get(name)?.and_then(Value::as_float))
    }

    pub fn get_bool(&self, name: &str) -> Result<Option<bool>, ClapdeckError> {
        Ok(self.get(name)?.and_then(Value::as_bool))
    }

    pub fn get_list(&self, name: &str) -> Result<Option<&[Value]>, ClapdeckError> {
        Ok(self.get(name)?.and_then(Value::as_list))
    }

    pub fn get_path(&self, name: &str) -> Result<Option<PathBuf>, ClapdeckError> {
        Ok(self.get_str(name)?.map(PathBuf::from))
    }

    /// Which layer supplied a field's current value.
    pub fn source(&self, name: &str) -> Result<Source, ClapdeckError> {
        let idx = self.index(name)?;
        match &self.slots[idx] {
            Slot::Value { source, .. } => Ok(*source),
            Slot::Section(_) => Err(ClapdeckError::NotAValue(self.key(name))),
        }
    }

    /// The child node for a nested section. The child is live, not a copy.
    pub fn section(&self, name: &str) -> Result<&ConfigNode, ClapdeckError> {
        let idx = self.index(name)?;
        match &self.slots[idx] {
            Slot::Section(node) => Ok(node),
            Slot::Value { .. } => Err(ClapdeckError::NotASection(self.key(name))),
        }
    }

    pub fn section_mut(&mut self, name: &str) -> Result<&mut ConfigNode, ClapdeckError> {
        let idx = self.index(name)?;
        let key = self.key(name);
        match &mut self.slots[idx] {
            Slot::Section(node) => Ok(node),
            Slot::Value { .. } => Err(ClapdeckError::NotASection(key)),
        }
    }

    /// Set a code-level value. The value must match the field's type.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ClapdeckError> {
        self.assign(name, Some(value.into()), Source::Code, false)
    }

    /// Set a field to null at code level.
    pub fn set_null(&mut self, name: &str) -> Result<(), ClapdeckError> {
        self.assign(name, None, Source::Code, false)
    }

    /// Drop any value for the field and fall back to its default.
    pub fn unset(&mut self, name: &str) -> Result<(), ClapdeckError> {
        let idx = self.index(name)?;
        let default = self
            .field(idx)
            .ok_or_else(|| ClapdeckError::NotAValue(self.key(name)))?
            .default_value()
            .cloned();
        self.slots[idx] = Slot::Value {
            value: default,
            source: Source::Default,
        };
        Ok(())
    }

    /// Store a value after checking it against the field's type.
    pub(crate) fn assign(
        &mut self,
        name: &str,
        value: Option<Value>,
        source: Source,
        lenient: bool,
    ) -> Result<(), ClapdeckError> {
        let idx = self.index(name)?;
        let key = self.key(name);
        let field = self
            .field(idx)
            .ok_or_else(|| ClapdeckError::NotAValue(key.clone()))?;
        let checked = match value {
            Some(v) => Some(field.config_type().coerce(&key, v, lenient)?),
            None => None,
        };
        self.slots[idx] = Slot::Value {
            value: checked,
            source,
        };
        Ok(())
    }

    /// Walk to the node owning the last segment of a dotted path.
    fn owner(&self, dotted: &str) -> Result<(&ConfigNode, String), ClapdeckError> {
        let (parents, leaf) = match dotted.rsplit_once('.') {
            Some((p, l)) => (Some(p), l),
            None => (None, dotted),
        };
        let mut node = self;
        if let Some(parents) = parents {
            for segment in parents.split('.') {
                node = node.section(segment)?;
            }
        }
        Ok((node, leaf.to_string()))
    }

    fn owner_mut(&mut self, dotted: &str) -> Result<(&mut ConfigNode, String), ClapdeckError> {
        let (parents, leaf) = match dotted.rsplit_once('.') {
            Some((p, l)) => (Some(p), l.to_string()),
            None => (None, dotted.to_string()),
        };
        let mut node = self;
        if let Some(parents) = parents {
            for segment in parents.split('.') {
                node = node.section_mut(segment)?;
            }
        }
        Ok((node, leaf))
    }

    /// Look up a value by dotted path, e.g. `"sub.nested"`.
    pub fn lookup(&self, dotted: &str) -> Result<Option<&Value>, ClapdeckError> {
        let (node, leaf) = self.owner(dotted)?;
        node.get(&leaf)
    }

    /// Which layer supplied the value at a dotted path.
    pub fn source_at(&self, dotted: &str) -> Result<Source, ClapdeckError> {
        let (node, leaf) = self.owner(dotted)?;
        node.source(&leaf)
    }

    /// Set a code-level value by dotted path.
    pub fn set_path(&mut self, dotted: &str, value: impl Into<Value>) -> Result<(), ClapdeckError> {
        let (node, leaf) = self.owner_mut(dotted)?;
        node.set(&leaf, value)
    }

    pub(crate) fn assign_path(
        &mut self,
        dotted: &str,
        value: Option<Value>,
        source: Source,
        lenient: bool,
    ) -> Result<(), ClapdeckError> {
        let (node, leaf) = self.owner_mut(dotted)?;
        node.assign(&leaf, value, source, lenient)
    }

    /// Set many code-level values from a nested JSON object.
    ///
    /// Keys must exist in the schema; nested objects address sections.
    pub fn read_values(&mut self, values: &serde_json::Value) -> Result<(), ClapdeckError> {
        let serde_json::Value::Object(map) = values else {
            return Err(ClapdeckError::NotASection(self.path.clone()));
        };
        for (key, value) in map {
            match value {
                serde_json::Value::Object(_) => self.section_mut(key)?.read_values(value)?,
                serde_json::Value::Null => self.set_null(key)?,
                other => {
                    let v: Value = serde_json::from_value(other.clone()).map_err(|_| {
                        ClapdeckError::TypeMismatch {
                            key: self.key(key),
                            expected: ConfigType::List,
                            found: other.to_string(),
                            origin: Default::default(),
                        }
                    })?;
                    self.set(key, v)?;
                }
            }
        }
        Ok(())
    }

    /// All leaf values as `(dotted_path, value)` pairs, in schema order.
    pub fn flatten(&self) -> Vec<(String, Option<Value>)> {
        let mut out = Vec::new();
        for (entry, slot) in self.section.entries().iter().zip(&self.slots) {
            match slot {
                Slot::Value { value, .. } => out.push((self.key(entry.name()), value.clone())),
                Slot::Section(node) => out.extend(node.flatten()),
            }
        }
        out
    }

    /// Snapshot the current values, with comments, for a codec to dump.
    pub fn to_tree(&self) -> Tree {
        let entries = self
            .section
            .entries()
            .iter()
            .zip(&self.slots)
            .map(|(entry, slot)| TreeEntry {
                key: entry.name().to_string(),
                comment: entry.comment().map(str::to_string),
                item: match slot {
                    Slot::Value { value, .. } => TreeItem::Value(value.clone()),
                    Slot::Section(node) => TreeItem::Section(node.to_tree()),
                },
            })
            .collect();
        Tree {
            comment: self.section.comment_text().map(str::to_string),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::test_schema;

    #[test]
    fn new_node_holds_defaults() {
        let node = ConfigNode::new(&test_schema());
        assert_eq!(node.get_str("host").unwrap(), Some("localhost"));
        assert_eq!(node.get_int("port").unwrap(), Some(8080));
        assert_eq!(node.get_bool("debug").unwrap(), Some(false));
        assert!(matches!(node.get("database"), Err(ClapdeckError::NotAValue(_))));
        assert_eq!(node.source("port").unwrap(), Source::Default);
    }

    #[test]
    fn nested_section_proxy() {
        let node = ConfigNode::new(&test_schema());
        let sub = node.section("sub").unwrap();
        assert_eq!(sub.get_str("nested").unwrap(), Some("Default"));
        assert_eq!(sub.path(), "sub");
        assert_eq!(
            node.lookup("sub.deeper.level").unwrap(),
            Some(&Value::Float(2.2))
        );
    }

    #[test]
    fn set_through_section_is_visible_from_root() {
        let mut node = ConfigNode::new(&test_schema());
        node.section_mut("sub").unwrap().set("nested", "changed").unwrap();
        assert_eq!(node.lookup("sub.nested").unwrap(), Some(&Value::from("changed")));
        assert_eq!(node.source_at("sub.nested").unwrap(), Source::Code);
    }

    #[test]
    fn set_rejects_wrong_type() {
        let mut node = ConfigNode::new(&test_schema());
        let err = node.set("port", "abc").unwrap_err();
        assert!(matches!(err, ClapdeckError::TypeMismatch { ref key, .. } if key == "port"));
        // value untouched
        assert_eq!(node.get_int("port").unwrap(), Some(8080));
    }

    #[test]
    fn set_path_type_error_names_qualified_key() {
        let mut node = ConfigNode::new(&test_schema());
        let err = node.set_path("database.pool_size", "lots").unwrap_err();
        assert!(err.to_string().contains("database.pool_size"));
    }

    #[test]
    fn unknown_key_errors() {
        let node = ConfigNode::new(&test_schema());
        assert!(matches!(node.get("nope"), Err(ClapdeckError::KeyNotFound(_))));
        assert!(matches!(node.section("port"), Err(ClapdeckError::NotASection(_))));
    }

    #[test]
    fn unset_restores_default() {
        let mut node = ConfigNode::new(&test_schema());
        node.set("port", 1).unwrap();
        node.unset("port").unwrap();
        assert_eq!(node.get_int("port").unwrap(), Some(8080));
        assert_eq!(node.source("port").unwrap(), Source::Default);
    }

    #[test]
    fn set_null_is_code_level() {
        let mut node = ConfigNode::new(&test_schema());
        node.set_null("host").unwrap();
        assert_eq!(node.get("host").unwrap(), None);
        assert_eq!(node.source("host").unwrap(), Source::Code);
    }

    #[test]
    fn instances_do_not_share_values() {
        let schema = test_schema();
        let mut a = ConfigNode::new(&schema);
        let b = ConfigNode::new(&schema);
        a.set_path("sub.nested", "only a").unwrap();
        assert_eq!(b.lookup("sub.nested").unwrap(), Some(&Value::from("Default")));
    }

    #[test]
    fn read_values_sets_nested_code_values() {
        let mut node = ConfigNode::new(&test_schema());
        node.read_values(&serde_json::json!({
            "port": 22,
            "tags": ["a", "b"],
            "sub": { "nested": "hello", "deeper": { "level": 77.77 } },
        }))
        .unwrap();
        assert_eq!(node.get_int("port").unwrap(), Some(22));
        assert_eq!(node.lookup("sub.deeper.level").unwrap(), Some(&Value::Float(77.77)));
        assert_eq!(node.source_at("sub.nested").unwrap(), Source::Code);
    }

    #[test]
    fn read_values_rejects_unknown_key() {
        let mut node = ConfigNode::new(&test_schema());
        let result = node.read_values(&serde_json::json!({ "nope": 1 }));
        assert!(matches!(result, Err(ClapdeckError::KeyNotFound(_))));
    }

    #[test]
    fn flatten_lists_every_leaf() {
        let node = ConfigNode::new(&test_schema());
        let flat = node.flatten();
        assert_eq!(flat.len(), 9);
        assert!(flat.contains(&("database.url".to_string(), None)));
    }

    #[test]
    fn to_tree_carries_comments() {
        let node = ConfigNode::new(&test_schema());
        let tree = node.to_tree();
        assert_eq!(tree.comment.as_deref(), Some("Test application settings"));
        let port = tree.entries.iter().find(|e| e.key == "port").unwrap();
        assert_eq!(port.comment.as_deref(), Some("The port number."));
        assert!(matches!(port.item, TreeItem::Value(Some(Value::Integer(8080)))));
    }
}
