//! Schema descriptors: what fields exist, their types, defaults and sourcing.
//!
//! A [`Schema`] is a root [`Section`] of [`Descriptor`]s. Each descriptor is
//! either a leaf [`Field`] or a nested [`Section`]. Descriptors are built with
//! consuming builder methods, validated once by [`SchemaBuilder::build`], and
//! never change afterwards. Only the values in a
//! [`ConfigNode`](crate::ConfigNode) do.
//!
//! ```ignore
//! let schema = Schema::builder()
//!     .comment("Settings for myapp")
//!     .field(Field::integer("port").default(8080).comment("Listen port").auto_environ())
//!     .section(Section::new("database").field(Field::string("url")))
//!     .build()?;
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::ClapdeckError;
use crate::naming;
use crate::value::{ConfigType, Value};

/// One configurable leaf field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    config_type: ConfigType,
    default: Option<Value>,
    comment: Option<String>,
    environ_name: Option<String>,
    auto_environ: bool,
    global_name: Option<String>,
    auto_global: bool,
}

impl Field {
    pub fn new(name: &str, config_type: ConfigType) -> Self {
        Self {
            name: name.to_string(),
            config_type,
            default: None,
            comment: None,
            environ_name: None,
            auto_environ: false,
            global_name: None,
            auto_global: false,
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, ConfigType::String)
    }

    pub fn integer(name: &str) -> Self {
        Self::new(name, ConfigType::Integer)
    }

    pub fn float(name: &str) -> Self {
        Self::new(name, ConfigType::Float)
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, ConfigType::Boolean)
    }

    pub fn list(name: &str) -> Self {
        Self::new(name, ConfigType::List)
    }

    pub fn path(name: &str) -> Self {
        Self::new(name, ConfigType::Path)
    }

    /// A field whose type is inferred from its default.
    pub fn with_default(name: &str, default: impl Into<Value>) -> Self {
        let default = default.into();
        Self::new(name, ConfigType::of(&default)).default(default)
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Read this environment variable when no file or code value is set.
    pub fn environ(mut self, name: &str) -> Self {
        self.environ_name = Some(name.to_string());
        self
    }

    /// Read an env var named after the field's path (`sub.nested` → `SUB_NESTED`).
    ///
    /// An explicit [`environ`](Self::environ) name takes precedence over the
    /// derived one; both share the same slot in the resolution order.
    pub fn auto_environ(mut self) -> Self {
        self.auto_environ = true;
        self
    }

    /// Expose this field as a global `--flag` that overrides every other source.
    ///
    /// The name is given in dotted or snake form and displayed dashed.
    pub fn global(mut self, name: &str) -> Self {
        self.global_name = Some(name.to_string());
        self
    }

    /// Like [`global`](Self::global), using the field's qualified path as the name.
    pub fn auto_global(mut self) -> Self {
        self.auto_global = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config_type(&self) -> ConfigType {
        self.config_type
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn comment_text(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// The env var consulted for this field, once the schema is built.
    pub fn environ_name(&self) -> Option<&str> {
        self.environ_name.as_deref()
    }

    pub fn is_auto_environ(&self) -> bool {
        self.auto_environ
    }

    /// The global override name, once the schema is built.
    pub fn global_name(&self) -> Option<&str> {
        self.global_name.as_deref()
    }

    /// The dashed flag (without `--`) for the global override, if any.
    pub fn global_flag(&self) -> Option<String> {
        self.global_name.as_deref().map(naming::to_dashed)
    }
}

/// A named group of descriptors, nested under its own key.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    name: String,
    comment: Option<String>,
    entries: Vec<Descriptor>,
}

/// A schema entry: a leaf field or a nested section.
#[derive(Debug, Clone, PartialEq)]
pub enum Descriptor {
    Field(Field),
    Section(Arc<Section>),
}

impl Descriptor {
    pub fn name(&self) -> &str {
        match self {
            Descriptor::Field(f) => f.name(),
            Descriptor::Section(s) => s.name(),
        }
    }

    pub fn config_type(&self) -> ConfigType {
        match self {
            Descriptor::Field(f) => f.config_type(),
            Descriptor::Section(_) => ConfigType::Section,
        }
    }

    pub fn comment(&self) -> Option<&str> {
        match self {
            Descriptor::Field(f) => f.comment_text(),
            Descriptor::Section(s) => s.comment_text(),
        }
    }
}

impl Section {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            comment: None,
            entries: Vec::new(),
        }
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.entries.push(Descriptor::Field(field));
        self
    }

    pub fn section(mut self, section: Section) -> Self {
        self.entries.push(Descriptor::Section(Arc::new(section)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn comment_text(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &[Descriptor] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&Descriptor> {
        self.entries.iter().find(|d| d.name() == name)
    }

    /// All leaf fields below this section with their dotted paths, depth first.
    pub fn leaves(&self) -> Vec<(String, &Field)> {
        let mut out = Vec::new();
        collect_leaves(self, "", &mut out);
        out
    }

    /// Validate names and defaults, then resolve derived env and global names.
    fn finalize(mut self, prefix: &str, env_prefix: Option<&str>) -> Result<Self, ClapdeckError> {
        let mut seen = HashSet::new();
        let section_label = if prefix.is_empty() { "<root>" } else { prefix };

        for entry in &mut self.entries {
            let name = entry.name().to_string();
            if !naming::is_valid_identifier(&name) {
                return Err(ClapdeckError::InvalidName {
                    name,
                    reason: "config keys may only contain letters, digits, '_' and '-'".into(),
                });
            }
            if !seen.insert(name.clone()) {
                return Err(ClapdeckError::DuplicateField {
                    section: section_label.to_string(),
                    name,
                });
            }
            let path = qualify(prefix, &name);

            match entry {
                Descriptor::Field(field) => finalize_field(field, &path, env_prefix)?,
                Descriptor::Section(section) => {
                    let owned = Arc::unwrap_or_clone(std::mem::replace(
                        section,
                        Arc::new(Section::new("")),
                    ));
                    *section = Arc::new(owned.finalize(&path, env_prefix)?);
                }
            }
        }
        Ok(self)
    }
}

fn finalize_field(field: &mut Field, path: &str, env_prefix: Option<&str>) -> Result<(), ClapdeckError> {
    if field.config_type == ConfigType::Section {
        return Err(ClapdeckError::InvalidDefault {
            key: path.to_string(),
            expected: ConfigType::Section,
            found: "a leaf field; use Section for nesting".into(),
        });
    }
    if let Some(default) = field.default.take() {
        let checked = field
            .config_type
            .coerce(path, default, false)
            .map_err(|e| match e {
                ClapdeckError::TypeMismatch {
                    key,
                    expected,
                    found,
                    ..
                } => ClapdeckError::InvalidDefault {
                    key,
                    expected,
                    found,
                },
                other => other,
            })?;
        field.default = Some(checked);
    }
    if field.environ_name.is_none() && field.auto_environ {
        let derived = naming::to_env_name(path);
        field.environ_name = Some(match env_prefix {
            Some(p) => format!("{p}_{derived}"),
            None => derived,
        });
    }
    if field.global_name.is_none() && field.auto_global {
        field.global_name = Some(path.to_string());
    }
    Ok(())
}

fn collect_leaves<'a>(section: &'a Section, prefix: &str, out: &mut Vec<(String, &'a Field)>) {
    for entry in &section.entries {
        let path = qualify(prefix, entry.name());
        match entry {
            Descriptor::Field(f) => out.push((path, f)),
            Descriptor::Section(s) => collect_leaves(s, &path, out),
        }
    }
}

pub(crate) fn qualify(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// A validated, immutable config schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    root: Arc<Section>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// An empty schema, for apps without configuration.
    pub fn empty() -> Self {
        Self {
            root: Arc::new(Section::new("")),
        }
    }

    /// Build a schema from a tree of defaults, inferring each field's type.
    ///
    /// Objects become sections; `null` becomes an untyped (string) field
    /// without a default.
    ///
    /// ```ignore
    /// let schema = Schema::from_defaults(&json!({
    ///     "config_int": 1,
    ///     "config_nested": { "nested_str": "bar" },
    /// }))?;
    /// ```
    pub fn from_defaults(defaults: &serde_json::Value) -> Result<Self, ClapdeckError> {
        let serde_json::Value::Object(map) = defaults else {
            return Err(ClapdeckError::InvalidDefault {
                key: "<root>".into(),
                expected: ConfigType::Section,
                found: defaults.to_string(),
            });
        };
        let mut builder = Schema::builder();
        builder.root = section_from_defaults(Section::new(""), map)?;
        builder.build()
    }

    pub fn root(&self) -> &Arc<Section> {
        &self.root
    }

    pub fn comment(&self) -> Option<&str> {
        self.root.comment_text()
    }

    /// All leaf fields with their dotted paths.
    pub fn leaves(&self) -> Vec<(String, &Field)> {
        self.root.leaves()
    }

    /// Look up a descriptor by dotted path.
    pub fn lookup(&self, dotted: &str) -> Option<&Descriptor> {
        let mut segments = dotted.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            match current {
                Descriptor::Section(s) => current = s.get(segment)?,
                Descriptor::Field(_) => return None,
            }
        }
        Some(current)
    }
}

fn section_from_defaults(
    mut section: Section,
    map: &serde_json::Map<String, serde_json::Value>,
) -> Result<Section, ClapdeckError> {
    for (key, value) in map {
        section = match value {
            serde_json::Value::Object(inner) => {
                section.section(section_from_defaults(Section::new(key), inner)?)
            }
            serde_json::Value::Null => section.field(Field::string(key)),
            other => {
                let default: Value =
                    serde_json::from_value(other.clone()).map_err(|e| ClapdeckError::InvalidDefault {
                        key: key.clone(),
                        expected: ConfigType::List,
                        found: e.to_string(),
                    })?;
                section.field(Field::with_default(key, default))
            }
        };
    }
    Ok(section)
}

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    root: Section,
    env_prefix: Option<String>,
}

impl Default for Section {
    fn default() -> Self {
        Section::new("")
    }
}

impl SchemaBuilder {
    /// Comment emitted at the top of dumped config files.
    pub fn comment(mut self, comment: &str) -> Self {
        self.root = self.root.comment(comment);
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.root = self.root.field(field);
        self
    }

    pub fn section(mut self, section: Section) -> Self {
        self.root = self.root.section(section);
        self
    }

    /// Prefix for derived env var names (`APP` → `APP_PORT`).
    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Validate and freeze the schema.
    ///
    /// Fails on duplicate or malformed names and on defaults that don't
    /// match their field's type.
    pub fn build(self) -> Result<Schema, ClapdeckError> {
        let root = self.root.finalize("", self.env_prefix.as_deref())?;
        Ok(Schema {
            root: Arc::new(root),
        })
    }
}
