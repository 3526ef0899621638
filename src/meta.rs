//! Build a [`Schema`] from a [`confique::Config`] struct.
//!
//! Deriving `confique::Config` marks a struct as a config definition; this
//! module walks its `META` tree so the struct can serve as the schema:
//!
//! - `///` doc comments become field and section comments.
//! - `#[config(default = ...)]` becomes the field default, and its type
//!   decides the field's [`ConfigType`].
//! - `#[config(env = "...")]` becomes the field's env var.
//! - `#[config(nested)]` becomes a [`Section`].
//!
//! Fields without a default carry no type information in `META` and are
//! declared as strings.

use confique::Config;
use confique::meta::{Expr, FieldKind, LeafKind, Meta};

use crate::error::ClapdeckError;
use crate::schema::{Field, Schema, Section};
use crate::value::{ConfigType, Value};

/// Derive a schema from a confique config type.
pub fn schema_from_config<C: Config>() -> Result<Schema, ClapdeckError> {
    let meta = &C::META;
    let mut builder = Schema::builder();
    if let Some(comment) = join_doc(meta.doc) {
        builder = builder.comment(&comment);
    }
    let root = section_from_meta(Section::new(""), meta)?;
    for entry in root.entries() {
        builder = match entry {
            crate::schema::Descriptor::Field(f) => builder.field(f.clone()),
            crate::schema::Descriptor::Section(s) => builder.section((**s).clone()),
        };
    }
    builder.build()
}

fn section_from_meta(mut section: Section, meta: &Meta) -> Result<Section, ClapdeckError> {
    for field in meta.fields {
        let doc = join_doc(field.doc);
        section = match &field.kind {
            FieldKind::Nested { meta: nested, .. } => {
                let mut child = section_from_meta(Section::new(field.name), nested)?;
                if let Some(doc) = &doc {
                    child = child.comment(doc);
                }
                section.section(child)
            }
            FieldKind::Leaf { env, kind, .. } => {
                let mut leaf = match leaf_default(field.name, kind)? {
                    Some(default) => Field::with_default(field.name, default),
                    None => Field::new(field.name, ConfigType::String),
                };
                if let Some(doc) = &doc {
                    leaf = leaf.comment(doc);
                }
                if let Some(env) = env {
                    leaf = leaf.environ(env);
                }
                section.field(leaf)
            }
            #[allow(unreachable_patterns)]
            _ => section,
        };
    }
    Ok(section)
}

fn leaf_default(name: &str, kind: &LeafKind) -> Result<Option<Value>, ClapdeckError> {
    match kind {
        LeafKind::Required {
            default: Some(expr),
            ..
        } => expr_to_value(name, expr).map(Some),
        _ => Ok(None),
    }
}

fn expr_to_value(name: &str, expr: &Expr) -> Result<Value, ClapdeckError> {
    let json = serde_json::to_value(expr).map_err(|e| ClapdeckError::InvalidDefault {
        key: name.to_string(),
        expected: ConfigType::String,
        found: e.to_string(),
    })?;
    serde_json::from_value(json.clone()).map_err(|_| ClapdeckError::InvalidDefault {
        key: name.to_string(),
        expected: ConfigType::List,
        found: json.to_string(),
    })
}

/// Doc lines arrive with their leading space; rejoin them as one comment.
fn join_doc(lines: &[&str]) -> Option<String> {
    if lines.is_empty() {
        return None;
    }
    let text = lines
        .iter()
        .map(|l| l.trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();
    (!text.is_empty()).then_some(text)
}
