//! TOML: the default format.
//!
//! Loading goes through `toml`; dumping is emitted line by line with
//! `toml_edit` encoding each value, so comments can sit exactly where we
//! want them. Short single-line comments go inline after the value, longer
//! ones on their own lines above it. TOML has no null, so a null value is
//! written as a commented-out key (`# url =`), and that exact line reads
//! back as null.

use super::{Codec, ConfigFormat, Loaded, Mapping, Tree, comment_lines};
use crate::naming;
use crate::schema::qualify;
use crate::value::Value;

/// Comments up to this many characters are placed inline.
const INLINE_COMMENT_MAX: usize = 40;

#[derive(Debug, Clone, Copy, Default)]
pub struct TomlCodec;

impl Codec for TomlCodec {
    fn format(&self) -> ConfigFormat {
        ConfigFormat::Toml
    }

    fn load(&self, text: &str) -> Result<Mapping, String> {
        let table: ::toml::Table = text.parse().map_err(|e: ::toml::de::Error| e.to_string())?;
        let mut mapping = from_table(table);
        for (path, key) in null_placeholders(text) {
            if let Some(Loaded::Section(table)) = walk(&mut mapping, &path) {
                table.entry(key).or_insert(Loaded::Null);
            } else if path.is_empty() {
                mapping.entry(key).or_insert(Loaded::Null);
            }
        }
        Ok(mapping)
    }

    fn dump(&self, tree: &Tree) -> Result<String, String> {
        let mut out = String::new();
        if let Some(comment) = &tree.comment {
            out.push_str(&comment_lines(comment, "", "# "));
            out.push('\n');
        }
        write_table(&mut out, tree, "");
        Ok(out)
    }
}

fn from_table(table: ::toml::Table) -> Mapping {
    table
        .into_iter()
        .map(|(key, value)| (key, from_toml(value)))
        .collect()
}

fn from_toml(value: ::toml::Value) -> Loaded {
    match value {
        ::toml::Value::String(s) => Loaded::Value(Value::String(s)),
        ::toml::Value::Integer(i) => Loaded::Value(Value::Integer(i)),
        ::toml::Value::Float(f) => Loaded::Value(Value::Float(f)),
        ::toml::Value::Boolean(b) => Loaded::Value(Value::Boolean(b)),
        ::toml::Value::Datetime(dt) => Loaded::Unsupported(format!("datetime {dt}")),
        ::toml::Value::Array(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                match from_toml(item) {
                    Loaded::Value(v) => list.push(v),
                    _ => return Loaded::Unsupported("an array of tables".into()),
                }
            }
            Loaded::Value(Value::List(list))
        }
        ::toml::Value::Table(table) => Loaded::Section(from_table(table)),
    }
}

/// `# key =` lines, with the path of the `[table]` they sit in.
fn null_placeholders(text: &str) -> Vec<(Vec<String>, String)> {
    let mut table: Vec<String> = Vec::new();
    let mut found = Vec::new();
    for line in text.lines().map(str::trim) {
        if let Some(header) = line.strip_prefix('[')
            && !header.starts_with('[')
            && let Some(name) = header.strip_suffix(']')
        {
            table = name.split('.').map(|s| s.trim().to_string()).collect();
            continue;
        }
        if let Some(key) = line.strip_prefix("# ").and_then(|rest| rest.strip_suffix(" ="))
            && naming::is_valid_identifier(key)
        {
            found.push((table.clone(), key.to_string()));
        }
    }
    found
}

fn walk<'a>(mapping: &'a mut Mapping, path: &[String]) -> Option<&'a mut Loaded> {
    let (first, rest) = path.split_first()?;
    let mut current = mapping.get_mut(first)?;
    for segment in rest {
        let Loaded::Section(inner) = current else {
            return None;
        };
        current = inner.get_mut(segment)?;
    }
    Some(current)
}

/// Values of one table first, then its sub-tables: TOML requires bare keys
/// to precede any `[header]`.
fn write_table(out: &mut String, tree: &Tree, path: &str) {
    for (entry, value) in tree.values() {
        let comment = entry.comment.as_deref();
        let inline = comment.filter(|c| c.len() <= INLINE_COMMENT_MAX && !c.contains('\n'));
        if let Some(c) = comment
            && inline.is_none()
        {
            out.push_str(&comment_lines(c, "", "# "));
        }
        match value {
            Some(v) => {
                out.push_str(&format!("{} = {}", entry.key, encode(v)));
                if let Some(c) = inline {
                    out.push_str(&format!("  # {c}"));
                }
                out.push('\n');
            }
            None => {
                if let Some(c) = inline {
                    out.push_str(&format!("# {c}\n"));
                }
                out.push_str(&format!("# {} =\n", entry.key));
            }
        }
    }

    for (entry, section) in tree.sections() {
        let section_path = qualify(path, &entry.key);
        out.push('\n');
        if let Some(c) = &entry.comment {
            out.push_str(&comment_lines(c, "", "# "));
        }
        out.push_str(&format!("[{section_path}]\n"));
        write_table(out, section, &section_path);
    }
}

fn to_toml_edit(value: &Value) -> toml_edit::Value {
    match value {
        Value::Boolean(b) => (*b).into(),
        Value::Integer(i) => (*i).into(),
        Value::Float(f) => (*f).into(),
        Value::String(s) => s.as_str().into(),
        Value::List(items) => {
            let mut array: toml_edit::Array = items.iter().map(to_toml_edit).collect();
            array.fmt();
            toml_edit::Value::Array(array)
        }
    }
}

fn encode(value: &Value) -> String {
    to_toml_edit(value).to_string().trim().to_string()
}
