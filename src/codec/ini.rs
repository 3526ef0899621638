//! INI, in the configparser dialect.
//!
//! Top-level fields live under a root section (`[config]` unless
//! configured otherwise); nested sections are written as dotted headers
//! (`[sub.deeper]`). INI has no types: every value loads as a string and is
//! parsed according to the field's type by the resolver. Lists are written
//! as JSON arrays, and null as an empty value. Strings an unquoted value
//! can't carry (empty, padded with whitespace, multi-line, or starting with a
//! quote) are written as JSON strings and unquoted on load.

use super::{Codec, ConfigFormat, Loaded, Mapping, Tree, comment_lines};
use crate::schema::qualify;
use crate::value::Value;

pub const DEFAULT_ROOT_SECTION: &str = "config";

#[derive(Debug, Clone)]
pub struct IniCodec {
    root_section: String,
}

impl Default for IniCodec {
    fn default() -> Self {
        Self::with_root_section(DEFAULT_ROOT_SECTION)
    }
}

impl IniCodec {
    pub fn with_root_section(name: &str) -> Self {
        Self {
            root_section: name.to_string(),
        }
    }

    pub fn root_section(&self) -> &str {
        &self.root_section
    }
}

impl Codec for IniCodec {
    fn format(&self) -> ConfigFormat {
        ConfigFormat::Ini
    }

    fn load(&self, text: &str) -> Result<Mapping, String> {
        let mut root = Mapping::new();
        // Keys before any header belong to the root section.
        let mut current: Vec<String> = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(header) = line.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .ok_or_else(|| format!("line {}: unterminated section header", idx + 1))?
                    .trim();
                current = if name == self.root_section {
                    Vec::new()
                } else {
                    name.split('.').map(|s| s.trim().to_string()).collect()
                };
                section_at(&mut root, &current, idx)?;
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .or_else(|| line.split_once(':'))
                .ok_or_else(|| format!("line {}: expected 'key = value'", idx + 1))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(format!("line {}: empty key", idx + 1));
            }
            section_at(&mut root, &current, idx)?.insert(key.to_string(), self.read_value(value.trim()));
        }
        Ok(root)
    }

    fn dump(&self, tree: &Tree) -> Result<String, String> {
        let mut out = String::new();
        if let Some(comment) = &tree.comment {
            out.push_str(&comment_lines(comment, "", "# "));
            out.push('\n');
        }
        if tree.values().next().is_some() {
            out.push_str(&format!("[{}]\n", self.root_section));
            write_values(&mut out, tree)?;
        }
        self.write_sections(&mut out, tree, "")?;
        Ok(out)
    }
}

impl IniCodec {
    fn read_value(&self, raw: &str) -> Loaded {
        if raw.is_empty() && !self.format().capabilities().null {
            return Loaded::Null;
        }
        if raw.len() >= 2
            && raw.starts_with('"')
            && raw.ends_with('"')
            && let Ok(s) = serde_json::from_str::<String>(raw)
        {
            return Loaded::Value(Value::String(s));
        }
        Loaded::Value(Value::String(raw.to_string()))
    }

    fn write_sections(&self, out: &mut String, tree: &Tree, path: &str) -> Result<(), String> {
        for (entry, section) in tree.sections() {
            let section_path = qualify(path, &entry.key);
            if section_path == self.root_section {
                return Err(format!(
                    "section '{section_path}' has the same name as the root section"
                ));
            }
            out.push('\n');
            if let Some(c) = &entry.comment {
                out.push_str(&comment_lines(c, "", "# "));
            }
            out.push_str(&format!("[{section_path}]\n"));
            write_values(out, section)?;
            self.write_sections(out, section, &section_path)?;
        }
        Ok(())
    }
}

/// Walk (creating as needed) to the mapping for a dotted section path.
fn section_at<'a>(
    root: &'a mut Mapping,
    path: &[String],
    idx: usize,
) -> Result<&'a mut Mapping, String> {
    let mut current = root;
    for segment in path {
        let entry = current
            .entry(segment.clone())
            .or_insert_with(|| Loaded::Section(Mapping::new()));
        current = match entry {
            Loaded::Section(map) => map,
            _ => {
                return Err(format!(
                    "line {}: section '{segment}' clashes with a key of the same name",
                    idx + 1
                ));
            }
        };
    }
    Ok(current)
}

fn write_values(out: &mut String, tree: &Tree) -> Result<(), String> {
    for (entry, value) in tree.values() {
        if let Some(c) = &entry.comment {
            out.push_str(&comment_lines(c, "", "# "));
        }
        match value {
            Some(v) => out.push_str(&format!("{} = {}\n", entry.key, encode(v)?)),
            None => out.push_str(&format!("{} =\n", entry.key)),
        }
    }
    Ok(())
}

fn encode(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) if needs_quoting(s) => serde_json::to_string(s).map_err(|e| e.to_string()),
        Value::List(_) => serde_json::to_string(value).map_err(|e| e.to_string()),
        other => Ok(other.display()),
    }
}

fn needs_quoting(s: &str) -> bool {
    s.is_empty() || s.trim() != s || s.starts_with('"') || s.contains(['\n', '\r'])
}
