//! On-disk formats for the config tree.
//!
//! Every codec converts between its text format and two format-neutral
//! shapes:
//!
//! - [`Mapping`] on load: a nested map of [`Loaded`] entries, with no schema
//!   applied yet. Unknown keys are kept here and dropped by the resolver.
//! - [`Tree`] on dump: the resolved values in schema order, each with its
//!   comment.
//!
//! What a format can express is described by its [`Capabilities`]:
//!
//! | Format | Comments | Null | Types |
//! |--------|----------|------|-------|
//! | TOML   | yes      | yes (commented-out key) | strict |
//! | YAML   | yes      | yes  | lenient |
//! | INI    | yes      | no (empty value; empty strings are quoted) | strings, coerced on load |
//! | JSON   | no       | yes  | strict |

mod ini;
mod json;
mod toml;
mod yaml;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::ClapdeckError;
use crate::value::Value;

pub use ini::IniCodec;
pub use json::JsonCodec;
pub use toml::TomlCodec;
pub use yaml::YamlCodec;

/// Supported config file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, clap::ValueEnum)]
pub enum ConfigFormat {
    #[default]
    Toml,
    Yaml,
    Ini,
    Json,
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Ini => "INI",
            ConfigFormat::Json => "JSON",
        };
        f.write_str(name)
    }
}

impl ConfigFormat {
    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "toml",
            ConfigFormat::Yaml => "yml",
            ConfigFormat::Ini => "ini",
            ConfigFormat::Json => "json",
        }
    }

    /// Guess the format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "toml" => Some(ConfigFormat::Toml),
            "yml" | "yaml" => Some(ConfigFormat::Yaml),
            "ini" | "cfg" => Some(ConfigFormat::Ini),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }

    pub fn capabilities(self) -> Capabilities {
        match self {
            ConfigFormat::Toml => Capabilities {
                comments: true,
                null: true,
                strict_types: true,
            },
            ConfigFormat::Yaml => Capabilities {
                comments: true,
                null: true,
                strict_types: false,
            },
            ConfigFormat::Ini => Capabilities {
                comments: true,
                null: false,
                strict_types: false,
            },
            ConfigFormat::Json => Capabilities {
                comments: false,
                null: true,
                strict_types: true,
            },
        }
    }

    /// The codec for this format, with default options.
    pub fn codec(self) -> Box<dyn Codec> {
        match self {
            ConfigFormat::Toml => Box::new(TomlCodec),
            ConfigFormat::Yaml => Box::new(YamlCodec),
            ConfigFormat::Ini => Box::new(IniCodec::default()),
            ConfigFormat::Json => Box::new(JsonCodec),
        }
    }
}

/// What a format can represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub comments: bool,
    /// `false` means null is written as an empty value.
    pub null: bool,
    /// `false` means string values are parsed into the field's type on load.
    pub strict_types: bool,
}

/// A loaded entry, before the schema is applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Loaded {
    Null,
    Value(Value),
    Section(Mapping),
    /// Something the value model can't hold (a date, a map inside a list).
    /// Only an error if the key is in the schema.
    Unsupported(String),
}

pub type Mapping = BTreeMap<String, Loaded>;

/// Values to dump, in schema order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tree {
    pub comment: Option<String>,
    pub entries: Vec<TreeEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeEntry {
    pub key: String,
    pub comment: Option<String>,
    pub item: TreeItem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeItem {
    /// `None` is a null value.
    Value(Option<Value>),
    Section(Tree),
}

impl Tree {
    /// Leaf entries of this level.
    pub(crate) fn values(&self) -> impl Iterator<Item = (&TreeEntry, Option<&Value>)> {
        self.entries.iter().filter_map(|e| match &e.item {
            TreeItem::Value(v) => Some((e, v.as_ref())),
            TreeItem::Section(_) => None,
        })
    }

    /// A copy with every comment removed.
    pub(crate) fn without_comments(&self) -> Tree {
        Tree {
            comment: None,
            entries: self
                .entries
                .iter()
                .map(|e| TreeEntry {
                    key: e.key.clone(),
                    comment: None,
                    item: match &e.item {
                        TreeItem::Value(v) => TreeItem::Value(v.clone()),
                        TreeItem::Section(t) => TreeItem::Section(t.without_comments()),
                    },
                })
                .collect(),
        }
    }

    /// Nested sections of this level.
    pub(crate) fn sections(&self) -> impl Iterator<Item = (&TreeEntry, &Tree)> {
        self.entries.iter().filter_map(|e| match &e.item {
            TreeItem::Section(t) => Some((e, t)),
            TreeItem::Value(_) => None,
        })
    }
}

/// Serializer/deserializer for one format.
///
/// Errors are plain messages; [`load_file`] and [`dump_tree`] attach the
/// format and path.
pub trait Codec: Send + Sync {
    fn format(&self) -> ConfigFormat;

    fn load(&self, text: &str) -> Result<Mapping, String>;

    fn dump(&self, tree: &Tree) -> Result<String, String>;
}

/// Parse file contents with `codec`, naming `path` on failure.
pub fn load_file(codec: &dyn Codec, text: &str, path: &Path) -> Result<Mapping, ClapdeckError> {
    codec.load(text).map_err(|reason| ClapdeckError::Parse {
        format: codec.format(),
        path: path.to_path_buf(),
        reason,
    })
}

/// Serialize `tree` with `codec`. Comments are dropped for formats that
/// can't carry them.
pub fn dump_tree(codec: &dyn Codec, tree: &Tree) -> Result<String, ClapdeckError> {
    let bare;
    let tree = if codec.format().capabilities().comments {
        tree
    } else {
        bare = tree.without_comments();
        &bare
    };
    codec.dump(tree).map_err(|reason| ClapdeckError::Serialize {
        format: codec.format(),
        reason,
    })
}

/// Split a comment into lines prefixed with `prefix` (e.g. `"# "`).
pub(crate) fn comment_lines(comment: &str, indent: &str, prefix: &str) -> String {
    comment
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                format!("{indent}{}\n", prefix.trim_end())
            } else {
                format!("{indent}{prefix}{line}\n")
            }
        })
        .collect()
}
