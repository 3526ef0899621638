//! Core resolution pipeline: decide every field's value from its sources.
//!
//! Operates on pre-loaded data ([`ResolveInput`]) with no I/O, so the whole
//! pipeline is testable with synthetic inputs. For each field, the first
//! source that has a value wins:
//!
//! 1. a global CLI override
//! 2. a value already set on the node from code
//! 3. the config file
//! 4. the field's environment variable
//! 5. the field's default
//!
//! Resolution is staged: every field is computed first, and the node is only
//! written once all of them succeeded. A type error anywhere leaves the node
//! exactly as it was.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::codec::{Codec, Loaded, Mapping, load_file};
use crate::env::{self, EnvValue};
use crate::error::{ClapdeckError, Origin};
use crate::node::{ConfigNode, Source};
use crate::overrides::CliOverride;
use crate::schema::{Descriptor, Field, Schema, Section, qualify};
use crate::value::{ConfigType, Value};

/// A config file read from disk, still unparsed.
pub struct FileInput {
    pub path: PathBuf,
    pub content: String,
    pub codec: Box<dyn Codec>,
}

/// All pre-loaded data needed to resolve a config. No I/O happens here.
#[derive(Default)]
pub struct ResolveInput {
    /// The config file picked by discovery, if any exists.
    pub file: Option<FileInput>,
    /// Raw environment variable pairs (pass `std::env::vars().collect()` or synthetic data).
    pub env_vars: Vec<(String, String)>,
    /// Global flags given on the command line.
    pub cli_overrides: Vec<CliOverride>,
}

struct ParsedFile {
    path: PathBuf,
    mapping: Mapping,
    codec: Box<dyn Codec>,
}

/// Resolve every field of `node` against `input`.
pub fn resolve(schema: &Schema, node: &mut ConfigNode, input: ResolveInput) -> Result<(), ClapdeckError> {
    let file = match input.file {
        Some(f) => {
            let mapping = load_file(f.codec.as_ref(), &f.content, &f.path)?;
            check_sections(schema.root(), &mapping, "", &f)?;
            for key in unknown_keys(schema.root(), &mapping, "") {
                debug!(path = %f.path.display(), key = %key, "ignoring unknown config key");
            }
            Some(ParsedFile {
                path: f.path,
                mapping,
                codec: f.codec,
            })
        }
        None => None,
    };
    let env = env::env_values(schema, input.env_vars);

    let mut staged = Vec::new();
    for (key, field) in schema.leaves() {
        let current = node.source_at(&key)?;
        let winner = resolve_field(&key, field, current, &input.cli_overrides, file.as_ref(), &env)?;
        if let Some((value, source)) = winner {
            trace!(key = %key, ?source, "resolved");
            staged.push((key, value, source));
        }
    }

    for (key, value, source) in staged {
        node.assign_path(&key, value, source, false)?;
    }
    Ok(())
}

/// The winning value for one field, or `None` to keep the node's own value.
fn resolve_field(
    key: &str,
    field: &Field,
    current: Source,
    cli: &[CliOverride],
    file: Option<&ParsedFile>,
    env: &[EnvValue],
) -> Result<Option<(Option<Value>, Source)>, ClapdeckError> {
    let ty = field.config_type();

    if let Some(o) = cli.iter().rev().find(|o| o.key == key) {
        let value = ty
            .parse_str(key, &o.raw)
            .map_err(|e| e.with_origin(Origin::Cli(o.flag.clone())))?;
        return Ok(Some((Some(value), Source::Cli)));
    }

    if matches!(current, Source::Code | Source::Cli) {
        return Ok(None);
    }

    if let Some(file) = file
        && let Some(loaded) = lookup(&file.mapping, key)
    {
        let value = from_file(key, ty, loaded, file)?;
        return Ok(Some((value, Source::File)));
    }

    if let Some(e) = env.iter().find(|e| e.key == key) {
        let value = ty
            .parse_str(key, &e.raw)
            .map_err(|err| err.with_origin(Origin::Env(e.var.clone())))?;
        return Ok(Some((Some(value), Source::Env)));
    }

    Ok(Some((field.default_value().cloned(), Source::Default)))
}

fn from_file(
    key: &str,
    ty: ConfigType,
    loaded: &Loaded,
    file: &ParsedFile,
) -> Result<Option<Value>, ClapdeckError> {
    let caps = file.codec.format().capabilities();
    let origin = Origin::File {
        format: file.codec.format(),
        path: file.path.clone(),
    };
    let mismatch = |found: &str| ClapdeckError::TypeMismatch {
        key: key.to_string(),
        expected: ty,
        found: found.to_string(),
        origin: origin.clone(),
    };

    match loaded {
        Loaded::Null => Ok(None),
        Loaded::Value(v) => ty
            .coerce(key, v.clone(), !caps.strict_types)
            .map(Some)
            .map_err(|e| e.with_origin(origin.clone())),
        Loaded::Section(_) => Err(mismatch("a section")),
        Loaded::Unsupported(what) => Err(mismatch(what)),
    }
}

fn lookup<'a>(mapping: &'a Mapping, dotted: &str) -> Option<&'a Loaded> {
    let (parents, leaf) = match dotted.rsplit_once('.') {
        Some((p, l)) => (Some(p), l),
        None => (None, dotted),
    };
    let mut current = mapping;
    if let Some(parents) = parents {
        for segment in parents.split('.') {
            match current.get(segment)? {
                Loaded::Section(inner) => current = inner,
                _ => return None,
            }
        }
    }
    current.get(leaf)
}

/// A schema section must not be given a plain value in the file.
fn check_sections(
    section: &Section,
    mapping: &Mapping,
    prefix: &str,
    file: &FileInput,
) -> Result<(), ClapdeckError> {
    for entry in section.entries() {
        let Descriptor::Section(child) = entry else {
            continue;
        };
        let key = qualify(prefix, child.name());
        let found = match mapping.get(child.name()) {
            None | Some(Loaded::Null) => continue,
            Some(Loaded::Section(inner)) => {
                check_sections(child, inner, &key, file)?;
                continue;
            }
            Some(Loaded::Value(v)) => v.to_string(),
            Some(Loaded::Unsupported(what)) => what.clone(),
        };
        return Err(ClapdeckError::TypeMismatch {
            key,
            expected: ConfigType::Section,
            found,
            origin: Origin::File {
                format: file.codec.format(),
                path: file.path.clone(),
            },
        });
    }
    Ok(())
}

/// Dotted keys in the file that the schema doesn't know.
fn unknown_keys(section: &Section, mapping: &Mapping, prefix: &str) -> Vec<String> {
    let mut out = Vec::new();
    for (name, loaded) in mapping {
        let key = qualify(prefix, name);
        match (section.get(name), loaded) {
            (None, _) => out.push(key),
            (Some(Descriptor::Section(child)), Loaded::Section(inner)) => {
                out.extend(unknown_keys(child, inner, &key))
            }
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::ConfigFormat;
    use crate::fixtures::test::test_schema;

    fn file(format: ConfigFormat, content: &str) -> Option<FileInput> {
        Some(FileInput {
            path: format!("test.{}", format.extension()).into(),
            content: content.into(),
            codec: format.codec(),
        })
    }

    fn env(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn cli(key: &str, raw: &str) -> Vec<CliOverride> {
        vec![CliOverride {
            key: key.into(),
            flag: key.replace(['.', '_'], "-"),
            raw: raw.into(),
        }]
    }

    fn resolved(input: ResolveInput) -> ConfigNode {
        let schema = test_schema();
        let mut node = ConfigNode::new(&schema);
        resolve(&schema, &mut node, input).unwrap();
        node
    }

    #[test]
    fn defaults_only() {
        let node = resolved(ResolveInput::default());
        assert_eq!(node.get_str("host").unwrap(), Some("localhost"));
        assert_eq!(node.get_int("port").unwrap(), Some(8080));
        assert_eq!(node.lookup("database.url").unwrap(), None);
        assert_eq!(node.source("port").unwrap(), Source::Default);
    }

    #[test]
    fn precedence_ladder() {
        let toml = "[sub]\nnested = \"file\"\n";
        // `sub.nested` has no env binding in the fixture; use one that does.
        let schema_with_env = Schema::builder()
            .section(
                Section::new("sub").field(
                    Field::string("nested")
                        .default("Default")
                        .auto_environ()
                        .auto_global(),
                ),
            )
            .build()
            .unwrap();
        let env_vars = env(&[("SUB_NESTED", "env")]);

        let run = |with_cli: bool, with_code: bool, with_file: bool, with_env: bool| {
            let mut node = ConfigNode::new(&schema_with_env);
            if with_code {
                node.set_path("sub.nested", "code").unwrap();
            }
            let input = ResolveInput {
                file: if with_file { file(ConfigFormat::Toml, toml) } else { None },
                env_vars: if with_env { env_vars.clone() } else { vec![] },
                cli_overrides: if with_cli { cli("sub.nested", "cli") } else { vec![] },
            };
            resolve(&schema_with_env, &mut node, input).unwrap();
            node.lookup("sub.nested").unwrap().and_then(Value::as_str).map(str::to_string)
        };

        assert_eq!(run(true, true, true, true).as_deref(), Some("cli"));
        assert_eq!(run(false, true, true, true).as_deref(), Some("code"));
        assert_eq!(run(false, false, true, true).as_deref(), Some("file"));
        assert_eq!(run(false, false, false, true).as_deref(), Some("env"));
        assert_eq!(run(false, false, false, false).as_deref(), Some("Default"));
    }

    #[test]
    fn sources_are_recorded() {
        let node = resolved(ResolveInput {
            file: file(ConfigFormat::Toml, "host = \"file\"\n"),
            env_vars: env(&[("PORT", "1")]),
            cli_overrides: cli("sub.nested", "x"),
        });
        assert_eq!(node.source("host").unwrap(), Source::File);
        assert_eq!(node.source("port").unwrap(), Source::Env);
        assert_eq!(node.source_at("sub.nested").unwrap(), Source::Cli);
        assert_eq!(node.source("rate").unwrap(), Source::Default);
    }

    #[test]
    fn file_beats_env() {
        let node = resolved(ResolveInput {
            file: file(ConfigFormat::Toml, "port = 3000\n"),
            env_vars: env(&[("PORT", "4000")]),
            ..Default::default()
        });
        assert_eq!(node.get_int("port").unwrap(), Some(3000));
    }

    #[test]
    fn env_value_is_parsed_by_type() {
        let node = resolved(ResolveInput {
            env_vars: env(&[("PORT", "4000"), ("DATABASE_URL", "postgres://x")]),
            ..Default::default()
        });
        assert_eq!(node.get_int("port").unwrap(), Some(4000));
        assert_eq!(node.lookup("database.url").unwrap(), Some(&Value::from("postgres://x")));
    }

    #[test]
    fn bad_env_value_names_variable() {
        let schema = test_schema();
        let mut node = ConfigNode::new(&schema);
        let err = resolve(
            &schema,
            &mut node,
            ResolveInput {
                env_vars: env(&[("PORT", "many")]),
                ..Default::default()
            },
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("port") && msg.contains("PORT"), "{msg}");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        for (format, content) in [
            (ConfigFormat::Toml, "port = 1\nbogus = 2\n[extra]\nx = 1\n[sub]\nghost = true\n"),
            (ConfigFormat::Yaml, "port: 1\nbogus: 2\nextra:\n  x: 1\nsub:\n  ghost: true\n"),
            (ConfigFormat::Ini, "[config]\nport = 1\nbogus = 2\n[extra]\nx = 1\n[sub]\nghost = true\n"),
            (ConfigFormat::Json, r#"{"port": 1, "bogus": 2, "extra": {"x": 1}, "sub": {"ghost": true}}"#),
        ] {
            let node = resolved(ResolveInput {
                file: file(format, content),
                ..Default::default()
            });
            assert_eq!(node.get_int("port").unwrap(), Some(1), "{format}");
            assert!(matches!(node.get("bogus"), Err(ClapdeckError::KeyNotFound(_))));
        }
    }

    #[test]
    fn unknown_key_listing() {
        let schema = test_schema();
        let mapping = ConfigFormat::Toml
            .codec()
            .load("port = 1\nbogus = 2\n[sub]\nghost = 1\n[sub.deeper]\nlevel = 1.0\n")
            .unwrap();
        let mut keys = unknown_keys(schema.root(), &mapping, "");
        keys.sort();
        assert_eq!(keys, vec!["bogus", "sub.ghost"]);
    }

    #[test]
    fn non_numeric_port_is_type_error_in_every_format() {
        for (format, content) in [
            (ConfigFormat::Toml, "port = \"abc\"\n"),
            (ConfigFormat::Yaml, "port: abc\n"),
            (ConfigFormat::Ini, "[config]\nport = abc\n"),
            (ConfigFormat::Json, r#"{"port": "abc"}"#),
        ] {
            let schema = test_schema();
            let mut node = ConfigNode::new(&schema);
            let err = resolve(
                &schema,
                &mut node,
                ResolveInput {
                    file: file(format, content),
                    ..Default::default()
                },
            )
            .unwrap_err();
            match &err {
                ClapdeckError::TypeMismatch { key, expected, .. } => {
                    assert_eq!(key, "port");
                    assert_eq!(*expected, ConfigType::Integer);
                }
                other => panic!("{format}: unexpected error {other:?}"),
            }
            assert!(err.to_string().contains(&format.to_string()), "{err}");
        }
    }

    #[test]
    fn strict_formats_reject_quoted_numbers() {
        let schema = test_schema();
        let mut node = ConfigNode::new(&schema);
        let result = resolve(
            &schema,
            &mut node,
            ResolveInput {
                file: file(ConfigFormat::Json, r#"{"port": "3000"}"#),
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn lenient_formats_parse_quoted_numbers() {
        let node = resolved(ResolveInput {
            file: file(ConfigFormat::Yaml, "port: '3000'\nrate: 2\n"),
            ..Default::default()
        });
        assert_eq!(node.get_int("port").unwrap(), Some(3000));
        assert_eq!(node.get_float("rate").unwrap(), Some(2.0));
    }

    #[test]
    fn ini_values_are_coerced_by_type() {
        let node = resolved(ResolveInput {
            file: file(
                ConfigFormat::Ini,
                "[config]\nport = 3000\nrate = 0.5\ndebug = true\ntags = [\"x\", \"y\"]\n\n[sub.deeper]\nlevel = 9\n",
            ),
            ..Default::default()
        });
        assert_eq!(node.get_int("port").unwrap(), Some(3000));
        assert_eq!(node.get_float("rate").unwrap(), Some(0.5));
        assert_eq!(node.get_bool("debug").unwrap(), Some(true));
        assert_eq!(node.get("tags").unwrap(), Some(&Value::from(vec!["x", "y"])));
        assert_eq!(node.lookup("sub.deeper.level").unwrap(), Some(&Value::Float(9.0)));
    }

    #[test]
    fn ini_empty_value_is_null_and_quoted_empty_is_a_string() {
        let node = resolved(ResolveInput {
            file: file(ConfigFormat::Ini, "[config]\nport =\nhost =\n\n[sub]\nnested = \"\"\n"),
            ..Default::default()
        });
        assert_eq!(node.get("port").unwrap(), None);
        assert_eq!(node.get("host").unwrap(), None);
        assert_eq!(node.source("host").unwrap(), Source::File);
        assert_eq!(node.section("sub").unwrap().get_str("nested").unwrap(), Some(""));
    }

    #[test]
    fn explicit_null_in_file_clears_default() {
        let node = resolved(ResolveInput {
            file: file(ConfigFormat::Yaml, "host: null\n"),
            ..Default::default()
        });
        assert_eq!(node.get("host").unwrap(), None);
        assert_eq!(node.source("host").unwrap(), Source::File);
    }

    #[test]
    fn code_level_null_wins_over_file() {
        let schema = test_schema();
        let mut node = ConfigNode::new(&schema);
        node.set_null("host").unwrap();
        resolve(
            &schema,
            &mut node,
            ResolveInput {
                file: file(ConfigFormat::Toml, "host = \"file\"\n"),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(node.get("host").unwrap(), None);
    }

    #[test]
    fn nested_file_value_reaches_section() {
        let node = resolved(ResolveInput {
            file: file(ConfigFormat::Toml, "[sub]\nnested = \"X\"\n"),
            ..Default::default()
        });
        assert_eq!(node.section("sub").unwrap().get_str("nested").unwrap(), Some("X"));
    }

    #[test]
    fn value_where_section_expected_is_error() {
        let schema = test_schema();
        let mut node = ConfigNode::new(&schema);
        let err = resolve(
            &schema,
            &mut node,
            ResolveInput {
                file: file(ConfigFormat::Toml, "sub = 5\n"),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ClapdeckError::TypeMismatch { ref key, expected: ConfigType::Section, .. } if key == "sub"
        ));
    }

    #[test]
    fn failed_resolution_leaves_node_untouched() {
        let schema = test_schema();
        let mut node = ConfigNode::new(&schema);
        let before = node.clone();
        let result = resolve(
            &schema,
            &mut node,
            ResolveInput {
                // host is fine, port is not; neither may be applied
                file: file(ConfigFormat::Toml, "host = \"new\"\nport = \"abc\"\n"),
                ..Default::default()
            },
        );
        assert!(result.is_err());
        assert_eq!(node, before);
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let schema = test_schema();
        let mut node = ConfigNode::new(&schema);
        let err = resolve(
            &schema,
            &mut node,
            ResolveInput {
                file: file(ConfigFormat::Yaml, "port: [unclosed\n"),
                ..Default::default()
            },
        )
        .unwrap_err();
        match err {
            ClapdeckError::Parse { format, path, .. } => {
                assert_eq!(format, ConfigFormat::Yaml);
                assert_eq!(path, PathBuf::from("test.yml"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn resolving_twice_is_stable() {
        let schema = test_schema();
        let mut node = ConfigNode::new(&schema);
        let input = || ResolveInput {
            file: file(ConfigFormat::Toml, "port = 1\n"),
            ..Default::default()
        };
        resolve(&schema, &mut node, input()).unwrap();
        let first = node.clone();
        resolve(&schema, &mut node, input()).unwrap();
        assert_eq!(node, first);
    }
}
