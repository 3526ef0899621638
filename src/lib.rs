//! Declarative command trees and layered configuration for Rust CLI apps.
//!
//! Clapdeck builds a command line application from two declarations: a
//! [`Schema`] describing the config, and a tree of [`Command`]s describing
//! what the program can do. The [`App`] ties them together: it parses the
//! command line, resolves the config from files, the environment and global
//! flags, and runs the invoked handler with both.
//!
//! ```ignore
//! let schema = Schema::builder()
//!     .field(Field::string("host").default("localhost").auto_environ())
//!     .field(Field::integer("port").default(8080).comment("Port to listen on."))
//!     .section(Section::new("proxy").field(Field::string("url").auto_global()))
//!     .build()?;
//!
//! App::builder()
//!     .name("myapp")
//!     .schema(schema)
//!     .command(Command::new("serve", |ctx: Context| async move {
//!         let port = ctx.config().get_int("port")?;
//!         // ...
//!         anyhow::Ok(())
//!     }))
//!     .start()
//! ```
//!
//! # Config schema
//!
//! A schema is a tree of [`Field`]s grouped into [`Section`]s. Each field has
//! a [`ConfigType`], an optional default and comment, and the sources it may
//! be read from besides a config file:
//!
//! - **`environ("NAME")`** reads the variable `NAME`.
//! - **`auto_environ()`** derives the variable from the field's path:
//!   `database.url` reads `DATABASE_URL`, prefixed with the schema's
//!   [`env_prefix`](SchemaBuilder::env_prefix) if one is set.
//! - **`global("name")`** / **`auto_global()`** add a `--flag` accepted
//!   anywhere on the command line.
//!
//! Schemas can also be derived from a tree of defaults
//! ([`Schema::from_defaults`]) or from a `confique::Config` struct
//! ([`schema_from_config`]), where doc comments become config comments.
//!
//! The schema is frozen once built. Values live in a [`ConfigNode`], which
//! mirrors the schema's shape and records where each value came from.
//!
//! # Resolution precedence
//!
//! ```text
//! Defaults              Field::default
//!        ↑ overridden by
//! Environment           environ / auto_environ
//!        ↑ overridden by
//! Config file           first existing candidate, or --config-file
//!        ↑ overridden by
//! Values from code      AppBuilder::config_values, ConfigNode::set
//!        ↑ overridden by
//! Global flags          --flag for fields with a global name
//! ```
//!
//! Resolution is all or nothing: if any value fails to parse as its field's
//! type, the error names the field, the expected type and the source, and no
//! field is changed. Keys in a file that the schema doesn't know are logged
//! and ignored.
//!
//! # Config files
//!
//! Four formats are supported, picked by file extension and falling back to
//! the app's [`format`](AppBuilder::format):
//!
//! | Format | Comments | Null | Types |
//! |--------|----------|------|-------|
//! | TOML (default) | yes | commented-out key | strict |
//! | YAML | yes | yes | coerced |
//! | INI | yes | empty value | coerced |
//! | JSON | no | yes | strict |
//!
//! Candidates come from [`SearchPath`]s in priority order; the **first** one
//! that exists is read and the rest are ignored. The generated `dump-config`
//! command writes the resolved config, with comments, in any format.
//!
//! # Commands
//!
//! A [`Command`] is a leaf with a handler or a group of sub-commands. Names
//! are shown dashed (`doStuff` → `do-stuff`) and [`Argument`] names are
//! normalized to snake_case for lookup. Help text may come from a command's
//! documentation string; see [`Command::doc`].
//!
//! Handlers are async. Anything implementing [`CommandHandler`] works,
//! including closures returning a future of `anyhow::Result<()>`. A handler
//! receives an owned [`Context`] with its bound [`Args`] and the resolved
//! config. With no sub-command on the command line, the app's `main`
//! handler runs, or help is shown if there is none.
//!
//! # Errors and exit codes
//!
//! Every failure is a [`ClapdeckError`]; [`ClapdeckError::exit_code`] maps it
//! to the process exit code:
//!
//! | Kind | Exit code |
//! |------|-----------|
//! | usage error | 2 |
//! | schema or config error | 78 |
//! | handler error | 1 |
//! | interrupted | 130 |
//!
//! # Logging
//!
//! The library emits `tracing` events and installs nothing by default. Call
//! [`AppBuilder::install_logging`] to get a stderr subscriber driven by the
//! built-in `-v`/`-q` flags, or [`logging::init`] directly.

pub mod codec;
pub mod error;
pub mod logging;
pub mod naming;
pub mod resolve;

mod cli;
mod env;
mod file;
mod meta;
mod node;
mod overrides;
mod schema;
mod value;

#[cfg(test)]
mod fixtures;

pub use cli::{
    App, AppBuilder, ArgKind, ArgType, Args, Argument, Command, CommandHandler, Context, DUMP_CONFIG,
    Nargs, arg_help_from_doc, report, run_handler,
};
pub use codec::ConfigFormat;
pub use error::{ClapdeckError, ErrorKind};
pub use file::SearchPath;
pub use logging::Verbosity;
pub use meta::schema_from_config;
pub use node::{ConfigNode, Source};
pub use overrides::{CliOverride, GlobalOverride, global_overrides};
pub use schema::{Descriptor, Field, Schema, SchemaBuilder, Section};
pub use value::{ConfigType, Value};
