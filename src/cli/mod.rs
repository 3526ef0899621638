//! Declarative command trees on top of clap.
//!
//! Commands and their arguments are plain descriptor values registered on
//! an [`App`]. Building the app checks the whole tree and turns it into a
//! `clap::Command`; running it parses the command line, resolves the config
//! and awaits the invoked [`CommandHandler`] with a [`Context`].

mod app;
mod args;
mod command;
mod dispatch;
mod handler;
mod tree;

pub use app::{App, AppBuilder, DUMP_CONFIG, report, run_handler};
pub use args::{ArgKind, ArgType, Args, Argument, Nargs};
pub use command::{Command, arg_help_from_doc};
pub use handler::{CommandHandler, Context};
