//! Dispatch: from parsed matches to a handler and its bound arguments.

use std::sync::Arc;

use clap::ArgMatches;

use super::args::{Args, Argument};
use super::command::Command;
use super::handler::CommandHandler;

/// Extracts the command path from ArgMatches by following the subcommand chain.
///
/// For example, `myapp db migrate` produces `["db", "migrate"]`.
pub(crate) fn extract_command_path(matches: &ArgMatches) -> Vec<String> {
    let mut path = Vec::new();
    let mut current = matches;

    while let Some((name, sub)) = current.subcommand() {
        if name == "help" {
            break;
        }
        path.push(name.to_string());
        current = sub;
    }

    path
}

/// The matches of the most deeply nested command.
pub(crate) fn get_deepest_matches(matches: &ArgMatches) -> &ArgMatches {
    let mut current = matches;

    while let Some((name, sub)) = current.subcommand() {
        if name == "help" {
            break;
        }
        current = sub;
    }

    current
}

/// The command picked by the parsed input.
pub(crate) struct Target {
    pub path: Vec<String>,
    /// `None` when the invoked command has nothing to run.
    pub handler: Option<Arc<dyn CommandHandler>>,
    pub args: Args,
}

/// Find the invoked command under `root` and bind its arguments.
///
/// Arguments are bound outermost first: the root's, each group's on the way
/// down, the leaf's, then the global arguments, each in declaration order.
pub(crate) fn resolve_target(root: &Command, globals: &[Argument], matches: &ArgMatches) -> Target {
    let mut args = Args::default();
    let mut command = root;
    let mut current = matches;
    bind(&mut args, &command.arguments(), current);

    while let Some((name, sub)) = current.subcommand() {
        let Some(next) = command.find(name) else {
            break;
        };
        command = next;
        current = sub;
        bind(&mut args, &command.arguments(), current);
    }
    bind(&mut args, globals, current);

    Target {
        path: extract_command_path(matches),
        handler: command.handler().cloned(),
        args,
    }
}

fn bind(args: &mut Args, declared: &[Argument], matches: &ArgMatches) {
    for arg in declared {
        args.push(arg.name(), arg.extract(matches));
    }
}
