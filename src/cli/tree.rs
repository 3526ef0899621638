//! Building the clap command tree from [`Command`] descriptors.
//!
//! Everything clap would reject with a panic at parse time is checked here
//! and reported as a schema error instead: duplicate sibling commands,
//! argument names declared twice along a path, clashing flags and positional
//! layouts clap can't parse.

use std::collections::HashSet;

use super::args::{ArgKind, Argument};
use super::command::Command;
use crate::error::ClapdeckError;
use crate::naming;

/// Ids and flags already taken by global arguments.
#[derive(Debug, Clone, Default)]
pub(crate) struct Reserved {
    pub ids: HashSet<String>,
    pub longs: HashSet<String>,
    pub shorts: HashSet<char>,
}

impl Reserved {
    /// The flags clap itself adds.
    pub(crate) fn builtin(version: bool) -> Self {
        let mut reserved = Self::default();
        reserved.longs.insert("help".into());
        reserved.shorts.insert('h');
        if version {
            reserved.longs.insert("version".into());
            reserved.shorts.insert('V');
        }
        reserved
    }

    /// Claim the flags of `arg`, failing if one is already taken.
    pub(crate) fn claim(&mut self, command: &str, arg: &Argument) -> Result<(), ClapdeckError> {
        if self.ids.contains(arg.name()) {
            return Err(invalid(command, arg, "its name is taken by a global argument"));
        }
        if !arg.is_positional() && !self.longs.insert(arg.display_name()) {
            return Err(invalid(command, arg, "its flag is already taken by a global argument"));
        }
        if let Some(short) = arg.short_flag()
            && !self.shorts.insert(short)
        {
            return Err(invalid(command, arg, &format!("short flag -{short} is already taken")));
        }
        Ok(())
    }
}

/// Add `root`'s arguments and its whole sub-command tree to `app`.
pub(crate) fn build(
    app: clap::Command,
    root: &Command,
    reserved: &Reserved,
) -> Result<clap::Command, ClapdeckError> {
    let name = app.get_name().to_string();
    let arguments = root.arguments();
    validate_arguments(&name, &arguments, &[], reserved)?;
    let mut app = app;
    for arg in &arguments {
        app = app.arg(arg.to_clap());
    }
    let inherited: Vec<String> = arguments.iter().map(|a| a.name().to_string()).collect();
    add_subcommands(app, &name, root.subcommand_list(), &inherited, reserved)
}

fn add_subcommands(
    mut parent: clap::Command,
    parent_name: &str,
    commands: &[Command],
    inherited: &[String],
    reserved: &Reserved,
) -> Result<clap::Command, ClapdeckError> {
    let mut seen = HashSet::new();
    for cmd in commands {
        validate_name(cmd.name())?;
        if !seen.insert(cmd.name()) {
            return Err(ClapdeckError::DuplicateCommand {
                parent: parent_name.to_string(),
                name: cmd.name().to_string(),
            });
        }
        parent = parent.subcommand(build_command(cmd, inherited, reserved)?);
    }
    Ok(parent)
}

fn build_command(
    cmd: &Command,
    inherited: &[String],
    reserved: &Reserved,
) -> Result<clap::Command, ClapdeckError> {
    let arguments = cmd.arguments();
    validate_arguments(cmd.name(), &arguments, inherited, reserved)?;

    let mut out = clap::Command::new(cmd.name().to_string());
    if let Some(help) = cmd.help_text() {
        out = out.about(help);
    }
    if let Some(doc) = cmd.long_help() {
        out = out.long_about(doc.to_string());
    }
    for arg in &arguments {
        out = out.arg(arg.to_clap());
    }
    if cmd.is_group() && cmd.handler().is_none() {
        out = out.subcommand_required(true);
    }

    let mut below = inherited.to_vec();
    below.extend(arguments.iter().map(|a| a.name().to_string()));
    add_subcommands(out, cmd.name(), cmd.subcommand_list(), &below, reserved)
}

fn validate_name(name: &str) -> Result<(), ClapdeckError> {
    if !naming::is_valid_identifier(name) {
        return Err(ClapdeckError::InvalidName {
            name: name.to_string(),
            reason: "command names must be non-empty identifiers".into(),
        });
    }
    if name == "help" {
        return Err(ClapdeckError::InvalidName {
            name: name.to_string(),
            reason: "'help' is reserved".into(),
        });
    }
    Ok(())
}

fn validate_arguments(
    command: &str,
    arguments: &[Argument],
    inherited: &[String],
    reserved: &Reserved,
) -> Result<(), ClapdeckError> {
    let mut names: HashSet<&str> = HashSet::new();
    let mut flags = reserved.clone();
    let mut optional_positional: Option<&Argument> = None;
    let mut many_positional: Option<&Argument> = None;

    for arg in arguments {
        if !naming::is_valid_identifier(arg.name()) {
            return Err(invalid(command, arg, "argument names must be non-empty identifiers"));
        }
        if !names.insert(arg.name()) {
            return Err(invalid(command, arg, "declared twice"));
        }
        if inherited.iter().any(|n| n == arg.name()) {
            return Err(invalid(command, arg, "already declared on a parent command"));
        }
        flags.claim(command, arg)?;
        if arg.kind() == ArgKind::Positional && arg.short_flag().is_some() {
            return Err(invalid(command, arg, "positional arguments have no short flag"));
        }

        if arg.is_positional() {
            if let Some(prev) = many_positional {
                return Err(invalid(
                    command,
                    arg,
                    &format!("'{}' takes several values and must be the last positional", prev.name()),
                ));
            }
            if arg.is_required()
                && let Some(prev) = optional_positional
            {
                return Err(invalid(
                    command,
                    arg,
                    &format!("required positional after optional '{}'", prev.name()),
                ));
            }
            if !arg.is_required() {
                optional_positional = Some(arg);
            }
            if arg.nargs_spec().is_many() {
                many_positional = Some(arg);
            }
        }
    }
    Ok(())
}

fn invalid(command: &str, arg: &Argument, reason: &str) -> ClapdeckError {
    ClapdeckError::InvalidArgument {
        command: command.to_string(),
        name: arg.name().to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::Nargs;
    use crate::cli::handler::Context;

    async fn noop(_ctx: Context) -> anyhow::Result<()> {
        Ok(())
    }

    fn tree(root: &Command) -> Result<clap::Command, ClapdeckError> {
        build(clap::Command::new("app"), root, &Reserved::builtin(false))
    }

    #[test]
    fn nested_groups_build() {
        let root = Command::group("app")
            .subcommand(Command::new("doStuff", noop))
            .subcommand(
                Command::group("remote")
                    .subcommand(Command::new("add", noop).arg(Argument::positional("url"))),
            );
        let cmd = tree(&root).unwrap();
        cmd.clone().debug_assert();
        let matches = cmd
            .try_get_matches_from(["app", "remote", "add", "http://x"])
            .unwrap();
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "remote");
        assert_eq!(sub.subcommand_name(), Some("add"));
    }

    #[test]
    fn group_without_handler_requires_subcommand() {
        let root = Command::group("app")
            .subcommand(Command::group("remote").subcommand(Command::new("add", noop)));
        let err = tree(&root)
            .unwrap()
            .try_get_matches_from(["app", "remote"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingSubcommand);
    }

    #[test]
    fn runnable_group_accepts_no_subcommand() {
        let root = Command::group("app").subcommand(
            Command::group("remote")
                .runnable(noop)
                .subcommand(Command::new("add", noop)),
        );
        assert!(tree(&root).unwrap().try_get_matches_from(["app", "remote"]).is_ok());
    }

    #[test]
    fn duplicate_sibling_is_rejected() {
        let root = Command::group("app")
            .subcommand(Command::new("doStuff", noop))
            .subcommand(Command::new("do_stuff", noop));
        let err = tree(&root).unwrap_err();
        assert!(matches!(
            err,
            ClapdeckError::DuplicateCommand { ref parent, ref name } if parent == "app" && name == "do-stuff"
        ));
    }

    #[test]
    fn same_name_under_different_parents_is_fine() {
        let root = Command::group("app")
            .subcommand(Command::group("a").subcommand(Command::new("list", noop)))
            .subcommand(Command::group("b").subcommand(Command::new("list", noop)));
        assert!(tree(&root).is_ok());
    }

    #[test]
    fn help_is_a_reserved_command_name() {
        let root = Command::group("app").subcommand(Command::new("help", noop));
        assert!(matches!(tree(&root), Err(ClapdeckError::InvalidName { .. })));
    }

    #[test]
    fn argument_declared_twice() {
        let root = Command::group("app").subcommand(
            Command::new("run", noop)
                .arg(Argument::option("outFile"))
                .arg(Argument::option("out_file")),
        );
        assert!(matches!(tree(&root), Err(ClapdeckError::InvalidArgument { .. })));
    }

    #[test]
    fn argument_shadowing_group_argument() {
        let root = Command::group("app").subcommand(
            Command::group("db")
                .arg(Argument::option("url"))
                .subcommand(Command::new("migrate", noop).arg(Argument::option("url"))),
        );
        let err = tree(&root).unwrap_err();
        assert!(err.to_string().contains("parent command"));
    }

    #[test]
    fn clashing_short_flags() {
        let root = Command::group("app").subcommand(
            Command::new("run", noop)
                .arg(Argument::flag("force").short('f'))
                .arg(Argument::flag("fast").short('f')),
        );
        assert!(matches!(tree(&root), Err(ClapdeckError::InvalidArgument { .. })));
    }

    #[test]
    fn reserved_flags_are_rejected() {
        let mut reserved = Reserved::builtin(false);
        reserved.longs.insert("verbose".into());
        let root = Command::group("app")
            .subcommand(Command::new("run", noop).arg(Argument::flag("verbose")));
        let err = build(clap::Command::new("app"), &root, &reserved).unwrap_err();
        assert!(err.to_string().contains("global"));
        let root = Command::group("app")
            .subcommand(Command::new("run", noop).arg(Argument::flag("hidden").short('h')));
        assert!(tree(&root).is_err());
    }

    #[test]
    fn positional_named_like_a_global() {
        let mut reserved = Reserved::builtin(false);
        reserved.ids.insert("quiet".into());
        let root = Command::group("app")
            .subcommand(Command::new("run", noop).arg(Argument::positional("quiet")));
        let err = build(clap::Command::new("app"), &root, &reserved).unwrap_err();
        assert!(matches!(err, ClapdeckError::InvalidArgument { .. }));
    }

    #[test]
    fn required_positional_after_optional() {
        let root = Command::group("app").subcommand(
            Command::new("run", noop)
                .arg(Argument::positional("first").nargs(Nargs::Optional))
                .arg(Argument::positional("second")),
        );
        assert!(matches!(tree(&root), Err(ClapdeckError::InvalidArgument { .. })));
    }

    #[test]
    fn many_valued_positional_must_be_last() {
        let root = Command::group("app").subcommand(
            Command::new("run", noop)
                .arg(Argument::positional("files").nargs(Nargs::OneOrMore))
                .arg(Argument::positional("dest")),
        );
        assert!(matches!(tree(&root), Err(ClapdeckError::InvalidArgument { .. })));
    }

    #[test]
    fn doc_help_reaches_clap() {
        let root = Command::group("app").subcommand(
            Command::new("copy", noop)
                .doc("Copy a file.\n\n* `source` - where to read")
                .arg(Argument::positional("source")),
        );
        let cmd = tree(&root).unwrap();
        let copy = cmd.find_subcommand("copy").unwrap();
        assert_eq!(copy.get_about().map(|s| s.to_string()).as_deref(), Some("Copy a file."));
        let source = copy.get_arguments().find(|a| a.get_id() == "source").unwrap();
        assert_eq!(
            source.get_help().map(|s| s.to_string()).as_deref(),
            Some("where to read")
        );
    }
}
