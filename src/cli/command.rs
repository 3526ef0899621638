//! Command descriptors.
//!
//! A [`Command`] is either a leaf with a handler or a group holding
//! sub-commands. A group has no handler of its own unless one is attached
//! with [`Command::runnable`]; arguments declared on a group are accepted at
//! the group level and bound into every leaf below it.
//!
//! Help text can be given explicitly or derived from a documentation string.
//! The first paragraph becomes the short help; argument help is picked up
//! from lines of the form
//!
//! ```text
//! * `name` - what it does
//! :param name: what it does
//! ```

use std::fmt;
use std::sync::Arc;

use super::args::Argument;
use super::handler::CommandHandler;
use crate::naming;

#[derive(Clone)]
pub struct Command {
    name: String,
    help: Option<String>,
    doc: Option<String>,
    arguments: Vec<Argument>,
    handler: Option<Arc<dyn CommandHandler>>,
    subcommands: Vec<Command>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .field("runnable", &self.handler.is_some())
            .field("subcommands", &self.subcommands)
            .finish()
    }
}

impl Command {
    /// A leaf command. `name` is shown dashed: `doStuff` → `do-stuff`.
    pub fn new(name: &str, handler: impl CommandHandler + 'static) -> Self {
        let mut cmd = Self::group(name);
        cmd.handler = Some(Arc::new(handler));
        cmd
    }

    /// A command that only holds sub-commands.
    pub fn group(name: &str) -> Self {
        Self {
            name: naming::to_dashed(name),
            help: None,
            doc: None,
            arguments: Vec::new(),
            handler: None,
            subcommands: Vec::new(),
        }
    }

    /// Let a group run on its own when no sub-command is given.
    pub fn runnable(mut self, handler: impl CommandHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Documentation to derive help text from.
    pub fn doc(mut self, doc: &str) -> Self {
        self.doc = Some(doc.trim().to_string());
        self
    }

    pub fn arg(mut self, arg: Argument) -> Self {
        self.arguments.push(arg);
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = Argument>) -> Self {
        self.arguments.extend(args);
        self
    }

    pub fn subcommand(mut self, cmd: Command) -> Self {
        self.subcommands.push(cmd);
        self
    }

    pub fn subcommands(mut self, cmds: impl IntoIterator<Item = Command>) -> Self {
        self.subcommands.extend(cmds);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Explicit help, or the first paragraph of the documentation.
    pub fn help_text(&self) -> Option<String> {
        if let Some(help) = &self.help {
            return Some(help.clone());
        }
        let doc = self.doc.as_deref()?;
        let summary = doc
            .split("\n\n")
            .next()
            .unwrap_or_default()
            .lines()
            .map(str::trim)
            .collect::<Vec<_>>()
            .join(" ");
        (!summary.is_empty()).then_some(summary)
    }

    /// The full documentation, for `--help`.
    pub fn long_help(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    /// Arguments with help filled in from the documentation where missing.
    pub fn arguments(&self) -> Vec<Argument> {
        self.arguments
            .iter()
            .map(|a| {
                let help = self.doc.as_deref().and_then(|d| arg_help_from_doc(d, a.name()));
                a.clone().with_fallback_help(help)
            })
            .collect()
    }

    pub fn subcommand_list(&self) -> &[Command] {
        &self.subcommands
    }

    pub fn is_group(&self) -> bool {
        !self.subcommands.is_empty()
    }

    pub fn handler(&self) -> Option<&Arc<dyn CommandHandler>> {
        self.handler.as_ref()
    }

    pub fn find(&self, name: &str) -> Option<&Command> {
        self.subcommands.iter().find(|c| c.name == name)
    }
}

/// Find the help for argument `name` in structured doc lines.
///
/// Matches `* \`name\` - text`, `- \`name\`: text` and `:param name: text`,
/// with `name` in any spelling.
pub fn arg_help_from_doc(doc: &str, name: &str) -> Option<String> {
    let wanted = naming::to_snake_case(name);
    for line in doc.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix(":param ") {
            if let Some((param, text)) = rest.split_once(':')
                && naming::to_snake_case(param.trim()) == wanted
            {
                return non_empty(text);
            }
            continue;
        }
        let Some(rest) = line.strip_prefix("* ").or_else(|| line.strip_prefix("- ")) else {
            continue;
        };
        let Some(rest) = rest.strip_prefix('`') else {
            continue;
        };
        let Some((param, text)) = rest.split_once('`') else {
            continue;
        };
        if naming::to_snake_case(param) != wanted {
            continue;
        }
        let text = text.trim_start();
        let text = text
            .strip_prefix('-')
            .or_else(|| text.strip_prefix(':'))
            .unwrap_or(text);
        return non_empty(text);
    }
    None
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
