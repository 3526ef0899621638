//! Argument descriptors.
//!
//! An [`Argument`] declares one command line argument: a positional, an
//! option taking a value, a boolean flag, or a counted flag (`-vvv`).
//! Names are normalized to snake_case for lookup in [`Args`] and shown
//! dashed on the command line, so `outFile`, `out_file` and `out-file` are
//! the same argument, spelled `--out-file`.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches};

use crate::naming;
use crate::value::Value;

/// How the raw text of an argument is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArgType {
    #[default]
    String,
    Integer,
    Float,
    /// `true`/`false`, `yes`/`no`, `1`/`0`, ... Only for positionals and options;
    /// a switch without a value is [`Argument::flag`].
    Boolean,
    Path,
}

/// How many values an argument takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Nargs {
    /// Exactly one value.
    #[default]
    One,
    /// Zero or one value (`?`).
    Optional,
    /// Any number of values (`*`).
    ZeroOrMore,
    /// At least one value (`+`).
    OneOrMore,
    /// Exactly `n` values.
    Exactly(usize),
}

impl Nargs {
    pub(crate) fn is_many(self) -> bool {
        matches!(self, Nargs::ZeroOrMore | Nargs::OneOrMore | Nargs::Exactly(_))
    }

    fn allows_none(self) -> bool {
        matches!(self, Nargs::Optional | Nargs::ZeroOrMore)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Positional,
    Option,
    Flag,
    Count,
}

/// One command line argument.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    name: String,
    kind: ArgKind,
    arg_type: ArgType,
    short: Option<char>,
    default: Option<String>,
    help: Option<String>,
    choices: Vec<String>,
    nargs: Nargs,
    required: Option<bool>,
    value_name: Option<String>,
}

impl Argument {
    fn new(name: &str, kind: ArgKind) -> Self {
        Self {
            name: naming::to_snake_case(name),
            kind,
            arg_type: ArgType::String,
            short: None,
            default: None,
            help: None,
            choices: Vec::new(),
            nargs: Nargs::One,
            required: None,
            value_name: None,
        }
    }

    /// A positional argument. Required unless it has a default or optional nargs.
    pub fn positional(name: &str) -> Self {
        Self::new(name, ArgKind::Positional)
    }

    /// A `--name VALUE` option. Optional unless marked [`required`](Self::required).
    pub fn option(name: &str) -> Self {
        Self::new(name, ArgKind::Option)
    }

    /// A `--name` switch; `true` when present.
    pub fn flag(name: &str) -> Self {
        Self::new(name, ArgKind::Flag)
    }

    /// A repeatable switch counting its occurrences (`-vvv` → 3).
    pub fn count(name: &str) -> Self {
        Self::new(name, ArgKind::Count)
    }

    pub fn arg_type(mut self, arg_type: ArgType) -> Self {
        self.arg_type = arg_type;
        self
    }

    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    pub fn default(mut self, value: impl ToString) -> Self {
        self.default = Some(value.to_string());
        self
    }

    pub fn help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    pub fn choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn nargs(mut self, nargs: Nargs) -> Self {
        self.nargs = nargs;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn value_name(mut self, name: &str) -> Self {
        self.value_name = Some(name.to_string());
        self
    }

    /// The snake_case identifier used to look the value up.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The dashed form shown on the command line.
    pub fn display_name(&self) -> String {
        naming::to_dashed(&self.name)
    }

    pub fn kind(&self) -> ArgKind {
        self.kind
    }

    pub fn short_flag(&self) -> Option<char> {
        self.short
    }

    pub fn help_text(&self) -> Option<&str> {
        self.help.as_deref()
    }

    pub fn nargs_spec(&self) -> Nargs {
        self.nargs
    }

    pub fn is_positional(&self) -> bool {
        self.kind == ArgKind::Positional
    }

    pub fn is_required(&self) -> bool {
        match self.kind {
            ArgKind::Flag | ArgKind::Count => false,
            ArgKind::Option => self.required.unwrap_or(false),
            ArgKind::Positional => self
                .required
                .unwrap_or(self.default.is_none() && !self.nargs.allows_none()),
        }
    }

    /// Fill in help text if none was given explicitly.
    pub(crate) fn with_fallback_help(mut self, help: Option<String>) -> Self {
        if self.help.is_none() {
            self.help = help;
        }
        self
    }

    /// Build the clap argument.
    pub(crate) fn to_clap(&self) -> Arg {
        let mut arg = Arg::new(self.name.clone());
        if !self.is_positional() {
            arg = arg.long(self.display_name());
        }
        if let Some(short) = self.short {
            arg = arg.short(short);
        }
        if let Some(help) = &self.help {
            arg = arg.help(help.clone());
        }

        match self.kind {
            ArgKind::Flag => return arg.action(ArgAction::SetTrue),
            ArgKind::Count => return arg.action(ArgAction::Count),
            ArgKind::Positional | ArgKind::Option => {}
        }

        // A positional that is absent simply isn't required; when present it
        // always carries at least one value.
        arg = match (self.nargs, self.is_positional()) {
            (Nargs::One | Nargs::Optional, true) => arg.num_args(1),
            (Nargs::ZeroOrMore | Nargs::OneOrMore, true) => arg.num_args(1..),
            (Nargs::One, false) => arg.num_args(1),
            (Nargs::Optional, false) => arg.num_args(0..=1),
            (Nargs::ZeroOrMore, false) => arg.num_args(0..),
            (Nargs::OneOrMore, false) => arg.num_args(1..),
            (Nargs::Exactly(n), _) => arg.num_args(n),
        };
        if self.nargs.is_many() {
            arg = arg.action(ArgAction::Append);
        } else {
            arg = arg.action(ArgAction::Set);
        }
        arg = arg.required(self.is_required());

        if !self.choices.is_empty() {
            arg = arg.value_parser(clap::builder::PossibleValuesParser::new(self.choices.clone()));
        } else {
            arg = match self.arg_type {
                ArgType::String => arg.value_parser(clap::value_parser!(String)),
                ArgType::Integer => arg.value_parser(clap::value_parser!(i64)),
                ArgType::Float => arg.value_parser(clap::value_parser!(f64)),
                ArgType::Boolean => arg.value_parser(clap::builder::BoolishValueParser::new()),
                ArgType::Path => arg.value_parser(clap::value_parser!(PathBuf)),
            };
        }
        if let Some(name) = &self.value_name {
            arg = arg.value_name(name.clone());
        }
        if let Some(default) = &self.default {
            arg = arg.default_value(default.clone());
        }
        arg
    }

    /// Read this argument's value out of parsed matches.
    pub(crate) fn extract(&self, matches: &ArgMatches) -> Option<Value> {
        let id = self.name.as_str();
        match self.kind {
            ArgKind::Flag => {
                return matches
                    .try_get_one::<bool>(id)
                    .ok()
                    .flatten()
                    .map(|b| Value::Boolean(*b));
            }
            ArgKind::Count => {
                return matches
                    .try_get_one::<u8>(id)
                    .ok()
                    .flatten()
                    .map(|c| Value::Integer(i64::from(*c)));
            }
            ArgKind::Positional | ArgKind::Option => {}
        }

        let many = self.nargs.is_many();
        if !self.choices.is_empty() {
            return read::<String>(matches, id, many);
        }
        match self.arg_type {
            ArgType::String => read::<String>(matches, id, many),
            ArgType::Integer => read::<i64>(matches, id, many),
            ArgType::Float => read::<f64>(matches, id, many),
            ArgType::Boolean => read::<bool>(matches, id, many),
            ArgType::Path => read::<PathBuf>(matches, id, many),
        }
    }
}

fn read<T>(matches: &ArgMatches, id: &str, many: bool) -> Option<Value>
where
    T: Clone + Send + Sync + Into<Value> + 'static,
{
    if many {
        let values = matches.try_get_many::<T>(id).ok().flatten()?;
        Some(Value::List(values.cloned().map(Into::into).collect()))
    } else {
        matches.try_get_one::<T>(id).ok().flatten().cloned().map(Into::into)
    }
}

/// Argument values bound for one handler invocation, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    order: Vec<String>,
    values: HashMap<String, Option<Value>>,
}

impl Args {
    pub(crate) fn push(&mut self, name: &str, value: Option<Value>) {
        if self.values.insert(name.to_string(), value).is_none() {
            self.order.push(name.to_string());
        }
    }

    /// The value of an argument; `None` if it was not given and has no default.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .get(&naming::to_snake_case(name))
            .and_then(Option::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_integer)
    }

    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_float)
    }

    /// Boolean value; absent flags read as `false`.
    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn get_path(&self, name: &str) -> Option<PathBuf> {
        self.get_str(name).map(PathBuf::from)
    }

    pub fn get_list(&self, name: &str) -> Option<&[Value]> {
        self.get(name).and_then(Value::as_list)
    }

    /// `(name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.order.iter().map(|name| {
            let value = self.values.get(name).and_then(Option::as_ref);
            (name.as_str(), value)
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
