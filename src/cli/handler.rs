//! Command handlers and what they receive.
//!
//! A handler is anything implementing [`CommandHandler`]. Async closures
//! taking a [`Context`] implement it directly:
//!
//! ```ignore
//! Command::new("greet", |ctx: Context| async move {
//!     let name = ctx.args().get_str("name").unwrap_or("world");
//!     println!("hello {name}");
//!     anyhow::Ok(())
//! })
//! ```
//!
//! The context owns the bound arguments and the resolved config, so a handler
//! can hold them across `.await` points and spawn tasks with them.

use std::future::Future;

use async_trait::async_trait;

use super::args::Args;
use crate::logging::Verbosity;
use crate::node::ConfigNode;

/// Everything a handler is invoked with.
#[derive(Debug)]
pub struct Context {
    command_path: Vec<String>,
    args: Args,
    config: ConfigNode,
    verbosity: Verbosity,
}

impl Context {
    pub(crate) fn new(command_path: Vec<String>, args: Args, config: ConfigNode, verbosity: Verbosity) -> Self {
        Self {
            command_path,
            args,
            config,
            verbosity,
        }
    }

    /// Names of the invoked command and its parent groups; empty for `main`.
    pub fn command_path(&self) -> &[String] {
        &self.command_path
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    /// The resolved config.
    pub fn config(&self) -> &ConfigNode {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigNode {
        &mut self.config
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn into_parts(self) -> (Args, ConfigNode) {
        (self.args, self.config)
    }
}

/// The body of a command.
///
/// Errors are reported at the process boundary and map to exit code 1.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn call(&self, ctx: Context) -> anyhow::Result<()>;
}

#[async_trait]
impl<F, Fut> CommandHandler for F
where
    F: Fn(Context) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn call(&self, ctx: Context) -> anyhow::Result<()> {
        (self)(ctx).await
    }
}
