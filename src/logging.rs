//! Log verbosity and the optional tracing subscriber.
//!
//! The library only emits `tracing` events. Installing a subscriber is up to
//! the application; [`init`] is a ready-made one driven by the built-in
//! `-v`/`-q` flags, with `RUST_LOG` taking precedence when set.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Verbosity requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Verbosity {
    /// Number of `-v` flags.
    pub verbose: u8,
    /// `-q` was given.
    pub quiet: bool,
}

impl Verbosity {
    pub fn level(self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::ERROR;
        }
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

/// Install a stderr fmt subscriber at the given verbosity.
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init(verbosity: Verbosity) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(verbosity.level().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .try_init()
}
