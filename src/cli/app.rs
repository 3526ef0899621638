//! The application: command tree, config schema and the run pipeline.
//!
//! ```ignore
//! App::builder()
//!     .name("myapp")
//!     .schema(schema)
//!     .command(Command::new("serve", serve))
//!     .main(|ctx: Context| async move { ... })
//!     .start()
//! ```
//!
//! A run goes through these steps, each of which can end it:
//!
//! 1. parse the command line against the tree (usage error, exit 2)
//! 2. pick the config file: `--config-file` if given, else the first
//!    existing candidate
//! 3. resolve the config from the file, the environment and global flags
//!    (config error, exit 78)
//! 4. run the invoked command's handler, or `main` when no sub-command was
//!    given (handler error, exit 1; interrupt, exit 130)

use std::ffi::OsString;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Arg, ArgAction, ArgMatches, ValueEnum};
use tracing::{debug, info, warn};

use super::args::{ArgType, Argument, Nargs};
use super::command::Command;
use super::dispatch;
use super::handler::{CommandHandler, Context};
use super::tree::{self, Reserved};
use crate::codec::{Codec, ConfigFormat, IniCodec, dump_tree};
use crate::error::ClapdeckError;
use crate::file::{self, SearchPath};
use crate::logging::{self, Verbosity};
use crate::node::ConfigNode;
use crate::overrides::{self, GlobalOverride};
use crate::resolve::{self, FileInput, ResolveInput};
use crate::schema::Schema;

const VERBOSE: &str = "verbose";
const QUIET: &str = "quiet";
const CONFIG_FILE: &str = "config_file";

/// Name of the generated command writing the resolved config to a file.
pub const DUMP_CONFIG: &str = "dump-config";

/// How codecs are set up for this app.
#[derive(Debug, Clone)]
struct Formats {
    default: ConfigFormat,
    ini_root_section: Option<String>,
}

impl Formats {
    fn codec(&self, format: ConfigFormat) -> Box<dyn Codec> {
        match (format, &self.ini_root_section) {
            (ConfigFormat::Ini, Some(root)) => Box::new(IniCodec::with_root_section(root)),
            _ => format.codec(),
        }
    }

    /// Format for `path`, by extension, falling back to the app's format.
    fn for_path(&self, path: &std::path::Path) -> ConfigFormat {
        ConfigFormat::from_path(path).unwrap_or(self.default)
    }
}

/// A fully built application, ready to run.
pub struct App {
    name: String,
    schema: Schema,
    candidates: Vec<PathBuf>,
    formats: Formats,
    root: Command,
    globals: Vec<Argument>,
    config_globals: Vec<GlobalOverride>,
    base: ConfigNode,
    cli: clap::Command,
    install_logging: bool,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("name", &self.name)
            .field("candidates", &self.candidates)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl App {
    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Config file candidates, in priority order.
    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    /// The clap command tree.
    pub fn command(&self) -> &clap::Command {
        &self.cli
    }

    /// Run with the process arguments and report the outcome as an exit code.
    pub fn start(&self) -> ExitCode {
        report(self.run(std::env::args_os()))
    }

    /// Run with `argv` on a fresh single-threaded runtime.
    pub fn run<I, T>(&self, argv: I) -> Result<(), ClapdeckError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        self.run_with_env(argv, std::env::vars().collect())
    }

    /// Like [`run`](Self::run) with an explicit environment.
    pub fn run_with_env<I, T>(&self, argv: I, env_vars: Vec<(String, String)>) -> Result<(), ClapdeckError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ClapdeckError::Handler(anyhow::Error::new(e).context("failed to start the async runtime")))?;
        runtime.block_on(self.run_async(argv, env_vars))
    }

    /// The run pipeline, for callers that already own a runtime.
    pub async fn run_async<I, T>(&self, argv: I, env_vars: Vec<(String, String)>) -> Result<(), ClapdeckError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = match self.cli.clone().try_get_matches_from(argv) {
            Ok(m) => m,
            Err(e)
                if matches!(
                    e.kind(),
                    clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
                ) =>
            {
                let _ = e.print();
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let deepest = dispatch::get_deepest_matches(&matches);

        let verbosity = verbosity(deepest);
        if self.install_logging
            && let Err(e) = logging::init(verbosity)
        {
            debug!(error = %e, "tracing subscriber already installed");
        }

        let config = self.resolve_config(deepest, env_vars)?;
        let target = dispatch::resolve_target(&self.root, &self.globals, &matches);
        let Some(handler) = target.handler else {
            println!("{}", self.cli.clone().render_help());
            return Ok(());
        };
        debug!(command = %target.path.join(" "), "dispatching");
        let ctx = Context::new(target.path, target.args, config, verbosity);
        run_handler(handler, ctx).await
    }

    fn resolve_config(&self, matches: &ArgMatches, env_vars: Vec<(String, String)>) -> Result<ConfigNode, ClapdeckError> {
        let explicit = matches.try_get_one::<PathBuf>(CONFIG_FILE).ok().flatten();
        let found = match explicit {
            Some(path) => Some((path.clone(), file::load_required(path)?)),
            None => file::load_first(&self.candidates)?,
        };
        let file = found.map(|(path, content)| FileInput {
            codec: self.formats.codec(self.formats.for_path(&path)),
            path,
            content,
        });

        let input = ResolveInput {
            file,
            env_vars,
            cli_overrides: overrides::overrides_from_matches(&self.config_globals, matches),
        };
        let mut node = self.base.clone();
        resolve::resolve(&self.schema, &mut node, input)?;
        Ok(node)
    }
}

/// Await the handler, or stop at the first Ctrl-C.
pub async fn run_handler(handler: Arc<dyn CommandHandler>, ctx: Context) -> Result<(), ClapdeckError> {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // No signal handler could be installed; never interrupt.
            std::future::pending::<()>().await;
        }
    };
    run_until_interrupted(handler, ctx, ctrl_c).await
}

/// Await the handler, or stop once `interrupt` completes.
///
/// On interrupt the handler future is dropped before returning, so nothing
/// it owned outlives the run.
pub(crate) async fn run_until_interrupted(
    handler: Arc<dyn CommandHandler>,
    ctx: Context,
    interrupt: impl Future<Output = ()>,
) -> Result<(), ClapdeckError> {
    tokio::select! {
        result = handler.call(ctx) => result.map_err(|e| match e.downcast::<ClapdeckError>() {
            Ok(err) => err,
            Err(e) => ClapdeckError::Handler(e),
        }),
        () = interrupt => {
            warn!("interrupted");
            Err(ClapdeckError::Aborted)
        }
    }
}

/// Print an error the way its kind calls for and map it to an exit code.
pub fn report(result: Result<(), ClapdeckError>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(ClapdeckError::Usage(e)) => {
            let _ = e.print();
            ExitCode::from(crate::error::EXIT_USAGE)
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn verbosity(matches: &ArgMatches) -> Verbosity {
    Verbosity {
        verbose: matches.try_get_one::<u8>(VERBOSE).ok().flatten().copied().unwrap_or(0),
        quiet: matches.try_get_one::<bool>(QUIET).ok().flatten().copied().unwrap_or(false),
    }
}

/// Builder for an [`App`].
pub struct AppBuilder {
    name: Option<String>,
    about: Option<String>,
    version: Option<String>,
    schema: Schema,
    search_paths: Vec<SearchPath>,
    file_name: Option<String>,
    format: ConfigFormat,
    ini_root_section: Option<String>,
    root_args: Vec<Argument>,
    commands: Vec<Command>,
    main: Option<Arc<dyn CommandHandler>>,
    dump_config: bool,
    globals: Vec<Argument>,
    config_values: Option<serde_json::Value>,
    install_logging: bool,
}

impl AppBuilder {
    fn new() -> Self {
        Self {
            name: None,
            about: None,
            version: None,
            schema: Schema::empty(),
            search_paths: vec![SearchPath::Platform],
            file_name: None,
            format: ConfigFormat::default(),
            ini_root_section: None,
            root_args: Vec::new(),
            commands: Vec::new(),
            main: None,
            dump_config: true,
            globals: Vec::new(),
            config_values: None,
            install_logging: false,
        }
    }

    /// The program name. Also names the config file: `{name}.{ext}`.
    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn about(mut self, about: &str) -> Self {
        self.about = Some(about.to_string());
        self
    }

    /// Enables `--version`.
    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Where to look for the config file (default: `[Platform]`).
    ///
    /// Listed in priority order: the first candidate that exists is used.
    /// An empty list disables config files and `--config-file`.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = paths;
        self
    }

    /// Use exactly these files as candidates, in order.
    pub fn config_files<P: Into<PathBuf>>(mut self, paths: impl IntoIterator<Item = P>) -> Self {
        self.search_paths = paths.into_iter().map(|p| SearchPath::File(p.into())).collect();
        self
    }

    /// Config file name for directory search paths (default: `"{name}.{ext}"`).
    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = Some(name.to_string());
        self
    }

    /// Format for files whose extension doesn't tell (default: TOML).
    pub fn format(mut self, format: ConfigFormat) -> Self {
        self.format = format;
        self
    }

    pub fn ini_root_section(mut self, name: &str) -> Self {
        self.ini_root_section = Some(name.to_string());
        self
    }

    /// Values set from code. They win over files and the environment, and
    /// lose to global flags.
    pub fn config_values(mut self, values: serde_json::Value) -> Self {
        self.config_values = Some(values);
        self
    }

    pub fn command(mut self, cmd: Command) -> Self {
        self.commands.push(cmd);
        self
    }

    pub fn commands(mut self, cmds: impl IntoIterator<Item = Command>) -> Self {
        self.commands.extend(cmds);
        self
    }

    /// Handler run when no sub-command is given. Without one, help is shown.
    pub fn main(mut self, handler: impl CommandHandler + 'static) -> Self {
        self.main = Some(Arc::new(handler));
        self
    }

    /// An argument of `main`. Also accepted before any sub-command and bound
    /// into every handler.
    pub fn arg(mut self, arg: Argument) -> Self {
        self.root_args.push(arg);
        self
    }

    /// An argument accepted anywhere on the command line.
    pub fn global_argument(mut self, arg: Argument) -> Self {
        self.globals.push(arg);
        self
    }

    /// Generate the `dump-config` command (default: on).
    pub fn dump_config_command(mut self, enabled: bool) -> Self {
        self.dump_config = enabled;
        self
    }

    /// Install a stderr tracing subscriber driven by `-v`/`-q` on each run.
    pub fn install_logging(mut self, enabled: bool) -> Self {
        self.install_logging = enabled;
        self
    }

    /// Build and run with the process arguments.
    pub fn start(self) -> ExitCode {
        match self.build() {
            Ok(app) => app.start(),
            Err(e) => report(Err(e)),
        }
    }

    /// Check every declaration and build the clap tree.
    ///
    /// # Errors
    /// Any schema error: clashing flags or commands, bad argument layouts,
    /// or code-level config values that don't fit the schema.
    pub fn build(self) -> Result<App, ClapdeckError> {
        let name = self.name.ok_or_else(|| ClapdeckError::InvalidName {
            name: String::new(),
            reason: "an app name is required".into(),
        })?;
        let formats = Formats {
            default: self.format,
            ini_root_section: self.ini_root_section,
        };
        let file_name = self
            .file_name
            .unwrap_or_else(|| format!("{name}.{}", formats.default.extension()));
        let candidates = file::candidate_paths(&self.search_paths, &name, &file_name);
        let with_files = !self.search_paths.is_empty();

        let mut base = ConfigNode::new(&self.schema);
        if let Some(values) = &self.config_values {
            base.read_values(values)?;
        }

        let mut cli = clap::Command::new(name.clone());
        if let Some(about) = &self.about {
            cli = cli.about(about.clone());
        }
        if let Some(version) = &self.version {
            cli = cli.version(version.clone());
        }

        let mut reserved = Reserved::builtin(self.version.is_some());
        for arg in builtin_args(with_files) {
            reserved.ids.insert(arg.get_id().as_str().to_string());
            if let Some(long) = arg.get_long() {
                reserved.longs.insert(long.to_string());
            }
            if let Some(short) = arg.get_short() {
                reserved.shorts.insert(short);
            }
            cli = cli.arg(arg);
        }
        for arg in &self.globals {
            if arg.is_positional() || arg.is_required() {
                return Err(ClapdeckError::InvalidArgument {
                    command: name.clone(),
                    name: arg.name().to_string(),
                    reason: "global arguments must be optional flags or options".into(),
                });
            }
            reserved.claim(&name, arg)?;
            reserved.ids.insert(arg.name().to_string());
            cli = cli.arg(arg.to_clap().global(true));
        }
        let taken: Vec<&str> = reserved.longs.iter().map(String::as_str).collect();
        let config_globals = overrides::global_overrides(&self.schema, &taken)?;
        for g in &config_globals {
            reserved.longs.insert(g.flag.clone());
            cli = cli.arg(g.arg());
        }

        let mut root = Command::group(&name).args(self.root_args).subcommands(self.commands);
        if let Some(main) = self.main {
            root = root.runnable(ArcHandler(main));
        }
        if self.dump_config {
            root = root.subcommand(dump_config_command(candidates.clone(), formats.clone()));
        }
        let cli = tree::build(cli, &root, &reserved)?;
        debug!(app = %name, candidates = candidates.len(), "app built");

        Ok(App {
            name,
            schema: self.schema,
            candidates,
            formats,
            root,
            globals: self.globals,
            config_globals,
            base,
            cli,
            install_logging: self.install_logging,
        })
    }
}

fn builtin_args(with_files: bool) -> Vec<Arg> {
    let mut args = vec![
        Arg::new(VERBOSE)
            .short('v')
            .long("verbose")
            .action(ArgAction::Count)
            .global(true)
            .help("More output (repeatable)"),
        Arg::new(QUIET)
            .short('q')
            .long("quiet")
            .action(ArgAction::SetTrue)
            .global(true)
            .help("Only report errors"),
    ];
    if with_files {
        args.push(
            Arg::new(CONFIG_FILE)
                .short('c')
                .long("config-file")
                .value_name("PATH")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true)
                .help("Read config from this file"),
        );
    }
    args
}

/// Adapts an already shared handler to [`Command::runnable`].
struct ArcHandler(Arc<dyn CommandHandler>);

#[async_trait]
impl CommandHandler for ArcHandler {
    async fn call(&self, ctx: Context) -> anyhow::Result<()> {
        self.0.call(ctx).await
    }
}

struct DumpConfig {
    candidates: Vec<PathBuf>,
    formats: Formats,
}

#[async_trait]
impl CommandHandler for DumpConfig {
    async fn call(&self, ctx: Context) -> anyhow::Result<()> {
        let path = ctx
            .args()
            .get_path("outfile")
            .or_else(|| self.candidates.first().cloned())
            .ok_or(ClapdeckError::NoDumpPath)?;
        let format = match ctx.args().get_str("format") {
            Some(name) => ConfigFormat::from_str(name, true).map_err(anyhow::Error::msg)?,
            None => self.formats.for_path(&path),
        };
        let text = dump_tree(self.formats.codec(format).as_ref(), &ctx.config().to_tree())?;
        file::write_file(&path, &text)?;
        info!(path = %path.display(), %format, "wrote config");
        Ok(())
    }
}

fn dump_config_command(candidates: Vec<PathBuf>, formats: Formats) -> Command {
    let names: Vec<String> = ConfigFormat::value_variants()
        .iter()
        .filter_map(|f| f.to_possible_value())
        .map(|v| v.get_name().to_string())
        .collect();
    Command::new(DUMP_CONFIG, DumpConfig { candidates, formats })
        .help("Write the resolved config to a file")
        .arg(
            Argument::positional("outfile")
                .arg_type(ArgType::Path)
                .nargs(Nargs::Optional)
                .value_name("OUTFILE")
                .help("Output file (default: the first config file candidate)"),
        )
        .arg(
            Argument::option("format")
                .choices(names)
                .help("Output format (default: from the file extension)"),
        )
}
