//! # clapdeck demo application
//!
//! A small CLI showing how an application is put together with clapdeck.
//! It doesn't do anything useful; it exists to try the features by hand.
//!
//! ## Running
//!
//! ```sh
//! cargo run --example clapdeck_demo -- echo
//! cargo run --example clapdeck_demo -- dump-config demo.yaml
//! ```
//!
//! ## Features demonstrated
//!
//! | Feature                 | How to exercise it                                                     |
//! |-------------------------|------------------------------------------------------------------------|
//! | Defaults                | `cargo run --example clapdeck_demo -- echo`                            |
//! | Config file (cwd)       | Create `clapdeck-demo.toml` in cwd, then run `echo`                    |
//! | Explicit config file    | `cargo run --example clapdeck_demo -- -c demo.yaml echo`               |
//! | Env var                 | `SERVER_PORT=9999 cargo run --example clapdeck_demo -- echo`           |
//! | Global config flag      | `cargo run --example clapdeck_demo -- echo --display-color blue`       |
//! | Dump the config         | `cargo run --example clapdeck_demo -- dump-config out.ini`             |
//! | Async handler           | `cargo run --example clapdeck_demo -- -v serve --requests 5`           |
//! | Command group           | `cargo run --example clapdeck_demo -- remote --name up add git://x`    |
//! | Fallback `main`         | `cargo run --example clapdeck_demo`                                    |

use std::process::ExitCode;
use std::time::Duration;

use clapdeck::{App, ArgType, Argument, Command, Context, Field, Schema, SearchPath, Section};
use tracing::info;

fn schema() -> Result<Schema, clapdeck::ClapdeckError> {
    Schema::builder()
        .comment("Settings for the clapdeck demo.")
        .field(
            Field::string("name")
                .default("clapdeck-demo")
                .comment("Application name shown in the echo banner."),
        )
        .section(
            Section::new("server")
                .comment("Server settings.")
                .field(Field::string("host").default("127.0.0.1").comment("Hostname to bind to."))
                .field(
                    Field::integer("port")
                        .default(8080)
                        .comment("Port to listen on.")
                        .auto_environ(),
                )
                .field(
                    Field::integer("max_connections")
                        .default(100)
                        .comment("Upper bound on concurrent requests handled by `serve`."),
                ),
        )
        .section(
            Section::new("display")
                .field(Field::string("color").default("yellow").auto_global())
                .field(Field::boolean("compact").default(false)),
        )
        .build()
}

async fn echo(ctx: Context) -> anyhow::Result<()> {
    let config = ctx.config();
    if let Some(key) = ctx.args().get_str("key") {
        match config.lookup(key)? {
            Some(value) => println!("{key} = {}", value.display()),
            None => println!("{key} is unset"),
        }
        return Ok(());
    }
    println!("== {} ==", config.get_str("name")?.unwrap_or_default());
    for (key, value) in config.flatten() {
        let shown = value.map(|v| v.display()).unwrap_or_else(|| "<null>".into());
        println!("{key:<24} {shown:<16} ({:?})", config.source_at(&key)?);
    }
    Ok(())
}

async fn serve(ctx: Context) -> anyhow::Result<()> {
    let requests = ctx.args().get_int("requests").unwrap_or(3);
    let server = ctx.config().section("server")?;
    let host = server.get_str("host")?.unwrap_or("127.0.0.1").to_string();
    let port = server.get_int("port")?.unwrap_or(8080);
    info!(%host, port, requests, "pretending to serve");

    let mut tasks = tokio::task::JoinSet::new();
    for id in 0..requests {
        tasks.spawn(async move {
            tokio::time::sleep(Duration::from_millis(50 * id as u64)).await;
            id
        });
    }
    while let Some(done) = tasks.join_next().await {
        println!("handled request {}", done?);
    }
    Ok(())
}

async fn remote_add(ctx: Context) -> anyhow::Result<()> {
    let args = ctx.args();
    println!(
        "adding remote {} -> {}",
        args.get_str("name").unwrap_or_default(),
        args.get_str("url").unwrap_or_default()
    );
    Ok(())
}

async fn main_handler(ctx: Context) -> anyhow::Result<()> {
    println!(
        "clapdeck demo: try `echo`, `serve` or `--help` (verbosity {})",
        ctx.verbosity().verbose
    );
    Ok(())
}

fn main() -> ExitCode {
    let schema = match schema() {
        Ok(schema) => schema,
        Err(e) => return clapdeck::report(Err(e)),
    };

    App::builder()
        .name("clapdeck-demo")
        .about("A sample CLI app for trying out clapdeck")
        .version(env!("CARGO_PKG_VERSION"))
        .schema(schema)
        .search_paths(vec![SearchPath::Cwd, SearchPath::Home(".clapdeck-demo".into()), SearchPath::Platform])
        .install_logging(true)
        .main(main_handler)
        .command(
            Command::new("echo", echo)
                .doc("Print the resolved config.\n\n* `key` - print only this dotted key")
                .arg(Argument::option("key").short('k')),
        )
        .command(
            Command::new("serve", serve)
                .doc("Handle a few fake requests concurrently.")
                .arg(
                    Argument::option("requests")
                        .arg_type(ArgType::Integer)
                        .help("How many requests to simulate"),
                ),
        )
        .command(
            Command::group("remote")
                .help("Manage remotes")
                .arg(Argument::option("name").default("origin"))
                .subcommand(
                    Command::new("add", remote_add)
                        .doc("Add a remote.\n\n:param url: where the remote lives")
                        .arg(Argument::positional("url")),
                ),
        )
        .start()
}
