//! newstate command-line tool
//!
//! Runs Lua code inside isolated child states:
//! - `run` executes a host script that can `require("newstate")`
//! - `exec` / `eval` load one chunk into a fresh child state and print its
//!   results, one per line

mod commands;
mod config;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use commands::exec::Chunk;
use config::{BridgeFlags, CliConfig};
use output::{resolve_color_choice, StyledOutput};

/// Environment variable holding the log filter
const LOG_ENV: &str = "NEWSTATE_LOG";

#[derive(Parser)]
#[command(name = "newstate")]
#[command(about = "Run Lua code in isolated child states", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./newstate.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// When to use colors: auto, always, never
    #[arg(long, global = true, value_parser = ["auto", "always", "never"])]
    color: Option<String>,

    #[command(flatten)]
    bridge: BridgeFlags,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a host Lua script with the newstate module available
    Run {
        /// Script file
        script: PathBuf,
        /// Arguments passed to the script
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run a Lua file in a fresh child state and print its results
    Exec {
        /// Lua file
        file: PathBuf,
        /// Arguments (nil, booleans and numbers are converted)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Run inline Lua code in a fresh child state and print its results
    Eval {
        /// Lua source
        code: String,
        /// Arguments (nil, booleans and numbers are converted)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| "warn".into());
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let mut out = StyledOutput::new(resolve_color_choice(cli.color.as_deref()));

    if let Err(err) = dispatch(cli, &mut out) {
        out.stderr_error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli, out: &mut StyledOutput) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config = CliConfig::discover(cli.config.as_deref(), &cwd)?;
    let options = cli.bridge.apply(config.bridge);
    tracing::debug!("bridge options: {:?}", options);

    match cli.command {
        Commands::Run { script, args } => commands::run::execute(&script, &args, options),
        Commands::Exec { file, args } => {
            commands::exec::execute(Chunk::File(file), &args, options, out)
        }
        Commands::Eval { code, args } => {
            commands::exec::execute(Chunk::Inline(code), &args, options, out)
        }
    }
}
