mod cmd_config;
mod cmd_run;
mod cmd_status;
mod cmd_stop;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use trawl_store::StorePaths;

#[derive(Parser)]
#[command(name = "trawl", version, about = "Paced group-post scraper")]
struct Cli {
    /// Store root (defaults to $TRAWL_HOME or the platform data dir)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start a session and run it in the foreground (Ctrl+C stops it)
    Run,
    /// Stop a session running in another process
    Stop,
    /// Show the current session, quota and store size
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage config.json
    Config {
        #[command(subcommand)]
        cmd: cmd_config::ConfigCmd,
    },
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = match std::env::var("TRAWL_LOG") {
        Ok(filter) if !filter.trim().is_empty() => EnvFilter::try_new(filter)?,
        _ => EnvFilter::new("info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;
    let paths = match cli.root {
        Some(root) => StorePaths::discover(root),
        None => StorePaths::default_root(),
    };

    match cli.cmd {
        Command::Run => cmd_run::execute(&paths),
        Command::Stop => cmd_stop::execute(&paths),
        Command::Status { json } => cmd_status::execute(&paths, json),
        Command::Config { cmd } => cmd_config::run(cmd, &paths),
    }
}
