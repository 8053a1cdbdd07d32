use clap::Subcommand;

use trawl_core::config::Settings;
use trawl_store::{SettingsFile, StorePaths};

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Write a default config.json
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print where trawl keeps its files
    Path,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, paths: &StorePaths) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Init { force } => init(paths, force),
        ConfigCmd::Path => {
            print_paths(paths);
            Ok(())
        }
    }
}

// ── Command Implementations ──

fn init(paths: &StorePaths, force: bool) -> anyhow::Result<()> {
    let file = SettingsFile::new(paths);
    if file.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            paths.config_json.display()
        );
    }
    paths.ensure_dirs()?;
    file.save(&Settings::default())?;
    println!("Wrote {}", paths.config_json.display());
    println!("Add group URLs to `group_links` and a `browserless.url` before `trawl run`.");
    Ok(())
}

fn print_paths(paths: &StorePaths) {
    println!("root:   {}", paths.root.display());
    println!("config: {}", paths.config_json.display());
    println!("posts:  {}", paths.posts_json.display());
    println!("quota:  {}", paths.quota_json.display());
    println!("status: {}", paths.status_json.display());
    println!("events: {}", paths.events_jsonl.display());
}
