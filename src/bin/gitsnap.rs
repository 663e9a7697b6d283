//! # Gitsnap CLI - Project snapshots in a remote object store
//!
//! Command-line front-end for the gitsnap backup engine.
//!
//! ## Usage
//! ```bash
//! # Snapshot the current directory through the remote object API
//! gitsnap backup --owner acme --repo widgets
//!
//! # Snapshot through the local git tooling instead
//! gitsnap backup --owner acme --repo widgets --local-sync
//!
//! # Restore the working copy to the latest snapshot
//! gitsnap restore --owner acme --repo widgets
//!
//! # List recorded snapshots
//! gitsnap history --owner acme --repo widgets
//! ```
//!
//! The access token is read from `--token` or the `GITHUB_TOKEN`
//! environment variable.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use gitsnap::{
    backup_history, engine_for, restore_latest, BackupOptions, GitHubStore, RemoteConfig,
    SnapshotEngine,
};

/// Gitsnap CLI - snapshot a project tree into a remote object store
#[derive(Parser)]
#[command(name = "gitsnap")]
#[command(version)]
#[command(about = "Snapshot a project directory into a Git-compatible remote object store")]
struct Cli {
    /// Project directory (defaults to current)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RemoteArgs {
    /// Account or organization that owns the repository
    #[arg(long)]
    owner: String,

    /// Repository name
    #[arg(long)]
    repo: String,

    /// Access token (falls back to $GITHUB_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Tracked branch
    #[arg(short, long, default_value = "main")]
    branch: String,
}

impl RemoteArgs {
    fn into_config(self) -> anyhow::Result<RemoteConfig> {
        let token = match self.token {
            Some(token) => token,
            None => std::env::var("GITHUB_TOKEN")
                .context("no token given and GITHUB_TOKEN is not set")?,
        };
        Ok(RemoteConfig::new(self.owner, self.repo, token).with_branch(self.branch))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Record a snapshot and advance the tracked branch
    Backup {
        #[command(flatten)]
        remote: RemoteArgs,

        /// Use the local git tooling instead of the remote object API
        #[arg(long)]
        local_sync: bool,

        /// Skip the fast-forward attempt and update the branch with force
        #[arg(long)]
        force: bool,
    },

    /// Restore the working copy to the latest snapshot
    Restore {
        #[command(flatten)]
        remote: RemoteArgs,
    },

    /// List recorded snapshots
    History {
        #[command(flatten)]
        remote: RemoteArgs,

        /// Limit results
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .init();
    }

    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli).await {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let root = cli.path.unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Backup {
            remote,
            local_sync,
            force,
        } => cmd_backup(root, remote.into_config()?, local_sync, force).await,
        Commands::Restore { remote } => cmd_restore(root, remote.into_config()?).await,
        Commands::History { remote, limit } => cmd_history(remote.into_config()?, limit).await,
    }
}

async fn cmd_backup(
    root: PathBuf,
    config: RemoteConfig,
    local_sync: bool,
    force: bool,
) -> anyhow::Result<()> {
    let options = BackupOptions {
        use_local_sync: local_sync,
        force,
    };
    let engine = engine_for(config, options, root)?;

    println!(
        "{} (route: {})",
        "Creating snapshot...".blue().bold(),
        engine.name().cyan()
    );
    let result = engine.backup().await;

    if !result.succeeded {
        bail!(result.error.unwrap_or_else(|| "unknown failure".to_string()));
    }

    println!("{} Snapshot recorded", "✓".green().bold());
    if let Some(commit_id) = &result.commit_id {
        println!("  Commit: {}", short_id(commit_id).yellow().bold());
    }
    if let Some(count) = result.file_count {
        println!("  Files: {}", count.to_string().cyan());
    }
    if let Some(size) = result.total_size {
        println!("  Size: {}", format_bytes(size).cyan());
    }
    if result.branch_created {
        println!("  Branch created");
    }
    if result.forced {
        println!("  {}", "Branch updated with force".yellow());
    }
    if !result.pushed_to_remote {
        println!(
            "  {}",
            "Snapshot is local-only, the remote could not be reached".yellow()
        );
        if let Some(detail) = &result.error {
            println!("  Detail: {}", detail);
        }
    }
    Ok(())
}

async fn cmd_restore(root: PathBuf, config: RemoteConfig) -> anyhow::Result<()> {
    println!("{}", "Restoring from latest snapshot...".blue().bold());
    let result = restore_latest(&config, &root).await;

    if !result.succeeded {
        bail!(result.error.unwrap_or_else(|| "unknown failure".to_string()));
    }

    println!("{} Working copy restored", "✓".green().bold());
    if let Some(commit_id) = &result.commit_id {
        println!("  Commit: {}", short_id(commit_id).yellow().bold());
    }
    if let Some(count) = result.file_count {
        println!("  Files: {}", count.to_string().cyan());
    }
    Ok(())
}

async fn cmd_history(config: RemoteConfig, limit: usize) -> anyhow::Result<()> {
    let store = GitHubStore::new(&config)?;
    let history = backup_history(&store, &config.branch, limit).await?;

    if history.entries.is_empty() {
        println!("{}", "No commits found on the tracked branch.".yellow());
        return Ok(());
    }
    if !history.snapshots_only {
        println!(
            "{}",
            "No snapshot commits found, showing recent branch activity:".yellow()
        );
    }
    for entry in &history.entries {
        let subject = entry.message.lines().next().unwrap_or("");
        println!(
            "  {} {} {}",
            short_id(&entry.id).yellow(),
            entry.date.format("%Y-%m-%d %H:%M:%S").to_string().cyan(),
            subject
        );
    }
    Ok(())
}

fn short_id(id: &str) -> &str {
    if id.len() >= 8 {
        &id[..8]
    } else {
        id
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.2} {}", size, UNITS[unit])
    }
}
