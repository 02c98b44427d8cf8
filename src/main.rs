use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use orgmirror::{BackupOrchestrator, Config, GitHubLister, PlannedAction, Reporter};

#[derive(Parser)]
#[command(name = "orgmirror")]
#[command(about = "Back up every repository of your GitHub organizations")]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults to ./config.yaml, then the XDG config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Show what would be cloned or updated without touching the backup tree
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;
    info!("Starting orgmirror v{}", env!("CARGO_PKG_VERSION"));

    let config_path = Config::resolve_path(cli.config);
    let config = Config::load(&config_path)
        .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;

    let lister = GitHubLister::new(&config)?;

    if cli.dry_run {
        cmd_plan(config, lister).await
    } else {
        cmd_backup(config, lister).await
    }
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stdout carries the per-repository report
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

/// Run one full backup sweep
async fn cmd_backup(config: Config, lister: GitHubLister) -> Result<()> {
    let reporter = Reporter::open(&config.log_path());
    let mut orchestrator = BackupOrchestrator::new(config, Box::new(lister), reporter)?;

    println!("🔄 Backing up organizations");
    let summary = orchestrator.run().await.context("Backup aborted")?;

    if summary.has_failures() {
        println!("\n🔍 Failed operations:");
        for outcome in summary.failures() {
            println!(
                "   ❌ {}: {}",
                outcome.subject(),
                outcome.detail.as_deref().unwrap_or("failed")
            );
        }
    }

    Ok(())
}

/// Preview the sweep
async fn cmd_plan(config: Config, lister: GitHubLister) -> Result<()> {
    let reporter = Reporter::with_writers(None, Box::new(std::io::sink()));
    let orchestrator = BackupOrchestrator::new(config, Box::new(lister), reporter)?;

    println!("🔍 Dry run mode - analyzing backup tree");
    let plan = orchestrator.plan().await;

    let mut to_clone = 0;
    let mut to_update = 0;
    let mut blocked = 0;

    for entry in &plan.entries {
        match &entry.action {
            PlannedAction::Clone => {
                to_clone += 1;
                println!("   📥 Clone: {}", entry.repository.full_name());
            }
            PlannedAction::Update => {
                to_update += 1;
                println!("   🔄 Update: {}", entry.repository.full_name());
            }
            PlannedAction::Blocked(reason) => {
                blocked += 1;
                println!(
                    "   ⚠️  Blocked: {} ({})",
                    entry.repository.full_name(),
                    reason
                );
            }
        }
    }

    for (organization, reason) in &plan.unreachable {
        println!("   ❌ {}: {}", organization, reason);
    }

    println!("\n📈 Summary:");
    println!("   📥 Repositories to clone: {}", to_clone);
    println!("   🔄 Repositories to update: {}", to_update);
    println!("   ⚠️  Repositories that would fail: {}", blocked);
    println!("   ❌ Unreachable organizations: {}", plan.unreachable.len());

    Ok(())
}
