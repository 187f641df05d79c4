//! # Upkeep — Maintenance Scheduling Engine
//!
//! Generates work orders from recurring maintenance schedules, reschedules
//! completed work, and sends due-date email notifications.
//!
//! Usage:
//!   upkeep run                           # Start the background scheduler
//!   upkeep check                         # Run a single cycle and exit
//!   upkeep notifications --limit 20      # Show recent notification records
//!   upkeep retry --id 7                  # Resend a failed notification

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use upkeep_core::config::UpkeepConfig;
use upkeep_core::traits::NotificationSender;
use upkeep_notify::{EmailNotifier, NotificationLog};
use upkeep_scheduler::BackgroundRunner;
use upkeep_store::SqliteWorkOrderStore;

#[derive(Parser)]
#[command(name = "upkeep", version, about = "🔧 Upkeep — Maintenance Scheduling Engine")]
struct Cli {
    /// Config file path (default: ~/.upkeep/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the background scheduler and run until interrupted
    Run,
    /// Run one scheduler cycle and exit
    Check,
    /// Show recent notification records
    Notifications {
        /// Maximum number of records to show
        #[arg(short, long, default_value = "20")]
        limit: u32,
    },
    /// Resend one failed notification
    Retry {
        /// Notification record id
        #[arg(long)]
        id: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "upkeep=debug,upkeep_scheduler=debug,upkeep_store=debug,upkeep_notify=debug"
    } else {
        "upkeep=info,upkeep_scheduler=info,upkeep_store=info,upkeep_notify=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => UpkeepConfig::load_from(path)?,
        None => UpkeepConfig::load()?,
    };

    match cli.command {
        Command::Run => run(&config).await,
        Command::Check => check(&config).await,
        Command::Notifications { limit } => notifications(&config, limit),
        Command::Retry { id } => retry(&config, id).await,
    }
}

fn open_store(config: &UpkeepConfig) -> Result<Arc<SqliteWorkOrderStore>> {
    Ok(Arc::new(SqliteWorkOrderStore::open(&config.database.path)?))
}

fn open_notifier(config: &UpkeepConfig) -> Result<Arc<EmailNotifier>> {
    let log = NotificationLog::open(&config.database.notification_log_path)?;
    Ok(Arc::new(EmailNotifier::new(config.email.clone(), log)))
}

async fn run(config: &UpkeepConfig) -> Result<()> {
    let store = open_store(config)?;
    let sender: Arc<dyn NotificationSender> = open_notifier(config)?;
    let mut runner = BackgroundRunner::new(store, sender, &config.scheduler)?;

    println!("🔧 Upkeep v{}", env!("CARGO_PKG_VERSION"));
    println!("   🗄️  Database:     {}", config.database.path.display());
    println!(
        "   📜 Audit Log:    {}",
        config.database.notification_log_path.display()
    );
    println!("   ⏰ Interval:     {}s", config.scheduler.check_interval_secs);
    if config.email.is_configured() {
        println!("   📧 Email:        {}", config.email.effective_from());
    } else {
        println!("   📧 Email:        disabled (notifications will be journaled as failed)");
    }
    println!();

    runner.start();
    tokio::signal::ctrl_c().await?;
    println!("\n⏹️  Stopping scheduler...");
    runner.stop().await;
    Ok(())
}

async fn check(config: &UpkeepConfig) -> Result<()> {
    let store = open_store(config)?;
    let sender: Arc<dyn NotificationSender> = open_notifier(config)?;
    let runner = BackgroundRunner::new(store, sender, &config.scheduler)?;

    let clean = runner.run_once().await;
    if clean {
        println!("✅ Cycle completed");
    } else {
        println!("⚠️  Cycle completed with errors (see log)");
    }
    Ok(())
}

fn notifications(config: &UpkeepConfig, limit: u32) -> Result<()> {
    let log = NotificationLog::open(&config.database.notification_log_path)?;
    let records = log.recent(limit)?;
    if records.is_empty() {
        println!("No notification records.");
        return Ok(());
    }
    for record in records {
        let when = record.created_at.format("%Y-%m-%d %H:%M");
        let status = match record.error.as_deref() {
            Some(err) => format!("{} ({err})", record.status.as_str()),
            None => record.status.as_str().to_string(),
        };
        println!(
            "#{:<5} {} {:<9} WO#{:<5} {} — {}",
            record.notification_id,
            when,
            record.kind.as_str(),
            record.reference_id,
            record.recipient,
            status,
        );
    }
    Ok(())
}

async fn retry(config: &UpkeepConfig, id: i64) -> Result<()> {
    let notifier = open_notifier(config)?;
    notifier.retry(id).await?;
    println!("✅ Notification #{id} sent");
    Ok(())
}
