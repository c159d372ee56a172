//! vmt-notify - Vehicle maintenance reminder dispatcher
//!
//! Sends reminder emails for subscriptions whose vehicles have planned
//! maintenance. Shares the database with vmt-web.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use vmt_common::config::{RootFolderInitializer, RootFolderResolver, TomlConfig};
use vmt_common::db::init_database;
use vmt_common::notify::mailer_from_config;
use vmt_notify::{dispatch_period, run_loop, run_once};

/// Command-line arguments for vmt-notify
#[derive(Parser, Debug)]
#[command(name = "vmt-notify")]
#[command(about = "Vehicle maintenance reminder dispatcher")]
#[command(version)]
struct Args {
    /// Root folder holding vmt.db and the mail outbox
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run a single pass and exit
    #[arg(long)]
    once: bool,

    /// Minutes between passes (overrides the config file)
    #[arg(short, long, env = "VMT_NOTIFY_INTERVAL")]
    interval_minutes: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = TomlConfig::load(args.config.as_deref());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting reminder dispatcher (vmt-notify) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = RootFolderResolver::new(args.root_folder, &config).resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer.ensure_directory_exists()?;

    let db_path = initializer.database_path();
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path, &config.owner)
        .await
        .context("Failed to initialize database")?;

    let mailer = mailer_from_config(&config.mail, initializer.outbox_path(&config.mail));
    info!("Mail transport: {}", mailer.name());

    if args.once {
        let report = run_once(&pool, mailer.as_ref(), &config).await?;
        info!(
            "Checked {} subscription(s), sent {}, failed {}",
            report.checked, report.sent, report.failed
        );
        return Ok(());
    }

    let period = dispatch_period(args.interval_minutes, &config);
    info!("Dispatching every {} minute(s)", period.as_secs() / 60);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };
    run_loop(&pool, mailer.as_ref(), &config, period, shutdown).await;

    info!("Dispatcher shutdown complete");
    Ok(())
}
