//! vmt-notify library - reminder email dispatcher
//!
//! Runs the reminder pass from `vmt_common::notify` against the shared
//! database, either once or on a fixed interval.

use std::future::Future;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use sqlx::SqlitePool;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use vmt_common::config::TomlConfig;
use vmt_common::notify::{dispatch_reminders, DispatchReport, Mailer};

/// One dispatch pass dated today
pub async fn run_once(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    config: &TomlConfig,
) -> vmt_common::Result<DispatchReport> {
    run_once_on(pool, mailer, config, Local::now().date_naive()).await
}

/// One dispatch pass for an explicit date
pub async fn run_once_on(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    config: &TomlConfig,
    today: NaiveDate,
) -> vmt_common::Result<DispatchReport> {
    dispatch_reminders(pool, mailer, today, &config.reminders, &config.mail).await
}

/// Dispatch every `period` until `shutdown` resolves
///
/// The first pass runs immediately. A failed pass is logged and the loop
/// keeps going. Returns the number of passes that completed.
pub async fn run_loop<F>(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    config: &TomlConfig,
    period: Duration,
    shutdown: F,
) -> usize
where
    F: Future<Output = ()>,
{
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut passes = 0;
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!(passes, "Dispatcher stopping");
                break;
            }
            _ = ticker.tick() => {
                match run_once(pool, mailer, config).await {
                    Ok(report) => {
                        passes += 1;
                        info!(
                            sent = report.sent,
                            skipped_recent = report.skipped_recent,
                            skipped_no_items = report.skipped_no_items,
                            failed = report.failed,
                            "Dispatch pass complete"
                        );
                    }
                    Err(e) => error!("Dispatch pass failed: {}", e),
                }
            }
        }
    }
    passes
}

/// Interval from the CLI override or `[notify] interval_minutes`, at least one minute
pub fn dispatch_period(cli_minutes: Option<u64>, config: &TomlConfig) -> Duration {
    let minutes = cli_minutes.unwrap_or(config.notify.interval_minutes).max(1);
    Duration::from_secs(minutes * 60)
}
