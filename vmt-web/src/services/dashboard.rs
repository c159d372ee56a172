//! Dashboard figures shared by the home page and `/api/summary`

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use sqlx::SqlitePool;
use vmt_common::config::ReminderConfig;
use vmt_common::db::maintenance::{self, MaintenanceSummary, RecentActivity};
use vmt_common::reminders::{self, NotificationFeed, VehicleHealth};
use vmt_common::Result;

/// Days of history shown under "recent activity"
pub const RECENT_ACTIVITY_DAYS: i64 = 30;
pub const RECENT_ACTIVITY_LIMIT: i64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    #[serde(flatten)]
    pub totals: MaintenanceSummary,
    pub miles_this_year: i64,
    pub recent_activity: Vec<RecentActivity>,
    pub notifications: NotificationFeed,
    pub vehicle_health: Vec<VehicleHealth>,
}

pub async fn gather(pool: &SqlitePool, today: NaiveDate, config: &ReminderConfig) -> Result<Dashboard> {
    let totals = maintenance::summary(pool).await?;

    let year_start = NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today);
    let miles_this_year = maintenance::miles_driven_between(pool, year_start, today).await?;

    let since = today - Duration::days(RECENT_ACTIVITY_DAYS);
    let recent_activity = maintenance::recent_activity(pool, since, RECENT_ACTIVITY_LIMIT).await?;

    let all = reminders::all_vehicle_reminders(pool, today, config).await?;
    let notifications = reminders::build_feed(&all);
    let vehicle_health = all.iter().map(VehicleHealth::from).collect();

    Ok(Dashboard {
        totals,
        miles_this_year,
        recent_activity,
        notifications,
        vehicle_health,
    })
}
