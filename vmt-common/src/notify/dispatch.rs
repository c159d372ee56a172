//! Reminder dispatch over all active subscriptions

use crate::config::{MailConfig, ReminderConfig};
use crate::db::{subscriptions, vehicles};
use crate::notify::{compose_reminder, Mailer};
use crate::reminders::{vehicle_reminders, VehicleReminders};
use crate::Result;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub checked: usize,
    pub sent: usize,
    /// Last email went out less than `reminder_frequency_days` ago
    pub skipped_recent: usize,
    /// Vehicle has no active planned maintenance
    pub skipped_no_items: usize,
    pub failed: usize,
}

/// Whether a subscription may receive another email on `today`
pub fn is_due_for_email(last_sent: Option<NaiveDate>, frequency_days: i64, today: NaiveDate) -> bool {
    match last_sent {
        None => true,
        Some(last) => (today - last).num_days() >= frequency_days,
    }
}

/// Send one reminder per eligible subscription
///
/// A failed send is logged and counted; the batch continues and the
/// subscription stays eligible for the next run.
pub async fn dispatch_reminders(
    pool: &SqlitePool,
    mailer: &dyn Mailer,
    today: NaiveDate,
    reminder_config: &ReminderConfig,
    mail_config: &MailConfig,
) -> Result<DispatchReport> {
    let mut report = DispatchReport::default();
    let mut cache: HashMap<i64, VehicleReminders> = HashMap::new();

    for subscription in subscriptions::list_active(pool).await? {
        report.checked += 1;

        if !is_due_for_email(
            subscription.last_email_sent,
            subscription.reminder_frequency_days,
            today,
        ) {
            debug!(subscription_id = subscription.id, "Reminder sent recently, skipping");
            report.skipped_recent += 1;
            continue;
        }

        let vehicle = vehicles::get_vehicle(pool, subscription.vehicle_id).await?;
        if !cache.contains_key(&vehicle.id) {
            let reminders = vehicle_reminders(pool, &vehicle, today, reminder_config).await?;
            cache.insert(vehicle.id, reminders);
        }
        let Some(reminders) = cache.get(&vehicle.id) else {
            continue;
        };

        if reminders.maintenance.is_empty() {
            report.skipped_no_items += 1;
            continue;
        }

        let email = compose_reminder(&vehicle, reminders, &subscription, mail_config);
        match mailer.send(&email).await {
            Ok(()) => {
                subscriptions::mark_sent(pool, subscription.id, today).await?;
                report.sent += 1;
            }
            Err(e) => {
                warn!(
                    subscription_id = subscription.id,
                    to = %subscription.email_address,
                    "Failed to send reminder: {}",
                    e
                );
                report.failed += 1;
            }
        }
    }

    info!(
        checked = report.checked,
        sent = report.sent,
        failed = report.failed,
        transport = mailer.name(),
        "Reminder dispatch finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::is_due_for_email;
    use chrono::NaiveDate;

    #[test]
    fn frequency_window() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        assert!(is_due_for_email(None, 7, today));
        assert!(is_due_for_email(NaiveDate::from_ymd_opt(2024, 5, 3), 7, today));
        assert!(!is_due_for_email(NaiveDate::from_ymd_opt(2024, 5, 4), 7, today));
        assert!(!is_due_for_email(Some(today), 1, today));
    }
}
