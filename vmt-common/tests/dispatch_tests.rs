//! Reminder dispatch with recording and failing mailers

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::sync::Mutex;
use vmt_common::config::{MailConfig, ReminderConfig};
use vmt_common::db::models::{NewEmailSubscription, NewFutureMaintenance, NewVehicle};
use vmt_common::db::{future, init_memory_database, subscriptions, vehicles};
use vmt_common::notify::{dispatch_reminders, Mailer, OutgoingEmail};
use vmt_common::{Error, Result};

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: &OutgoingEmail) -> Result<()> {
        Err(Error::Internal("relay unavailable".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

async fn vehicle(pool: &SqlitePool, name: &str) -> i64 {
    vehicles::create_vehicle(
        pool,
        &NewVehicle {
            name: Some(name.to_string()),
            year: 2020,
            make: "Subaru".to_string(),
            model: "Outback".to_string(),
            vin: None,
            account_id: None,
        },
    )
    .await
    .unwrap()
    .id
}

async fn subscribe(pool: &SqlitePool, vehicle_id: i64, email: &str, days: i64) -> i64 {
    subscriptions::create(
        pool,
        &NewEmailSubscription {
            vehicle_id,
            email_address: email.to_string(),
            reminder_frequency_days: days,
        },
    )
    .await
    .unwrap()
    .id
}

async fn plan(pool: &SqlitePool, vehicle_id: i64) {
    future::create(
        pool,
        &NewFutureMaintenance {
            vehicle_id,
            maintenance_type: "Brake fluid".to_string(),
            target_date: NaiveDate::from_ymd_opt(2024, 9, 1),
            ..Default::default()
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_sends_to_subscriptions_with_planned_items() {
    let pool = init_memory_database().await.unwrap();
    let planned = vehicle(&pool, "Planned").await;
    let idle = vehicle(&pool, "Idle").await;
    plan(&pool, planned).await;

    let first = subscribe(&pool, planned, "a@example.com", 7).await;
    subscribe(&pool, planned, "b@example.com", 7).await;
    subscribe(&pool, idle, "c@example.com", 7).await;

    let mailer = RecordingMailer::default();
    let report = dispatch_reminders(
        &pool,
        &mailer,
        today(),
        &ReminderConfig::default(),
        &MailConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.checked, 3);
    assert_eq!(report.sent, 2);
    assert_eq!(report.skipped_no_items, 1);
    assert_eq!(report.failed, 0);

    let sent = mailer.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|e| e.subject == "Maintenance Reminder: Planned"));
    assert!(sent[0].html_body.contains("Brake fluid"));

    let sub = subscriptions::get(&pool, first).await.unwrap();
    assert_eq!(sub.last_email_sent, Some(today()));
}

#[tokio::test]
async fn test_frequency_suppresses_repeat_sends() {
    let pool = init_memory_database().await.unwrap();
    let vehicle_id = vehicle(&pool, "Wagon").await;
    plan(&pool, vehicle_id).await;
    subscribe(&pool, vehicle_id, "me@example.com", 7).await;

    let mailer = RecordingMailer::default();
    let reminders = ReminderConfig::default();
    let mail = MailConfig::default();

    let first = dispatch_reminders(&pool, &mailer, today(), &reminders, &mail).await.unwrap();
    assert_eq!(first.sent, 1);

    let later = today() + chrono::Duration::days(3);
    let second = dispatch_reminders(&pool, &mailer, later, &reminders, &mail).await.unwrap();
    assert_eq!(second.sent, 0);
    assert_eq!(second.skipped_recent, 1);

    let week_later = today() + chrono::Duration::days(7);
    let third = dispatch_reminders(&pool, &mailer, week_later, &reminders, &mail).await.unwrap();
    assert_eq!(third.sent, 1);
    assert_eq!(mailer.sent.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_send_keeps_subscription_eligible() {
    let pool = init_memory_database().await.unwrap();
    let vehicle_id = vehicle(&pool, "Wagon").await;
    plan(&pool, vehicle_id).await;
    let id = subscribe(&pool, vehicle_id, "me@example.com", 7).await;

    let report = dispatch_reminders(
        &pool,
        &FailingMailer,
        today(),
        &ReminderConfig::default(),
        &MailConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.sent, 0);
    assert_eq!(subscriptions::get(&pool, id).await.unwrap().last_email_sent, None);
}

#[tokio::test]
async fn test_paused_subscription_is_not_checked() {
    let pool = init_memory_database().await.unwrap();
    let vehicle_id = vehicle(&pool, "Wagon").await;
    plan(&pool, vehicle_id).await;
    let id = subscribe(&pool, vehicle_id, "me@example.com", 7).await;
    subscriptions::set_active(&pool, id, false).await.unwrap();

    let mailer = RecordingMailer::default();
    let report = dispatch_reminders(
        &pool,
        &mailer,
        today(),
        &ReminderConfig::default(),
        &MailConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(report.checked, 0);
    assert!(mailer.sent.lock().unwrap().is_empty());
}
