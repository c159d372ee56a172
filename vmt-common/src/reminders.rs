//! Reminder evaluation
//!
//! Both oil changes and planned maintenance are judged the same way: the
//! remaining miles and remaining days are compared against a "soon" and a
//! "due" threshold, and whichever measure is closer to its limit wins.

use crate::config::ReminderConfig;
use crate::db::models::{FutureMaintenance, MaintenanceRecord, Vehicle};
use crate::db::{future, maintenance, vehicles};
use crate::parse::{format_thousands, is_placeholder_date};
use crate::Result;
use chrono::{Months, NaiveDate};
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderState {
    Ok,
    Soon,
    Due,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl ReminderState {
    pub fn urgency(self) -> Urgency {
        match self {
            ReminderState::Ok => Urgency::Low,
            ReminderState::Soon => Urgency::Medium,
            ReminderState::Due => Urgency::High,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReminderState::Ok => "ok",
            ReminderState::Soon => "soon",
            ReminderState::Due => "due",
        }
    }
}

/// Remaining-distance and remaining-time limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub soon_miles: i64,
    pub soon_days: i64,
    pub due_miles: i64,
    pub due_days: i64,
}

/// Classify remaining miles/days; an absent measure never triggers
pub fn classify(
    miles_remaining: Option<i64>,
    days_remaining: Option<i64>,
    thresholds: &Thresholds,
) -> ReminderState {
    let within = |miles_limit: i64, days_limit: i64| {
        miles_remaining.is_some_and(|m| m <= miles_limit)
            || days_remaining.is_some_and(|d| d <= days_limit)
    };

    if within(thresholds.due_miles, thresholds.due_days) {
        ReminderState::Due
    } else if within(thresholds.soon_miles, thresholds.soon_days) {
        ReminderState::Soon
    } else {
        ReminderState::Ok
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OilChangeStatus {
    pub record_id: i64,
    /// `None` when the oil change carries the placeholder date
    pub last_date: Option<NaiveDate>,
    pub last_mileage: i64,
    pub current_mileage: i64,
    pub interval: i64,
    pub miles_since_last: i64,
    pub miles_until_due: i64,
    pub days_until_due: Option<i64>,
    pub state: ReminderState,
    pub overdue: bool,
}

impl OilChangeStatus {
    /// `overdue`, `due_soon` or `good`
    pub fn label(&self) -> &'static str {
        if self.overdue {
            "overdue"
        } else if self.state == ReminderState::Ok {
            "good"
        } else {
            "due_soon"
        }
    }
}

/// Status of the next oil change after `last`
pub fn oil_change_status(
    last: &MaintenanceRecord,
    current_mileage: i64,
    today: NaiveDate,
    config: &ReminderConfig,
) -> OilChangeStatus {
    let interval = last
        .oil_change_interval
        .filter(|i| *i > 0)
        .unwrap_or(config.oil_change_interval);
    let current_mileage = current_mileage.max(last.mileage);
    let miles_since_last = current_mileage.saturating_sub(last.mileage);
    let miles_until_due = interval.saturating_sub(miles_since_last);

    let last_date = (!is_placeholder_date(last.date)).then_some(last.date);
    let days_until_due = last_date
        .and_then(|d| d.checked_add_months(Months::new(config.oil_change_months)))
        .map(|due| (due - today).num_days());

    let state = classify(Some(miles_until_due), days_until_due, &config.oil_thresholds());
    let overdue = miles_until_due < 0 || days_until_due.is_some_and(|d| d < 0);

    OilChangeStatus {
        record_id: last.id,
        last_date,
        last_mileage: last.mileage,
        current_mileage,
        interval,
        miles_since_last,
        miles_until_due,
        days_until_due,
        state,
        overdue,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggeredMaintenance {
    pub item: FutureMaintenance,
    pub miles_remaining: Option<i64>,
    pub days_remaining: Option<i64>,
    pub state: ReminderState,
    pub overdue: bool,
}

/// Judge a planned item against its own reminder windows
pub fn evaluate_future(
    item: &FutureMaintenance,
    current_mileage: Option<i64>,
    today: NaiveDate,
) -> TriggeredMaintenance {
    let miles_remaining = item
        .target_mileage
        .zip(current_mileage)
        .map(|(target, current)| target.saturating_sub(current));
    let days_remaining = item.target_date.map(|d| (d - today).num_days());

    let thresholds = Thresholds {
        soon_miles: item.mileage_reminder,
        soon_days: item.date_reminder,
        due_miles: 0,
        due_days: 0,
    };
    let state = classify(miles_remaining, days_remaining, &thresholds);
    let overdue =
        miles_remaining.is_some_and(|m| m < 0) || days_remaining.is_some_and(|d| d < 0);

    TriggeredMaintenance {
        item: item.clone(),
        miles_remaining,
        days_remaining,
        state,
        overdue,
    }
}

/// Everything reminder-related about one vehicle
#[derive(Debug, Clone, Serialize)]
pub struct VehicleReminders {
    pub vehicle_id: i64,
    pub vehicle_name: String,
    pub current_mileage: Option<i64>,
    pub oil: Option<OilChangeStatus>,
    /// Every active planned item, evaluated
    pub maintenance: Vec<TriggeredMaintenance>,
}

impl VehicleReminders {
    pub fn worst_state(&self) -> ReminderState {
        self.maintenance
            .iter()
            .map(|m| m.state)
            .chain(self.oil.iter().map(|o| o.state))
            .max()
            .unwrap_or(ReminderState::Ok)
    }

    pub fn triggered(&self) -> impl Iterator<Item = &TriggeredMaintenance> {
        self.maintenance
            .iter()
            .filter(|m| m.state != ReminderState::Ok)
    }
}

pub async fn vehicle_reminders(
    pool: &SqlitePool,
    vehicle: &Vehicle,
    today: NaiveDate,
    config: &ReminderConfig,
) -> Result<VehicleReminders> {
    let current_mileage = vehicles::current_mileage(pool, vehicle.id).await?;
    let oil = maintenance::latest_oil_change(pool, vehicle.id)
        .await?
        .map(|last| oil_change_status(&last, current_mileage.unwrap_or(0), today, config));
    let maintenance = future::list_for_vehicle(pool, vehicle.id, true)
        .await?
        .iter()
        .map(|item| evaluate_future(item, current_mileage, today))
        .collect();

    Ok(VehicleReminders {
        vehicle_id: vehicle.id,
        vehicle_name: vehicle.name.clone(),
        current_mileage,
        oil,
        maintenance,
    })
}

pub async fn all_vehicle_reminders(
    pool: &SqlitePool,
    today: NaiveDate,
    config: &ReminderConfig,
) -> Result<Vec<VehicleReminders>> {
    let mut all = Vec::new();
    for vehicle in vehicles::list_vehicles(pool, None).await? {
        all.push(vehicle_reminders(pool, &vehicle, today, config).await?);
    }
    Ok(all)
}

/// Worst reminder state of one vehicle, for the dashboard
#[derive(Debug, Clone, Serialize)]
pub struct VehicleHealth {
    pub vehicle_id: i64,
    pub vehicle_name: String,
    pub current_mileage: Option<i64>,
    pub state: ReminderState,
    pub oil_label: Option<&'static str>,
    pub triggered_count: usize,
}

impl From<&VehicleReminders> for VehicleHealth {
    fn from(reminders: &VehicleReminders) -> Self {
        let oil_triggered = reminders
            .oil
            .as_ref()
            .is_some_and(|o| o.state != ReminderState::Ok);
        Self {
            vehicle_id: reminders.vehicle_id,
            vehicle_name: reminders.vehicle_name.clone(),
            current_mileage: reminders.current_mileage,
            state: reminders.worst_state(),
            oil_label: reminders.oil.as_ref().map(OilChangeStatus::label),
            triggered_count: reminders.triggered().count() + usize::from(oil_triggered),
        }
    }
}

pub async fn vehicle_health(
    pool: &SqlitePool,
    today: NaiveDate,
    config: &ReminderConfig,
) -> Result<Vec<VehicleHealth>> {
    let all = all_vehicle_reminders(pool, today, config).await?;
    Ok(all.iter().map(VehicleHealth::from).collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OilChange,
    Maintenance,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub vehicle_id: i64,
    pub vehicle_name: String,
    /// Planned item id for maintenance notifications
    pub item_id: Option<i64>,
    pub title: String,
    pub message: String,
    pub urgency: Urgency,
    pub overdue: bool,
    pub miles_remaining: Option<i64>,
    pub days_remaining: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationFeed {
    pub notifications: Vec<Notification>,
    pub total_count: usize,
    pub has_overdue: bool,
}

fn remaining_text(miles: Option<i64>, days: Option<i64>) -> String {
    let mut parts = Vec::new();
    if let Some(m) = miles {
        if m < 0 {
            parts.push(format!("{} miles overdue", format_thousands(-m)));
        } else {
            parts.push(format!("in {} miles", format_thousands(m)));
        }
    }
    if let Some(d) = days {
        match d {
            d if d < 0 => parts.push(format!("{} days overdue", -d)),
            0 => parts.push("today".to_string()),
            d => parts.push(format!("in {d} days")),
        }
    }
    parts.join(" / ")
}

/// Oil changes and planned items that are due soon or due, most urgent first
pub fn build_feed(reminders: &[VehicleReminders]) -> NotificationFeed {
    let mut notifications = Vec::new();

    for vehicle in reminders {
        if let Some(oil) = vehicle.oil.as_ref().filter(|o| o.state != ReminderState::Ok) {
            notifications.push(Notification {
                kind: NotificationKind::OilChange,
                vehicle_id: vehicle.vehicle_id,
                vehicle_name: vehicle.vehicle_name.clone(),
                item_id: None,
                title: "Oil change".to_string(),
                message: format!(
                    "Oil change {}",
                    remaining_text(Some(oil.miles_until_due), oil.days_until_due)
                ),
                urgency: oil.state.urgency(),
                overdue: oil.overdue,
                miles_remaining: Some(oil.miles_until_due),
                days_remaining: oil.days_until_due,
            });
        }

        for triggered in vehicle.triggered() {
            notifications.push(Notification {
                kind: NotificationKind::Maintenance,
                vehicle_id: vehicle.vehicle_id,
                vehicle_name: vehicle.vehicle_name.clone(),
                item_id: Some(triggered.item.id),
                title: triggered.item.maintenance_type.clone(),
                message: format!(
                    "{} {}",
                    triggered.item.maintenance_type,
                    remaining_text(triggered.miles_remaining, triggered.days_remaining)
                ),
                urgency: triggered.state.urgency(),
                overdue: triggered.overdue,
                miles_remaining: triggered.miles_remaining,
                days_remaining: triggered.days_remaining,
            });
        }
    }

    notifications.sort_by(|a, b| {
        b.urgency
            .cmp(&a.urgency)
            .then(b.overdue.cmp(&a.overdue))
            .then(a.miles_remaining.unwrap_or(i64::MAX).cmp(&b.miles_remaining.unwrap_or(i64::MAX)))
    });

    let has_overdue = notifications.iter().any(|n| n.urgency == Urgency::High);
    NotificationFeed {
        total_count: notifications.len(),
        has_overdue,
        notifications,
    }
}

pub async fn notifications(
    pool: &SqlitePool,
    today: NaiveDate,
    config: &ReminderConfig,
) -> Result<NotificationFeed> {
    let reminders = all_vehicle_reminders(pool, today, config).await?;
    Ok(build_feed(&reminders))
}
