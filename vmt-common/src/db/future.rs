//! Planned (future) maintenance queries

use crate::db::models::{FutureMaintenance, NewFutureMaintenance};
use crate::db::{clean_text, vehicles};
use crate::parse::MAX_MILEAGE;
use crate::{Error, Result};
use chrono::{Months, NaiveDate, Utc};
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::info;

fn validate(input: &NewFutureMaintenance) -> Result<NewFutureMaintenance> {
    let maintenance_type = input.maintenance_type.trim().to_string();
    if maintenance_type.is_empty() {
        return Err(Error::invalid("Maintenance type is required"));
    }
    if input.target_mileage.is_none() && input.target_date.is_none() {
        return Err(Error::invalid("A target mileage or target date is required"));
    }
    if input.target_mileage.is_some_and(|m| !(0..=MAX_MILEAGE).contains(&m)) {
        return Err(Error::invalid(format!(
            "Target mileage must be between 0 and {MAX_MILEAGE}"
        )));
    }
    if input.mileage_reminder < 0 || input.date_reminder < 0 {
        return Err(Error::invalid("Reminder windows cannot be negative"));
    }
    if input.mileage_reminder > MAX_MILEAGE {
        return Err(Error::invalid(format!(
            "Mileage reminder must be at most {MAX_MILEAGE} miles"
        )));
    }
    if input.recurrence_interval_miles.is_some_and(|m| m > MAX_MILEAGE) {
        return Err(Error::invalid(format!(
            "Recurrence interval must be at most {MAX_MILEAGE} miles"
        )));
    }
    if input.is_recurring
        && input.recurrence_interval_miles.unwrap_or(0) <= 0
        && input.recurrence_interval_months.unwrap_or(0) <= 0
    {
        return Err(Error::invalid(
            "Recurring maintenance needs an interval in miles or months",
        ));
    }

    Ok(NewFutureMaintenance {
        maintenance_type,
        parts_link: clean_text(input.parts_link.as_deref()),
        notes: clean_text(input.notes.as_deref()),
        ..input.clone()
    })
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<FutureMaintenance> {
    sqlx::query_as::<_, FutureMaintenance>("SELECT * FROM future_maintenance WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found(format!("Future maintenance {id}")))
}

/// Active items of every vehicle, soonest target first
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<FutureMaintenance>> {
    let items = sqlx::query_as::<_, FutureMaintenance>(
        r#"
        SELECT * FROM future_maintenance
        WHERE is_active = 1
        ORDER BY vehicle_id, target_date IS NULL, target_date, target_mileage
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(items)
}

pub async fn list_for_vehicle(
    pool: &SqlitePool,
    vehicle_id: i64,
    active_only: bool,
) -> Result<Vec<FutureMaintenance>> {
    let items = sqlx::query_as::<_, FutureMaintenance>(
        r#"
        SELECT * FROM future_maintenance
        WHERE vehicle_id = ? AND (? = 0 OR is_active = 1)
        ORDER BY is_active DESC, target_date IS NULL, target_date, target_mileage
        "#,
    )
    .bind(vehicle_id)
    .bind(active_only)
    .fetch_all(pool)
    .await?;

    Ok(items)
}

async fn insert(
    tx: &mut Transaction<'_, Sqlite>,
    item: &NewFutureMaintenance,
) -> Result<i64> {
    let now = Utc::now();
    let id = sqlx::query(
        r#"
        INSERT INTO future_maintenance (
            vehicle_id, maintenance_type, target_mileage, target_date,
            mileage_reminder, date_reminder, estimated_cost, parts_link, notes,
            is_recurring, recurrence_interval_miles, recurrence_interval_months,
            is_active, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
        "#,
    )
    .bind(item.vehicle_id)
    .bind(&item.maintenance_type)
    .bind(item.target_mileage)
    .bind(item.target_date)
    .bind(item.mileage_reminder)
    .bind(item.date_reminder)
    .bind(item.estimated_cost)
    .bind(&item.parts_link)
    .bind(&item.notes)
    .bind(item.is_recurring)
    .bind(item.recurrence_interval_miles)
    .bind(item.recurrence_interval_months)
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn create(pool: &SqlitePool, input: &NewFutureMaintenance) -> Result<FutureMaintenance> {
    let item = validate(input)?;
    vehicles::get_vehicle(pool, item.vehicle_id).await?;

    let mut tx = pool.begin().await?;
    let id = insert(&mut tx, &item).await?;
    tx.commit().await?;

    info!(id, vehicle_id = item.vehicle_id, kind = %item.maintenance_type, "Scheduled maintenance");
    get(pool, id).await
}

pub async fn update(
    pool: &SqlitePool,
    id: i64,
    input: &NewFutureMaintenance,
) -> Result<FutureMaintenance> {
    get(pool, id).await?;
    let item = validate(input)?;
    vehicles::get_vehicle(pool, item.vehicle_id).await?;

    sqlx::query(
        r#"
        UPDATE future_maintenance SET
            vehicle_id = ?, maintenance_type = ?, target_mileage = ?, target_date = ?,
            mileage_reminder = ?, date_reminder = ?, estimated_cost = ?, parts_link = ?,
            notes = ?, is_recurring = ?, recurrence_interval_miles = ?,
            recurrence_interval_months = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(item.vehicle_id)
    .bind(&item.maintenance_type)
    .bind(item.target_mileage)
    .bind(item.target_date)
    .bind(item.mileage_reminder)
    .bind(item.date_reminder)
    .bind(item.estimated_cost)
    .bind(&item.parts_link)
    .bind(&item.notes)
    .bind(item.is_recurring)
    .bind(item.recurrence_interval_miles)
    .bind(item.recurrence_interval_months)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    get(pool, id).await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
    let deleted = sqlx::query("DELETE FROM future_maintenance WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(Error::not_found(format!("Future maintenance {id}")));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    pub completed: FutureMaintenance,
    /// Next occurrence of a recurring item
    pub next: Option<FutureMaintenance>,
}

/// The item that follows `item` once it is done, if it recurs
///
/// Targets advance from the previous target. A recurring item without a
/// target date gets one counted from `today`. A target pushed out of range
/// is an `InvalidInput` error.
pub fn next_occurrence(
    item: &FutureMaintenance,
    today: NaiveDate,
) -> Result<Option<NewFutureMaintenance>> {
    if !item.is_recurring {
        return Ok(None);
    }
    let miles = item.recurrence_interval_miles.filter(|m| *m > 0);
    let months = item
        .recurrence_interval_months
        .filter(|m| *m > 0)
        .and_then(|m| u32::try_from(m).ok());
    if miles.is_none() && months.is_none() {
        return Ok(None);
    }

    let target_mileage = match (item.target_mileage, miles) {
        (Some(target), Some(miles)) => Some(
            target
                .checked_add(miles)
                .filter(|next| *next <= MAX_MILEAGE)
                .ok_or_else(|| Error::invalid("The next target mileage is out of range"))?,
        ),
        (target, _) => target,
    };
    let target_date = match months {
        Some(months) => Some(
            item.target_date
                .unwrap_or(today)
                .checked_add_months(Months::new(months))
                .ok_or_else(|| Error::invalid("The next target date is out of range"))?,
        ),
        None => item.target_date,
    };

    Ok(Some(NewFutureMaintenance {
        vehicle_id: item.vehicle_id,
        maintenance_type: item.maintenance_type.clone(),
        target_mileage,
        target_date,
        mileage_reminder: item.mileage_reminder,
        date_reminder: item.date_reminder,
        estimated_cost: item.estimated_cost,
        parts_link: item.parts_link.clone(),
        notes: item.notes.clone(),
        is_recurring: true,
        recurrence_interval_miles: item.recurrence_interval_miles,
        recurrence_interval_months: item.recurrence_interval_months,
    }))
}

/// Mark an item done; a recurring item is rescheduled in the same transaction
///
/// Only one of several concurrent completions of the same item succeeds;
/// the others see it already inactive and get `InvalidInput`.
pub async fn complete(pool: &SqlitePool, id: i64, today: NaiveDate) -> Result<Completion> {
    let item = get(pool, id).await?;
    if !item.is_active {
        return Err(Error::invalid("This maintenance item is already completed"));
    }
    let next = next_occurrence(&item, today)?;

    let mut tx = pool.begin().await?;
    let updated = sqlx::query(
        "UPDATE future_maintenance SET is_active = 0, updated_at = ? WHERE id = ? AND is_active = 1",
    )
    .bind(Utc::now())
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();
    if updated == 0 {
        return Err(Error::invalid("This maintenance item is already completed"));
    }

    let next_id = match next {
        Some(next) => Some(insert(&mut tx, &next).await?),
        None => None,
    };
    tx.commit().await?;

    info!(id, next = ?next_id, "Completed scheduled maintenance");

    let completed = get(pool, id).await?;
    let next = match next_id {
        Some(next_id) => Some(get(pool, next_id).await?),
        None => None,
    };
    Ok(Completion { completed, next })
}
