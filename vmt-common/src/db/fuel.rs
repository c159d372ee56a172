//! Fuel entry queries

use crate::db::models::{FuelEntry, NewFuelEntry, DRIVING_PATTERNS, FUEL_TYPES};
use crate::db::{clean_text, vehicles};
use crate::mpg::FillUp;
use crate::parse::{parse_time_hhmm, MAX_MILEAGE};
use crate::{Error, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

/// Checked and trimmed copy of the input
fn validate(input: &NewFuelEntry) -> Result<NewFuelEntry> {
    if !input.fuel_amount.is_finite() || input.fuel_amount <= 0.0 {
        return Err(Error::invalid("Fuel amount must be greater than zero"));
    }
    if !input.fuel_cost.is_finite() || input.fuel_cost < 0.0 {
        return Err(Error::invalid("Fuel cost cannot be negative"));
    }
    if !(0..=MAX_MILEAGE).contains(&input.mileage) {
        return Err(Error::invalid(format!(
            "Mileage must be between 0 and {MAX_MILEAGE}"
        )));
    }

    let time = clean_text(input.time.as_deref());
    if let Some(time) = &time {
        if parse_time_hhmm(time).is_none() {
            return Err(Error::invalid("Time must be HH:MM"));
        }
    }

    let fuel_type = clean_text(input.fuel_type.as_deref()).map(|t| t.to_lowercase());
    if let Some(fuel_type) = &fuel_type {
        if !FUEL_TYPES.contains(&fuel_type.as_str()) {
            return Err(Error::invalid(format!(
                "Fuel type must be one of: {}",
                FUEL_TYPES.join(", ")
            )));
        }
    }

    let driving_pattern = clean_text(input.driving_pattern.as_deref()).map(|p| p.to_lowercase());
    if let Some(pattern) = &driving_pattern {
        if !DRIVING_PATTERNS.contains(&pattern.as_str()) {
            return Err(Error::invalid(format!(
                "Driving pattern must be one of: {}",
                DRIVING_PATTERNS.join(", ")
            )));
        }
    }

    Ok(NewFuelEntry {
        time,
        fuel_type,
        driving_pattern,
        notes: clean_text(input.notes.as_deref()),
        ..input.clone()
    })
}

pub async fn get_entry(pool: &SqlitePool, id: i64) -> Result<FuelEntry> {
    sqlx::query_as::<_, FuelEntry>("SELECT * FROM fuel_entries WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found(format!("Fuel entry {id}")))
}

/// Newest first
pub async fn list_entries(pool: &SqlitePool, vehicle_id: Option<i64>) -> Result<Vec<FuelEntry>> {
    let entries = sqlx::query_as::<_, FuelEntry>(
        r#"
        SELECT * FROM fuel_entries
        WHERE (? IS NULL OR vehicle_id = ?)
        ORDER BY date DESC, time DESC, mileage DESC
        "#,
    )
    .bind(vehicle_id)
    .bind(vehicle_id)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Fill-ups of one vehicle in odometer order, as the MPG calculator wants them
pub async fn fill_ups(pool: &SqlitePool, vehicle_id: i64) -> Result<Vec<FillUp>> {
    let rows: Vec<(i64, f64, f64)> = sqlx::query_as(
        "SELECT mileage, fuel_amount, fuel_cost FROM fuel_entries WHERE vehicle_id = ? ORDER BY mileage",
    )
    .bind(vehicle_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(mileage, gallons, cost)| FillUp {
            mileage,
            gallons,
            cost,
        })
        .collect())
}

pub async fn create_entry(pool: &SqlitePool, input: &NewFuelEntry) -> Result<FuelEntry> {
    let entry = validate(input)?;
    vehicles::get_vehicle(pool, entry.vehicle_id).await?;

    let now = Utc::now();
    let id = sqlx::query(
        r#"
        INSERT INTO fuel_entries (
            vehicle_id, date, time, mileage, fuel_amount, fuel_cost,
            fuel_type, driving_pattern, notes, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(entry.vehicle_id)
    .bind(entry.date)
    .bind(&entry.time)
    .bind(entry.mileage)
    .bind(entry.fuel_amount)
    .bind(entry.fuel_cost)
    .bind(&entry.fuel_type)
    .bind(&entry.driving_pattern)
    .bind(&entry.notes)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?
    .last_insert_rowid();

    debug!(entry_id = id, vehicle_id = entry.vehicle_id, "Created fuel entry");
    get_entry(pool, id).await
}

pub async fn update_entry(pool: &SqlitePool, id: i64, input: &NewFuelEntry) -> Result<FuelEntry> {
    get_entry(pool, id).await?;
    let entry = validate(input)?;
    vehicles::get_vehicle(pool, entry.vehicle_id).await?;

    sqlx::query(
        r#"
        UPDATE fuel_entries SET
            vehicle_id = ?, date = ?, time = ?, mileage = ?, fuel_amount = ?, fuel_cost = ?,
            fuel_type = ?, driving_pattern = ?, notes = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(entry.vehicle_id)
    .bind(entry.date)
    .bind(&entry.time)
    .bind(entry.mileage)
    .bind(entry.fuel_amount)
    .bind(entry.fuel_cost)
    .bind(&entry.fuel_type)
    .bind(&entry.driving_pattern)
    .bind(&entry.notes)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    get_entry(pool, id).await
}

pub async fn delete_entry(pool: &SqlitePool, id: i64) -> Result<()> {
    let deleted = sqlx::query("DELETE FROM fuel_entries WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(Error::not_found(format!("Fuel entry {id}")));
    }
    Ok(())
}
