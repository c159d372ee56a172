//! Maintenance record queries
//!
//! Oil changes, oil analyses and mileage updates are all stored as
//! maintenance records; flags and optional columns tell them apart.

use crate::db::models::{MaintenanceRecord, NewMaintenanceRecord, NewOilAnalysis};
use crate::db::{clean_text, vehicles};
use crate::parse::{placeholder_date, MAX_MILEAGE};
use crate::{Error, Result};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info};

pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MILEAGE_UPDATE_DESCRIPTION: &str = "Mileage Update";
pub const OIL_ANALYSIS_DESCRIPTION: &str = "Oil Analysis";

/// Normalized record fields, in column order
struct PreparedRecord {
    vehicle_id: i64,
    date: NaiveDate,
    date_estimated: bool,
    mileage: i64,
    description: String,
    input: NewMaintenanceRecord,
    tire_meta: Option<String>,
}

fn prepare(input: &NewMaintenanceRecord) -> Result<PreparedRecord> {
    let description = input.description.trim().to_string();
    if description.is_empty() {
        return Err(Error::invalid("Description is required"));
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(Error::invalid(format!(
            "Description must be {MAX_DESCRIPTION_LEN} characters or fewer"
        )));
    }
    if !(0..=MAX_MILEAGE).contains(&input.mileage) {
        return Err(Error::invalid(format!(
            "Mileage must be between 0 and {MAX_MILEAGE}"
        )));
    }
    if input
        .oil_change_interval
        .is_some_and(|interval| !(1..=MAX_MILEAGE).contains(&interval))
    {
        return Err(Error::invalid(format!(
            "Oil change interval must be between 1 and {MAX_MILEAGE} miles"
        )));
    }

    let tire_meta = match &input.tire_meta {
        Some(meta) if !meta.is_empty() => {
            meta.validate()?;
            Some(serde_json::to_string(meta).map_err(|e| Error::Internal(e.to_string()))?)
        }
        _ => None,
    };

    let (date, date_estimated) = match input.date {
        Some(date) => (date, input.date_estimated),
        None => (placeholder_date(), true),
    };

    let mut cleaned = input.clone();
    cleaned.oil_type = clean_text(input.oil_type.as_deref());
    cleaned.oil_brand = clean_text(input.oil_brand.as_deref());
    cleaned.oil_filter_brand = clean_text(input.oil_filter_brand.as_deref());
    cleaned.oil_filter_part_number = clean_text(input.oil_filter_part_number.as_deref());
    cleaned.driving_conditions = clean_text(input.driving_conditions.as_deref());
    cleaned.oil_consumption_notes = clean_text(input.oil_consumption_notes.as_deref());

    Ok(PreparedRecord {
        vehicle_id: input.vehicle_id,
        date,
        date_estimated,
        mileage: input.mileage,
        description,
        input: cleaned,
        tire_meta,
    })
}

/// Bind every stored column except `created_at`, in the order used by
/// both the INSERT and the UPDATE statements
fn bind_record<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    r: &'q PreparedRecord,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    let i = &r.input;
    query
        .bind(r.vehicle_id)
        .bind(r.date)
        .bind(r.date_estimated)
        .bind(r.mileage)
        .bind(&r.description)
        .bind(i.cost)
        .bind(i.oil_change_interval)
        .bind(i.is_oil_change)
        .bind(&i.oil_type)
        .bind(&i.oil_brand)
        .bind(&i.oil_filter_brand)
        .bind(&i.oil_filter_part_number)
        .bind(i.oil_cost)
        .bind(i.filter_cost)
        .bind(i.labor_cost)
        .bind(i.oil_analysis_date)
        .bind(i.next_oil_analysis_date)
        .bind(i.oil_analysis_cost)
        .bind(i.iron_level)
        .bind(i.aluminum_level)
        .bind(i.copper_level)
        .bind(i.viscosity)
        .bind(i.tbn)
        .bind(i.fuel_dilution)
        .bind(i.coolant_contamination)
        .bind(&i.driving_conditions)
        .bind(&i.oil_consumption_notes)
        .bind(i.linked_oil_change_id)
        .bind(&r.tire_meta)
}

/// Insert a record with any executor (pool or open transaction)
///
/// The vehicle is not checked here; callers inside a transaction have
/// already done so.
pub async fn insert_record<'e, E>(executor: E, input: &NewMaintenanceRecord) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let prepared = prepare(input)?;
    let query = sqlx::query(
        r#"
        INSERT INTO maintenance_records (
            vehicle_id, date, date_estimated, mileage, description, cost, oil_change_interval,
            is_oil_change, oil_type, oil_brand, oil_filter_brand, oil_filter_part_number,
            oil_cost, filter_cost, labor_cost,
            oil_analysis_date, next_oil_analysis_date, oil_analysis_cost,
            iron_level, aluminum_level, copper_level, viscosity, tbn, fuel_dilution,
            coolant_contamination, driving_conditions, oil_consumption_notes, linked_oil_change_id,
            tire_meta, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    );

    let id = bind_record(query, &prepared)
        .bind(Utc::now())
        .execute(executor)
        .await?
        .last_insert_rowid();

    Ok(id)
}

/// The linked oil change must be an oil change of the same vehicle
async fn check_linked_oil_change(pool: &SqlitePool, input: &NewMaintenanceRecord) -> Result<()> {
    let Some(linked_id) = input.linked_oil_change_id else {
        return Ok(());
    };
    let linked = get_record(pool, linked_id).await?;
    if linked.vehicle_id != input.vehicle_id || !linked.is_oil_change {
        return Err(Error::invalid(
            "Linked record must be an oil change for the same vehicle",
        ));
    }
    Ok(())
}

pub async fn get_record(pool: &SqlitePool, id: i64) -> Result<MaintenanceRecord> {
    sqlx::query_as::<_, MaintenanceRecord>("SELECT * FROM maintenance_records WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found(format!("Maintenance record {id}")))
}

/// Newest first; placeholder-dated records sort last
pub async fn list_records(
    pool: &SqlitePool,
    vehicle_id: Option<i64>,
) -> Result<Vec<MaintenanceRecord>> {
    let records = sqlx::query_as::<_, MaintenanceRecord>(
        r#"
        SELECT * FROM maintenance_records
        WHERE (? IS NULL OR vehicle_id = ?)
        ORDER BY date DESC, mileage DESC, id DESC
        "#,
    )
    .bind(vehicle_id)
    .bind(vehicle_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

pub async fn create_record(
    pool: &SqlitePool,
    input: &NewMaintenanceRecord,
) -> Result<MaintenanceRecord> {
    vehicles::get_vehicle(pool, input.vehicle_id).await?;
    check_linked_oil_change(pool, input).await?;

    let id = insert_record(pool, input).await?;
    debug!(record_id = id, vehicle_id = input.vehicle_id, "Created maintenance record");
    get_record(pool, id).await
}

pub async fn update_record(
    pool: &SqlitePool,
    id: i64,
    input: &NewMaintenanceRecord,
) -> Result<MaintenanceRecord> {
    get_record(pool, id).await?;
    vehicles::get_vehicle(pool, input.vehicle_id).await?;
    if input.linked_oil_change_id == Some(id) {
        return Err(Error::invalid("A record cannot be linked to itself"));
    }
    check_linked_oil_change(pool, input).await?;

    let prepared = prepare(input)?;
    let query = sqlx::query(
        r#"
        UPDATE maintenance_records SET
            vehicle_id = ?, date = ?, date_estimated = ?, mileage = ?, description = ?,
            cost = ?, oil_change_interval = ?,
            is_oil_change = ?, oil_type = ?, oil_brand = ?, oil_filter_brand = ?,
            oil_filter_part_number = ?, oil_cost = ?, filter_cost = ?, labor_cost = ?,
            oil_analysis_date = ?, next_oil_analysis_date = ?, oil_analysis_cost = ?,
            iron_level = ?, aluminum_level = ?, copper_level = ?, viscosity = ?, tbn = ?,
            fuel_dilution = ?, coolant_contamination = ?, driving_conditions = ?,
            oil_consumption_notes = ?, linked_oil_change_id = ?, tire_meta = ?
        WHERE id = ?
        "#,
    );
    bind_record(query, &prepared).bind(id).execute(pool).await?;

    get_record(pool, id).await
}

pub async fn delete_record(pool: &SqlitePool, id: i64) -> Result<()> {
    let deleted = delete_by_id(pool, id).await?;
    if !deleted {
        return Err(Error::not_found(format!("Maintenance record {id}")));
    }
    Ok(())
}

/// Delete with any executor; `false` when nothing matched
pub async fn delete_by_id<'e, E>(executor: E, id: i64) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let deleted = sqlx::query("DELETE FROM maintenance_records WHERE id = ?")
        .bind(id)
        .execute(executor)
        .await?
        .rows_affected();
    Ok(deleted > 0)
}

/// Ids of records that an imported row would duplicate
///
/// With a date the match is on date, mileage and description; without one
/// only mileage and description are compared. Descriptions compare
/// trimmed and case-insensitively.
pub async fn find_duplicates<'e, E>(
    executor: E,
    vehicle_id: i64,
    date: Option<NaiveDate>,
    mileage: i64,
    description: &str,
) -> Result<Vec<i64>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let ids: Vec<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM maintenance_records
        WHERE vehicle_id = ?
          AND (? IS NULL OR date = ?)
          AND mileage = ?
          AND LOWER(TRIM(description)) = LOWER(?)
        ORDER BY id
        "#,
    )
    .bind(vehicle_id)
    .bind(date)
    .bind(date)
    .bind(mileage)
    .bind(description.trim())
    .fetch_all(executor)
    .await?;

    Ok(ids)
}

/// Oil changes, highest mileage first
pub async fn oil_changes(
    pool: &SqlitePool,
    vehicle_id: Option<i64>,
) -> Result<Vec<MaintenanceRecord>> {
    let records = sqlx::query_as::<_, MaintenanceRecord>(
        r#"
        SELECT * FROM maintenance_records
        WHERE is_oil_change = 1 AND (? IS NULL OR vehicle_id = ?)
        ORDER BY mileage DESC, date DESC
        "#,
    )
    .bind(vehicle_id)
    .bind(vehicle_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Most recent oil change by odometer
pub async fn latest_oil_change(
    pool: &SqlitePool,
    vehicle_id: i64,
) -> Result<Option<MaintenanceRecord>> {
    let record = sqlx::query_as::<_, MaintenanceRecord>(
        r#"
        SELECT * FROM maintenance_records
        WHERE is_oil_change = 1 AND vehicle_id = ?
        ORDER BY mileage DESC, date DESC
        LIMIT 1
        "#,
    )
    .bind(vehicle_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

pub async fn oil_analyses(pool: &SqlitePool, vehicle_id: i64) -> Result<Vec<MaintenanceRecord>> {
    let records = sqlx::query_as::<_, MaintenanceRecord>(
        r#"
        SELECT * FROM maintenance_records
        WHERE vehicle_id = ? AND oil_analysis_date IS NOT NULL
        ORDER BY oil_analysis_date DESC
        "#,
    )
    .bind(vehicle_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Store lab results as their own record, linked to the sampled oil change
pub async fn create_oil_analysis(
    pool: &SqlitePool,
    input: &NewOilAnalysis,
) -> Result<MaintenanceRecord> {
    let mileage = match (input.mileage, input.linked_oil_change_id) {
        (Some(mileage), _) => mileage,
        (None, Some(linked_id)) => get_record(pool, linked_id).await?.mileage,
        (None, None) => vehicles::current_mileage(pool, input.vehicle_id)
            .await?
            .unwrap_or(0),
    };

    let record = NewMaintenanceRecord {
        vehicle_id: input.vehicle_id,
        date: Some(input.analysis_date),
        mileage,
        description: OIL_ANALYSIS_DESCRIPTION.to_string(),
        oil_analysis_date: Some(input.analysis_date),
        next_oil_analysis_date: input.next_analysis_date,
        oil_analysis_cost: input.cost,
        iron_level: input.iron_level,
        aluminum_level: input.aluminum_level,
        copper_level: input.copper_level,
        viscosity: input.viscosity,
        tbn: input.tbn,
        fuel_dilution: input.fuel_dilution,
        coolant_contamination: input.coolant_contamination,
        driving_conditions: input.driving_conditions.clone(),
        oil_consumption_notes: input.oil_consumption_notes.clone(),
        linked_oil_change_id: input.linked_oil_change_id,
        ..Default::default()
    };

    create_record(pool, &record).await
}

#[derive(Debug, Clone, Serialize)]
pub struct MileageUpdate {
    pub record_id: i64,
    pub previous_mileage: Option<i64>,
    pub new_mileage: i64,
    /// The new reading is below the highest known one
    pub is_lower: bool,
}

/// Record an odometer reading without any service performed
pub async fn record_mileage_update(
    pool: &SqlitePool,
    vehicle_id: i64,
    new_mileage: i64,
    date: NaiveDate,
) -> Result<MileageUpdate> {
    vehicles::get_vehicle(pool, vehicle_id).await?;
    let previous_mileage = vehicles::current_mileage(pool, vehicle_id).await?;

    let record = NewMaintenanceRecord {
        vehicle_id,
        date: Some(date),
        mileage: new_mileage,
        description: MILEAGE_UPDATE_DESCRIPTION.to_string(),
        ..Default::default()
    };
    let record_id = insert_record(pool, &record).await?;
    let is_lower = previous_mileage.is_some_and(|prev| new_mileage < prev);

    info!(
        vehicle_id,
        new_mileage,
        previous = ?previous_mileage,
        is_lower,
        "Recorded mileage update"
    );

    Ok(MileageUpdate {
        record_id,
        previous_mileage,
        new_mileage,
        is_lower,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct MaintenanceSummary {
    pub total_vehicles: i64,
    pub total_records: i64,
    pub total_cost: f64,
    pub average_cost_per_record: f64,
}

pub async fn summary(pool: &SqlitePool) -> Result<MaintenanceSummary> {
    let total_vehicles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vehicles")
        .fetch_one(pool)
        .await?;
    let (total_records, total_cost): (i64, f64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(cost), 0.0) FROM maintenance_records",
    )
    .fetch_one(pool)
    .await?;

    let average_cost_per_record = if total_records > 0 {
        crate::parse::round_cents(total_cost / total_records as f64)
    } else {
        0.0
    };

    Ok(MaintenanceSummary {
        total_vehicles,
        total_records,
        total_cost: crate::parse::round_cents(total_cost),
        average_cost_per_record,
    })
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecentActivity {
    pub id: i64,
    pub vehicle_id: i64,
    pub vehicle_name: String,
    pub date: NaiveDate,
    pub mileage: i64,
    pub description: String,
    pub cost: Option<f64>,
}

/// Records dated on or after `since`, newest first
pub async fn recent_activity(
    pool: &SqlitePool,
    since: NaiveDate,
    limit: i64,
) -> Result<Vec<RecentActivity>> {
    let rows = sqlx::query_as::<_, RecentActivity>(
        r#"
        SELECT m.id, m.vehicle_id, v.name AS vehicle_name, m.date, m.mileage, m.description, m.cost
        FROM maintenance_records m
        JOIN vehicles v ON v.id = m.vehicle_id
        WHERE m.date >= ?
        ORDER BY m.date DESC, m.mileage DESC
        LIMIT ?
        "#,
    )
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Sum over vehicles of the odometer span covered by readings in `[start, end]`
pub async fn miles_driven_between(
    pool: &SqlitePool,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<i64> {
    let miles: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(span), 0) FROM (
            SELECT MAX(mileage) - MIN(mileage) AS span
            FROM (
                SELECT vehicle_id, mileage, date FROM maintenance_records
                UNION ALL
                SELECT vehicle_id, mileage, date FROM fuel_entries
            )
            WHERE date >= ? AND date <= ? AND mileage > 0
            GROUP BY vehicle_id
        )
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;

    Ok(miles)
}
