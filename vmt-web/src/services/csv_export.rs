//! CSV export of vehicles, maintenance records and fill-ups

use csv::Writer;
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::debug;
use vmt_common::db::{fuel, maintenance, vehicles};
use vmt_common::parse::is_placeholder_date;
use vmt_common::{Error, Result};

#[derive(Serialize)]
struct VehicleRow<'a> {
    id: i64,
    name: &'a str,
    year: i64,
    make: &'a str,
    model: &'a str,
    vin: Option<&'a str>,
}

#[derive(Serialize)]
struct MaintenanceRow<'a> {
    id: i64,
    vehicle_name: &'a str,
    /// Blank for the placeholder date
    date: String,
    mileage: i64,
    description: &'a str,
    cost: Option<String>,
    oil_change_interval: Option<i64>,
    is_oil_change: bool,
    oil_type: Option<&'a str>,
    oil_brand: Option<&'a str>,
    oil_filter_brand: Option<&'a str>,
    oil_filter_part_number: Option<&'a str>,
    oil_cost: Option<String>,
    filter_cost: Option<String>,
    labor_cost: Option<String>,
}

#[derive(Serialize)]
struct FuelRow<'a> {
    id: i64,
    vehicle_name: &'a str,
    date: String,
    time: Option<&'a str>,
    mileage: i64,
    fuel_amount: f64,
    fuel_cost: String,
    price_per_gallon: Option<String>,
    fuel_type: Option<&'a str>,
    driving_pattern: Option<&'a str>,
    notes: Option<&'a str>,
}

fn money(value: Option<f64>) -> Option<String> {
    value.map(|v| format!("{v:.2}"))
}

fn finish(writer: Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Internal(format!("Failed to finish CSV: {e}")))?;
    String::from_utf8(bytes).map_err(|e| Error::Internal(e.to_string()))
}

/// Parse `"1, 2,3"` into ids; blank entries are ignored
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| Error::invalid(format!("Invalid vehicle id: {s}")))
        })
        .collect()
}

async fn vehicle_name_map(pool: &SqlitePool) -> Result<HashMap<i64, String>> {
    Ok(vehicles::vehicle_names(pool)
        .await?
        .into_iter()
        .map(|v| (v.id, v.name))
        .collect())
}

/// All vehicles, or only those in `ids`
pub async fn export_vehicles(pool: &SqlitePool, ids: Option<&[i64]>) -> Result<String> {
    let mut writer = Writer::from_writer(Vec::new());
    let all = vehicles::list_vehicles(pool, None).await?;

    let mut count = 0;
    for vehicle in all
        .iter()
        .filter(|v| ids.map_or(true, |ids| ids.contains(&v.id)))
    {
        writer.serialize(VehicleRow {
            id: vehicle.id,
            name: &vehicle.name,
            year: vehicle.year,
            make: &vehicle.make,
            model: &vehicle.model,
            vin: vehicle.vin.as_deref(),
        })?;
        count += 1;
    }
    if count == 0 {
        writer.write_record(["id", "name", "year", "make", "model", "vin"])?;
    }

    debug!(rows = count, "Exported vehicles");
    finish(writer)
}

pub async fn export_maintenance(pool: &SqlitePool, vehicle_id: Option<i64>) -> Result<String> {
    let names = vehicle_name_map(pool).await?;
    let records = maintenance::list_records(pool, vehicle_id).await?;
    let mut writer = Writer::from_writer(Vec::new());

    for record in &records {
        writer.serialize(MaintenanceRow {
            id: record.id,
            vehicle_name: names.get(&record.vehicle_id).map_or("", String::as_str),
            date: if is_placeholder_date(record.date) {
                String::new()
            } else {
                record.date.format("%Y-%m-%d").to_string()
            },
            mileage: record.mileage,
            description: &record.description,
            cost: money(record.cost),
            oil_change_interval: record.oil_change_interval,
            is_oil_change: record.is_oil_change,
            oil_type: record.oil_type.as_deref(),
            oil_brand: record.oil_brand.as_deref(),
            oil_filter_brand: record.oil_filter_brand.as_deref(),
            oil_filter_part_number: record.oil_filter_part_number.as_deref(),
            oil_cost: money(record.oil_cost),
            filter_cost: money(record.filter_cost),
            labor_cost: money(record.labor_cost),
        })?;
    }
    if records.is_empty() {
        writer.write_record([
            "id",
            "vehicle_name",
            "date",
            "mileage",
            "description",
            "cost",
            "oil_change_interval",
            "is_oil_change",
            "oil_type",
            "oil_brand",
            "oil_filter_brand",
            "oil_filter_part_number",
            "oil_cost",
            "filter_cost",
            "labor_cost",
        ])?;
    }

    debug!(rows = records.len(), ?vehicle_id, "Exported maintenance records");
    finish(writer)
}

pub async fn export_fuel(pool: &SqlitePool, vehicle_id: Option<i64>) -> Result<String> {
    let names = vehicle_name_map(pool).await?;
    let entries = fuel::list_entries(pool, vehicle_id).await?;
    let mut writer = Writer::from_writer(Vec::new());

    for entry in &entries {
        writer.serialize(FuelRow {
            id: entry.id,
            vehicle_name: names.get(&entry.vehicle_id).map_or("", String::as_str),
            date: entry.date.format("%Y-%m-%d").to_string(),
            time: entry.time.as_deref(),
            mileage: entry.mileage,
            fuel_amount: entry.fuel_amount,
            fuel_cost: format!("{:.2}", entry.fuel_cost),
            price_per_gallon: money(entry.price_per_gallon()),
            fuel_type: entry.fuel_type.as_deref(),
            driving_pattern: entry.driving_pattern.as_deref(),
            notes: entry.notes.as_deref(),
        })?;
    }
    if entries.is_empty() {
        writer.write_record([
            "id",
            "vehicle_name",
            "date",
            "time",
            "mileage",
            "fuel_amount",
            "fuel_cost",
            "price_per_gallon",
            "fuel_type",
            "driving_pattern",
            "notes",
        ])?;
    }

    debug!(rows = entries.len(), ?vehicle_id, "Exported fuel entries");
    finish(writer)
}
