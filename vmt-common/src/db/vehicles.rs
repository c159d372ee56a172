//! Vehicle queries

use crate::db::models::{NewVehicle, Vehicle, VehicleName};
use crate::db::{clean_text, unique_violation};
use crate::{Error, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_VIN_LEN: usize = 17;
pub const MIN_YEAR: i64 = 1900;
pub const MAX_YEAR: i64 = 2100;

const DUPLICATE_NAME: &str = "A vehicle with this name already exists";
const DUPLICATE_VIN: &str = "A vehicle with this VIN already exists";

/// Validated vehicle fields ready for storage
struct VehicleFields {
    name: String,
    year: i64,
    make: String,
    model: String,
    vin: Option<String>,
}

fn validate(input: &NewVehicle) -> Result<VehicleFields> {
    let make = input.make.trim().to_string();
    let model = input.model.trim().to_string();
    if make.is_empty() || model.is_empty() {
        return Err(Error::invalid("Make and model are required"));
    }
    if !(MIN_YEAR..=MAX_YEAR).contains(&input.year) {
        return Err(Error::invalid(format!(
            "Year must be between {MIN_YEAR} and {MAX_YEAR}"
        )));
    }

    let name = clean_text(input.name.as_deref())
        .unwrap_or_else(|| format!("{} {} {}", input.year, make, model));
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::invalid(format!(
            "Vehicle name must be {MAX_NAME_LEN} characters or fewer"
        )));
    }

    let vin = clean_text(input.vin.as_deref()).map(|v| v.to_uppercase());
    if let Some(vin) = &vin {
        if vin.len() > MAX_VIN_LEN || !vin.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::invalid(format!(
                "VIN must be at most {MAX_VIN_LEN} letters and digits"
            )));
        }
    }

    Ok(VehicleFields {
        name,
        year: input.year,
        make,
        model,
        vin,
    })
}

/// Reject a name or VIN already used by a vehicle other than `exclude_id`
async fn check_unique(pool: &SqlitePool, fields: &VehicleFields, exclude_id: i64) -> Result<()> {
    let name_taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM vehicles WHERE name = ? AND id != ?)",
    )
    .bind(&fields.name)
    .bind(exclude_id)
    .fetch_one(pool)
    .await?;
    if name_taken {
        return Err(Error::Conflict(DUPLICATE_NAME.to_string()));
    }

    if let Some(vin) = &fields.vin {
        let vin_taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM vehicles WHERE vin = ? AND id != ?)",
        )
        .bind(vin)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;
        if vin_taken {
            return Err(Error::Conflict(DUPLICATE_VIN.to_string()));
        }
    }
    Ok(())
}

fn map_unique(err: sqlx::Error) -> Error {
    let is_vin = err.to_string().contains("vehicles.vin");
    unique_violation(err, if is_vin { DUPLICATE_VIN } else { DUPLICATE_NAME })
}

/// All vehicles ordered by name, optionally restricted to one account
pub async fn list_vehicles(pool: &SqlitePool, account_id: Option<&str>) -> Result<Vec<Vehicle>> {
    let vehicles = match account_id {
        Some(account_id) => {
            sqlx::query_as::<_, Vehicle>(
                "SELECT * FROM vehicles WHERE account_id = ? ORDER BY name COLLATE NOCASE",
            )
            .bind(account_id)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles ORDER BY name COLLATE NOCASE")
                .fetch_all(pool)
                .await?
        }
    };
    Ok(vehicles)
}

pub async fn get_vehicle(pool: &SqlitePool, id: i64) -> Result<Vehicle> {
    sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found(format!("Vehicle {id}")))
}

/// Id and name of every vehicle, for selectors and filters
pub async fn vehicle_names(pool: &SqlitePool) -> Result<Vec<VehicleName>> {
    let names = sqlx::query_as::<_, VehicleName>(
        "SELECT id, name FROM vehicles ORDER BY name COLLATE NOCASE",
    )
    .fetch_all(pool)
    .await?;
    Ok(names)
}

pub async fn create_vehicle(pool: &SqlitePool, input: &NewVehicle) -> Result<Vehicle> {
    let fields = validate(input)?;
    check_unique(pool, &fields, 0).await?;

    let account_id = match clean_text(input.account_id.as_deref()) {
        Some(id) => Some(id),
        None => {
            sqlx::query_scalar::<_, String>(
                "SELECT id FROM accounts WHERE is_default = 1 ORDER BY created_at LIMIT 1",
            )
            .fetch_optional(pool)
            .await?
        }
    };

    let id = sqlx::query(
        r#"
        INSERT INTO vehicles (account_id, name, year, make, model, vin, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&account_id)
    .bind(&fields.name)
    .bind(fields.year)
    .bind(&fields.make)
    .bind(&fields.model)
    .bind(&fields.vin)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(map_unique)?
    .last_insert_rowid();

    info!(vehicle_id = id, name = %fields.name, "Created vehicle");
    get_vehicle(pool, id).await
}

pub async fn update_vehicle(pool: &SqlitePool, id: i64, input: &NewVehicle) -> Result<Vehicle> {
    let existing = get_vehicle(pool, id).await?;
    let fields = validate(input)?;
    check_unique(pool, &fields, id).await?;

    let account_id = clean_text(input.account_id.as_deref()).or(existing.account_id);

    sqlx::query(
        r#"
        UPDATE vehicles
        SET account_id = ?, name = ?, year = ?, make = ?, model = ?, vin = ?
        WHERE id = ?
        "#,
    )
    .bind(&account_id)
    .bind(&fields.name)
    .bind(fields.year)
    .bind(&fields.make)
    .bind(&fields.model)
    .bind(&fields.vin)
    .bind(id)
    .execute(pool)
    .await
    .map_err(map_unique)?;

    get_vehicle(pool, id).await
}

/// Delete a vehicle together with its records, fill-ups, plans and subscriptions
pub async fn delete_vehicle(pool: &SqlitePool, id: i64) -> Result<()> {
    let deleted = sqlx::query("DELETE FROM vehicles WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(Error::not_found(format!("Vehicle {id}")));
    }
    info!(vehicle_id = id, "Deleted vehicle");
    Ok(())
}

/// Highest odometer reading known from maintenance records or fill-ups
pub async fn current_mileage(pool: &SqlitePool, vehicle_id: i64) -> Result<Option<i64>> {
    let mileage: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT MAX(m) FROM (
            SELECT MAX(mileage) AS m FROM maintenance_records WHERE vehicle_id = ?
            UNION ALL
            SELECT MAX(mileage) AS m FROM fuel_entries WHERE vehicle_id = ?
        )
        "#,
    )
    .bind(vehicle_id)
    .bind(vehicle_id)
    .fetch_one(pool)
    .await?;

    Ok(mileage)
}
