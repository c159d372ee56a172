//! Fuel entry and fuel economy endpoints

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use vmt_common::db::models::{FuelEntry, NewFuelEntry};
use vmt_common::db::{fuel, vehicles};
use vmt_common::mpg::{self, MpgSummary};
use vmt_common::parse::normalize_form_date;
use vmt_common::Error;

use crate::api::maintenance::VehicleFilter;
use crate::error::ApiResult;
use crate::AppState;

/// Fill-up as submitted by the fuel page; the date may be `MM/DD/YYYY`
#[derive(Debug, Deserialize)]
pub struct FuelEntryRequest {
    pub vehicle_id: i64,
    pub date: String,
    #[serde(default)]
    pub time: Option<String>,
    pub mileage: i64,
    pub fuel_amount: f64,
    pub fuel_cost: f64,
    #[serde(default)]
    pub fuel_type: Option<String>,
    #[serde(default)]
    pub driving_pattern: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl FuelEntryRequest {
    pub fn into_input(self) -> vmt_common::Result<NewFuelEntry> {
        let date = normalize_form_date(&self.date)?
            .ok_or_else(|| Error::invalid("Date is required"))?;
        Ok(NewFuelEntry {
            vehicle_id: self.vehicle_id,
            date,
            time: self.time,
            mileage: self.mileage,
            fuel_amount: self.fuel_amount,
            fuel_cost: self.fuel_cost,
            fuel_type: self.fuel_type,
            driving_pattern: self.driving_pattern,
            notes: self.notes,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct FuelEntryView {
    #[serde(flatten)]
    pub entry: FuelEntry,
    pub vehicle_name: String,
    pub price_per_gallon: Option<f64>,
}

/// GET /api/fuel/entries?vehicle_id=
pub async fn list_entries(
    State(state): State<AppState>,
    Query(filter): Query<VehicleFilter>,
) -> ApiResult<Json<Value>> {
    let names: HashMap<i64, String> = vehicles::vehicle_names(&state.db)
        .await?
        .into_iter()
        .map(|v| (v.id, v.name))
        .collect();

    let entries: Vec<FuelEntryView> = fuel::list_entries(&state.db, filter.vehicle_id)
        .await?
        .into_iter()
        .map(|entry| FuelEntryView {
            vehicle_name: names.get(&entry.vehicle_id).cloned().unwrap_or_default(),
            price_per_gallon: entry.price_per_gallon(),
            entry,
        })
        .collect();

    Ok(Json(json!({
        "success": true,
        "entries": entries,
    })))
}

/// POST /api/fuel/entry
pub async fn create_entry(
    State(state): State<AppState>,
    Json(request): Json<FuelEntryRequest>,
) -> ApiResult<Json<Value>> {
    let entry = fuel::create_entry(&state.db, &request.into_input()?).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Fuel entry added successfully",
        "entry": entry,
    })))
}

/// PUT /api/fuel/:id
pub async fn update_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<FuelEntryRequest>,
) -> ApiResult<Json<Value>> {
    let entry = fuel::update_entry(&state.db, id, &request.into_input()?).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Fuel entry updated successfully",
        "entry": entry,
    })))
}

/// DELETE /api/fuel/:id
pub async fn delete_entry(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let entry = fuel::get_entry(&state.db, id).await?;
    fuel::delete_entry(&state.db, id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Fuel entry deleted successfully",
        "vehicle_id": entry.vehicle_id,
    })))
}

#[derive(Debug, Serialize)]
pub struct VehicleMpg {
    pub vehicle_id: i64,
    pub vehicle_name: String,
    /// Lifetime economy, the headline number
    pub mpg: Option<f64>,
    #[serde(flatten)]
    pub details: MpgSummary,
}

/// GET /api/fuel/mpg-summary?vehicle_id=
pub async fn mpg_summary(
    State(state): State<AppState>,
    Query(filter): Query<VehicleFilter>,
) -> ApiResult<Json<Value>> {
    let options = state.config.reminders.mpg_options();
    let mut summary = Vec::new();

    for vehicle in vehicles::list_vehicles(&state.db, None).await? {
        if filter.vehicle_id.is_some_and(|id| id != vehicle.id) {
            continue;
        }
        let fill_ups = fuel::fill_ups(&state.db, vehicle.id).await?;
        let details = mpg::calculate(&fill_ups, &options);
        summary.push(VehicleMpg {
            vehicle_id: vehicle.id,
            vehicle_name: vehicle.name,
            mpg: details.lifetime.as_ref().map(|w| w.mpg),
            details,
        });
    }

    Ok(Json(json!({
        "success": true,
        "summary": summary,
    })))
}

/// Build fuel routes
pub fn fuel_routes() -> Router<AppState> {
    Router::new()
        .route("/api/fuel/entries", get(list_entries))
        .route("/api/fuel/entry", post(create_entry))
        .route("/api/fuel/mpg-summary", get(mpg_summary))
        .route("/api/fuel/:id", put(update_entry).delete(delete_entry))
}
