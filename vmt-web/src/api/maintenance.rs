//! Maintenance record JSON endpoints

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vmt_common::db::models::MaintenanceRecord;
use vmt_common::db::{maintenance, vehicles};
use vmt_common::reminders::{oil_change_status, OilChangeStatus};

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct VehicleFilter {
    pub vehicle_id: Option<i64>,
}

/// GET /api/maintenance?vehicle_id=
pub async fn list_records(
    State(state): State<AppState>,
    Query(filter): Query<VehicleFilter>,
) -> ApiResult<Json<Vec<MaintenanceRecord>>> {
    Ok(Json(maintenance::list_records(&state.db, filter.vehicle_id).await?))
}

/// DELETE /api/maintenance/:id
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    maintenance::delete_record(&state.db, id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Maintenance record deleted successfully",
    })))
}

#[derive(Debug, Serialize)]
pub struct OilStatusResponse {
    pub vehicle_id: i64,
    pub status: Option<OilChangeStatus>,
    /// `overdue`, `due_soon`, `good`, or `unknown` without any oil change
    pub label: &'static str,
    pub next_due_mileage: Option<i64>,
    pub next_analysis_date: Option<chrono::NaiveDate>,
}

/// GET /api/oil-status/:vehicle_id
pub async fn oil_status(
    State(state): State<AppState>,
    Path(vehicle_id): Path<i64>,
) -> ApiResult<Json<OilStatusResponse>> {
    vehicles::get_vehicle(&state.db, vehicle_id).await?;
    let current = vehicles::current_mileage(&state.db, vehicle_id).await?.unwrap_or(0);
    let status = maintenance::latest_oil_change(&state.db, vehicle_id)
        .await?
        .map(|last| oil_change_status(&last, current, state.today(), &state.config.reminders));

    let next_analysis_date = maintenance::oil_analyses(&state.db, vehicle_id)
        .await?
        .into_iter()
        .filter_map(|r| r.next_oil_analysis_date)
        .max();

    Ok(Json(OilStatusResponse {
        vehicle_id,
        label: status.as_ref().map_or("unknown", OilChangeStatus::label),
        next_due_mileage: status
            .as_ref()
            .and_then(|s| s.last_mileage.checked_add(s.interval)),
        status,
        next_analysis_date,
    }))
}

/// Build maintenance routes
pub fn maintenance_routes() -> Router<AppState> {
    Router::new()
        .route("/api/maintenance", get(list_records))
        .route("/api/maintenance/:id", delete(delete_record))
        .route("/api/oil-status/:vehicle_id", get(oil_status))
}
