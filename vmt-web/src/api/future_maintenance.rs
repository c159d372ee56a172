//! Planned (future) maintenance endpoints

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use vmt_common::db::future;
use vmt_common::db::models::{FutureMaintenance, NewFutureMaintenance};
use vmt_common::db::vehicles;
use vmt_common::reminders::{evaluate_future, TriggeredMaintenance};

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ActiveFilter {
    #[serde(default)]
    pub include_inactive: bool,
}

/// GET /api/future-maintenance
///
/// Every active item across all vehicles, evaluated against today's
/// odometer and date.
pub async fn list_active(State(state): State<AppState>) -> ApiResult<Json<Vec<TriggeredMaintenance>>> {
    let today = state.today();
    let mut out = Vec::new();
    for item in future::list_active(&state.db).await? {
        let mileage = vehicles::current_mileage(&state.db, item.vehicle_id).await?;
        out.push(evaluate_future(&item, mileage, today));
    }
    Ok(Json(out))
}

/// GET /api/future-maintenance/vehicle/:vehicle_id
pub async fn list_for_vehicle(
    State(state): State<AppState>,
    Path(vehicle_id): Path<i64>,
    Query(filter): Query<ActiveFilter>,
) -> ApiResult<Json<Vec<FutureMaintenance>>> {
    vehicles::get_vehicle(&state.db, vehicle_id).await?;
    let items = future::list_for_vehicle(&state.db, vehicle_id, !filter.include_inactive).await?;
    Ok(Json(items))
}

/// GET /api/future-maintenance/single/:id
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<FutureMaintenance>> {
    Ok(Json(future::get(&state.db, id).await?))
}

/// POST /api/future-maintenance
pub async fn create_item(
    State(state): State<AppState>,
    Json(input): Json<NewFutureMaintenance>,
) -> ApiResult<Json<Value>> {
    let item = future::create(&state.db, &input).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Future maintenance item created successfully",
        "id": item.id,
        "item": item,
    })))
}

/// PUT /api/future-maintenance/:id
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<NewFutureMaintenance>,
) -> ApiResult<Json<Value>> {
    let item = future::update(&state.db, id, &input).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Future maintenance item updated successfully",
        "item": item,
    })))
}

/// DELETE /api/future-maintenance/:id
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    future::delete(&state.db, id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Future maintenance item deleted successfully",
    })))
}

/// POST /api/future-maintenance/:id/complete
///
/// Deactivates the item; a recurring one is rescheduled.
pub async fn complete_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    let completion = future::complete(&state.db, id, state.today()).await?;
    let message = match &completion.next {
        Some(_) => "Maintenance completed and next occurrence scheduled",
        None => "Maintenance marked as completed",
    };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "completed": completion.completed,
        "next": completion.next,
    })))
}

/// Build future maintenance routes
pub fn future_maintenance_routes() -> Router<AppState> {
    Router::new()
        .route("/api/future-maintenance", get(list_active).post(create_item))
        .route("/api/future-maintenance/vehicle/:vehicle_id", get(list_for_vehicle))
        .route("/api/future-maintenance/single/:id", get(get_item))
        .route("/api/future-maintenance/:id", put(update_item).delete(delete_item))
        .route("/api/future-maintenance/:id/complete", post(complete_item))
}
