//! Vehicle JSON endpoints
//!
//! DELETE /api/vehicles/:id, GET /api/vehicles, GET /api/vehicles/names,
//! POST /vehicles/:id/update-mileage

use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vmt_common::db::models::{Vehicle, VehicleName};
use vmt_common::db::{maintenance, vehicles};

use crate::error::ApiResult;
use crate::forms::{blank_as_none, date_field, int_field, required};
use crate::AppState;

/// Vehicle with its latest known odometer reading
#[derive(Debug, Serialize)]
pub struct VehicleWithMileage {
    #[serde(flatten)]
    pub vehicle: Vehicle,
    pub current_mileage: Option<i64>,
}

/// GET /api/vehicles
pub async fn list_vehicles(State(state): State<AppState>) -> ApiResult<Json<Vec<VehicleWithMileage>>> {
    let mut out = Vec::new();
    for vehicle in vehicles::list_vehicles(&state.db, None).await? {
        let current_mileage = vehicles::current_mileage(&state.db, vehicle.id).await?;
        out.push(VehicleWithMileage {
            vehicle,
            current_mileage,
        });
    }
    Ok(Json(out))
}

/// GET /api/vehicles/names
pub async fn vehicle_names(State(state): State<AppState>) -> ApiResult<Json<Vec<VehicleName>>> {
    Ok(Json(vehicles::vehicle_names(&state.db).await?))
}

/// DELETE /api/vehicles/:id
///
/// Removes the vehicle together with all of its records.
pub async fn delete_vehicle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Value>> {
    vehicles::delete_vehicle(&state.db, id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Vehicle deleted successfully",
    })))
}

#[derive(Debug, Deserialize)]
pub struct MileageUpdateForm {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub new_mileage: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub date_str: Option<String>,
}

/// POST /vehicles/:id/update-mileage
///
/// Form post answered with JSON; a reading lower than the highest known
/// one is stored but flagged with `is_lower`.
pub async fn update_mileage(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<MileageUpdateForm>,
) -> ApiResult<Json<Value>> {
    let new_mileage = required(int_field(form.new_mileage.as_deref(), "Mileage")?, "Mileage")?;
    if new_mileage < 0 {
        return Err(vmt_common::Error::invalid("Mileage cannot be negative").into());
    }
    let date = date_field(form.date_str.as_deref())?.unwrap_or_else(|| state.today());

    let update = maintenance::record_mileage_update(&state.db, id, new_mileage, date).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Mileage updated successfully",
        "new_mileage": update.new_mileage,
        "previous_mileage": update.previous_mileage,
        "is_lower": update.is_lower,
        "record_id": update.record_id,
    })))
}

/// Build vehicle routes
pub fn vehicle_routes() -> Router<AppState> {
    Router::new()
        .route("/api/vehicles", get(list_vehicles))
        .route("/api/vehicles/names", get(vehicle_names))
        .route("/api/vehicles/:id", delete(delete_vehicle))
        .route("/vehicles/:id/update-mileage", post(update_mileage))
}
