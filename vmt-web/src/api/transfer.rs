//! CSV import and export endpoints

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::Deserialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::forms::int_field;
use crate::services::{
    export_fuel, export_maintenance, export_vehicles, import_csv, parse_id_list, DuplicatePolicy,
    ImportReport,
};
use crate::AppState;

/// Largest accepted upload
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Fields of the import form
#[derive(Debug, Default)]
pub struct ImportUpload {
    pub file_name: Option<String>,
    pub file: Option<Vec<u8>>,
    pub vehicle_id: Option<String>,
    pub handle_duplicates: Option<String>,
}

impl ImportUpload {
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut upload = ImportUpload::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    upload.file_name = field.file_name().map(str::to_string);
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                    upload.file = Some(bytes.to_vec());
                }
                "vehicle_id" | "handle_duplicates" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                    let text = Some(text.trim().to_string()).filter(|t| !t.is_empty());
                    if name == "vehicle_id" {
                        upload.vehicle_id = text;
                    } else {
                        upload.handle_duplicates = text;
                    }
                }
                _ => {}
            }
        }
        Ok(upload)
    }
}

/// Validate the upload and import it
pub async fn run_import(state: &AppState, upload: ImportUpload) -> ApiResult<ImportReport> {
    let vehicle_id = int_field(upload.vehicle_id.as_deref(), "Vehicle")?
        .ok_or_else(|| ApiError::BadRequest("Please select a vehicle".to_string()))?;

    let policy = match upload.handle_duplicates.as_deref() {
        None => DuplicatePolicy::default(),
        Some(raw) => DuplicatePolicy::parse(raw).ok_or_else(|| {
            ApiError::BadRequest(format!("Unknown duplicate handling option: {raw}"))
        })?,
    };

    let bytes = upload
        .file
        .filter(|b| !b.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No file uploaded".to_string()))?;
    if let Some(name) = upload.file_name.as_deref() {
        if !name.to_ascii_lowercase().ends_with(".csv") {
            return Err(ApiError::BadRequest("Please upload a .csv file".to_string()));
        }
    }

    info!(vehicle_id, bytes = bytes.len(), ?policy, "Importing CSV upload");
    Ok(import_csv(&state.db, vehicle_id, &bytes, policy).await?)
}

/// POST /api/import (multipart: file, vehicle_id, handle_duplicates)
pub async fn import(State(state): State<AppState>, multipart: Multipart) -> ApiResult<Json<ImportReport>> {
    let upload = ImportUpload::read(multipart).await?;
    Ok(Json(run_import(&state, upload).await?))
}

fn csv_attachment(prefix: &str, body: String) -> Response {
    let file_name = format!("{prefix}_{}.csv", Local::now().format("%Y%m%d"));
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct VehicleIdsQuery {
    pub vehicle_ids: Option<String>,
}

/// GET /api/export/vehicles?vehicle_ids=1,2
pub async fn export_vehicles_csv(
    State(state): State<AppState>,
    Query(query): Query<VehicleIdsQuery>,
) -> ApiResult<Response> {
    let ids = query
        .vehicle_ids
        .as_deref()
        .map(parse_id_list)
        .transpose()?
        .filter(|ids| !ids.is_empty());
    let body = export_vehicles(&state.db, ids.as_deref()).await?;
    Ok(csv_attachment("vehicles", body))
}

#[derive(Debug, Deserialize)]
pub struct VehicleIdQuery {
    pub vehicle_id: Option<i64>,
}

/// GET /api/export/maintenance?vehicle_id=
pub async fn export_maintenance_csv(
    State(state): State<AppState>,
    Query(query): Query<VehicleIdQuery>,
) -> ApiResult<Response> {
    let body = export_maintenance(&state.db, query.vehicle_id).await?;
    Ok(csv_attachment("maintenance_records", body))
}

/// GET /api/export/fuel?vehicle_id=
pub async fn export_fuel_csv(
    State(state): State<AppState>,
    Query(query): Query<VehicleIdQuery>,
) -> ApiResult<Response> {
    let body = export_fuel(&state.db, query.vehicle_id).await?;
    Ok(csv_attachment("fuel_entries", body))
}

/// Build import/export routes
pub fn transfer_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/import",
            post(import).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/export/vehicles", get(export_vehicles_csv))
        .route("/api/export/maintenance", get(export_maintenance_csv))
        .route("/api/export/fuel", get(export_fuel_csv))
}
