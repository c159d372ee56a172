//! Dashboard summary endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::error::ApiResult;
use crate::services::{dashboard, Dashboard};
use crate::AppState;

/// GET /api/summary
pub async fn get_summary(State(state): State<AppState>) -> ApiResult<Json<Dashboard>> {
    let data = dashboard::gather(&state.db, state.today(), &state.config.reminders).await?;
    Ok(Json(data))
}

/// Build summary routes
pub fn summary_routes() -> Router<AppState> {
    Router::new().route("/api/summary", get(get_summary))
}
