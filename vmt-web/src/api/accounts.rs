//! Account endpoints for the configured owner

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use vmt_common::db::accounts;
use vmt_common::db::models::Account;

use crate::error::ApiResult;
use crate::AppState;

/// GET /api/accounts
pub async fn list_accounts(State(state): State<AppState>) -> ApiResult<Json<Vec<Account>>> {
    Ok(Json(accounts::list_accounts(&state.db, state.owner()).await?))
}

#[derive(Debug, Deserialize)]
pub struct NewAccountRequest {
    pub name: String,
}

/// POST /api/accounts
pub async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<NewAccountRequest>,
) -> ApiResult<Json<Value>> {
    let account = accounts::create_account(&state.db, state.owner(), &request.name).await?;
    Ok(Json(json!({
        "success": true,
        "account": account,
    })))
}

/// POST /api/accounts/:id/default
pub async fn set_default(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let account = accounts::set_default_account(&state.db, state.owner(), &id).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("{} is now the default account", account.name),
        "account": account,
    })))
}

/// Build account routes
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/api/accounts", get(list_accounts).post(create_account))
        .route("/api/accounts/:id/default", post(set_default))
}
