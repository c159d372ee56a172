//! Notification feed and reminder email endpoints

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use vmt_common::db::models::EmailSubscription;
use vmt_common::db::subscriptions;
use vmt_common::notify::{compose_test_email, dispatch_reminders, DispatchReport};
use vmt_common::reminders::{self, NotificationFeed};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /api/notifications
pub async fn list_notifications(State(state): State<AppState>) -> ApiResult<Json<NotificationFeed>> {
    let feed = reminders::notifications(&state.db, state.today(), &state.config.reminders).await?;
    Ok(Json(feed))
}

/// POST /api/notifications/dispatch
///
/// Runs one reminder pass immediately, the same pass vmt-notify runs on
/// its interval.
pub async fn dispatch(State(state): State<AppState>) -> ApiResult<Json<DispatchReport>> {
    let report = dispatch_reminders(
        &state.db,
        state.mailer.as_ref(),
        state.today(),
        &state.config.reminders,
        &state.config.mail,
    )
    .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct TestEmailRequest {
    pub email: String,
}

/// POST /api/notifications/test
pub async fn send_test_email(
    State(state): State<AppState>,
    Json(request): Json<TestEmailRequest>,
) -> ApiResult<Json<Value>> {
    let address = request.email.trim();
    if !subscriptions::is_valid_email(address) {
        return Err(ApiError::BadRequest(format!("Invalid email address: {address}")));
    }

    let email = compose_test_email(address, &state.config.mail);
    state.mailer.send(&email).await?;
    info!(to = %address, transport = state.mailer.name(), "Test email sent");

    Ok(Json(json!({
        "success": true,
        "message": format!("Test email sent to {address}"),
        "transport": state.mailer.name(),
    })))
}

/// GET /api/email-subscriptions
pub async fn list_subscriptions(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<EmailSubscription>>> {
    Ok(Json(subscriptions::list(&state.db).await?))
}

/// Build notification routes
pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/dispatch", post(dispatch))
        .route("/api/notifications/test", post(send_test_email))
        .route("/api/email-subscriptions", get(list_subscriptions))
}
