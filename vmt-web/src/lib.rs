//! vmt-web library - vehicle maintenance tracker web server
//!
//! Server-rendered HTML pages for day-to-day use plus a JSON API used by
//! the page scripts, CSV import/export and the health check.

use axum::Router;
use chrono::{Local, NaiveDate};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use vmt_common::config::TomlConfig;
use vmt_common::notify::Mailer;

pub mod api;
pub mod error;
pub mod forms;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<TomlConfig>,
    /// Transport for reminder and test emails
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: TomlConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            mailer,
        }
    }

    /// Owner id used for account scoping
    pub fn owner(&self) -> &str {
        &self.config.owner
    }

    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // HTML pages and form posts
        .merge(api::ui_routes())
        // JSON API
        .merge(api::vehicle_routes())
        .merge(api::maintenance_routes())
        .merge(api::fuel_routes())
        .merge(api::future_maintenance_routes())
        .merge(api::notification_routes())
        .merge(api::account_routes())
        .merge(api::summary_routes())
        .merge(api::transfer_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
