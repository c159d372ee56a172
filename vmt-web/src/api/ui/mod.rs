//! UI Routes - HTML pages for the vehicle maintenance tracker
//!
//! Pages are rendered on the server; forms post back to the same paths and
//! redirect with a `notice` query parameter on success.
//!
//! # Structure
//! - **Layout** (`layout`): page shell, navigation, banners, shared cells
//! - **Static Assets** (`static_assets`): CSS/JS file serving
//! - **Dashboard** (`dashboard`): totals, vehicle health and notifications
//! - **Vehicles** (`vehicles`): vehicle list and add/edit forms
//! - **Maintenance** (`maintenance`): service history and record forms
//! - **Oil** (`oil`): oil change history and lab analysis entry
//! - **Fuel** (`fuel`): fill-up log and MPG summary
//! - **Future** (`future`): planned maintenance and completion
//! - **Import** (`import`): CSV upload and import report
//! - **Notifications** (`notifications`): reminder feed and email subscriptions

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::api::transfer::MAX_UPLOAD_BYTES;
use crate::AppState;

pub mod layout;
mod static_assets;
mod dashboard;
mod vehicles;
mod maintenance;
mod oil;
mod fuel;
mod future;
mod import;
mod notifications;

use static_assets::{serve_vmt_css, serve_vmt_js};
use dashboard::dashboard_page;

/// Build UI routes
pub fn ui_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard_page))
        // Vehicles
        .route("/vehicles", get(vehicles::vehicles_page).post(vehicles::create_vehicle))
        .route("/vehicles/new", get(vehicles::new_vehicle_page))
        .route("/vehicles/:id/edit", get(vehicles::edit_vehicle_page))
        .route("/vehicles/:id", post(vehicles::update_vehicle))
        .route("/vehicles/:id/delete", post(vehicles::delete_vehicle))
        // Maintenance records
        .route(
            "/maintenance",
            get(maintenance::maintenance_page).post(maintenance::create_record),
        )
        .route("/maintenance/new", get(maintenance::new_record_page))
        .route("/maintenance/:id/edit", get(maintenance::edit_record_page))
        .route("/maintenance/:id", post(maintenance::update_record))
        .route("/maintenance/:id/delete", post(maintenance::delete_record))
        // Oil
        .route("/oil-changes", get(oil::oil_changes_page))
        .route("/oil-analysis/:vehicle_id", get(oil::oil_analysis_page))
        .route("/oil-analysis", post(oil::create_oil_analysis))
        // Fuel
        .route("/fuel", get(fuel::fuel_page).post(fuel::create_fuel_entry))
        // Planned maintenance
        .route(
            "/future-maintenance",
            get(future::future_page).post(future::create_future),
        )
        .route("/future-maintenance/:id/complete", post(future::complete_future))
        // Import
        .route(
            "/import",
            get(import::import_page)
                .post(import::import_submit)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        // Notifications
        .route("/notifications", get(notifications::notifications_page))
        .route(
            "/notifications/subscriptions",
            post(notifications::create_subscription),
        )
        .route(
            "/notifications/subscriptions/:id/toggle",
            post(notifications::toggle_subscription),
        )
        .route(
            "/notifications/subscriptions/:id/delete",
            post(notifications::delete_subscription),
        )
        // Static assets
        .route("/static/vmt.css", get(serve_vmt_css))
        .route("/static/vmt.js", get(serve_vmt_js))
}
