//! HTTP handlers for vmt-web
//!
//! JSON endpoints live under `/api`, HTML pages and form posts in `ui`.

pub mod accounts;
pub mod fuel;
pub mod future_maintenance;
pub mod health;
pub mod maintenance;
pub mod notifications;
pub mod summary;
pub mod transfer;
pub mod ui;
pub mod vehicles;

pub use accounts::account_routes;
pub use fuel::fuel_routes;
pub use future_maintenance::future_maintenance_routes;
pub use health::health_routes;
pub use maintenance::maintenance_routes;
pub use notifications::notification_routes;
pub use summary::summary_routes;
pub use transfer::transfer_routes;
pub use ui::ui_routes;
pub use vehicles::vehicle_routes;
