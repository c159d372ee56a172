//! CSV import/export and dashboard aggregation

pub mod csv_export;
pub mod csv_import;
pub mod dashboard;

pub use csv_export::{export_fuel, export_maintenance, export_vehicles, parse_id_list};
pub use csv_import::{import_csv, DuplicatePolicy, ImportReport};
pub use dashboard::Dashboard;
