//! # Vehicle Maintenance Tracker common library
//!
//! Shared code for the web server and the reminder dispatcher:
//! - Database schema, migrations, models and repositories
//! - Configuration loading and root folder resolution
//! - Flexible parsers for imported and form-submitted values
//! - Fuel economy (MPG) calculation
//! - Reminder evaluation and reminder email composition

pub mod config;
pub mod db;
pub mod error;
pub mod html;
pub mod mpg;
pub mod notify;
pub mod parse;
pub mod reminders;

pub use error::{Error, Result};
