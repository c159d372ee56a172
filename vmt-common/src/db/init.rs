//! Database initialization
//!
//! Opens (or creates) the SQLite file, creates every table idempotently,
//! runs versioned migrations and makes sure the owner has a default account.

use crate::db::{accounts, migrations};
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Owner used when none is configured
pub const DEFAULT_OWNER: &str = "owner";

/// Open the database at `db_path`, creating file and schema if needed
pub async fn init_database(db_path: &Path, owner: &str) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let options = SqliteConnectOptions::from_str(&db_url)?
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool, owner).await?;
    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// One connection only: every pooled connection to `:memory:` would
/// otherwise see its own empty database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    create_schema(&pool, DEFAULT_OWNER).await?;
    Ok(pool)
}

async fn create_schema(pool: &SqlitePool, owner: &str) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_accounts_table(pool).await?;
    create_vehicles_table(pool).await?;
    create_maintenance_records_table(pool).await?;
    create_fuel_entries_table(pool).await?;
    create_future_maintenance_table(pool).await?;
    create_email_subscriptions_table(pool).await?;

    // The account must exist before migrations backfill vehicles into it
    accounts::ensure_default_account(pool, owner).await?;
    migrations::run_migrations(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_accounts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS accounts (
            id TEXT PRIMARY KEY,
            owner_user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            is_default INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (owner_user_id, name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_vehicles_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS vehicles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id TEXT REFERENCES accounts(id) ON DELETE CASCADE,
            name TEXT NOT NULL UNIQUE,
            year INTEGER NOT NULL,
            make TEXT NOT NULL,
            model TEXT NOT NULL,
            vin TEXT UNIQUE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_maintenance_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS maintenance_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            vehicle_id INTEGER NOT NULL REFERENCES vehicles(id) ON DELETE CASCADE,
            date DATE NOT NULL,
            date_estimated INTEGER NOT NULL DEFAULT 0,
            mileage INTEGER NOT NULL DEFAULT 0,
            description TEXT NOT NULL,
            cost REAL,
            oil_change_interval INTEGER,

            is_oil_change INTEGER NOT NULL DEFAULT 0,
            oil_type TEXT,
            oil_brand TEXT,
            oil_filter_brand TEXT,
            oil_filter_part_number TEXT,
            oil_cost REAL,
            filter_cost REAL,
            labor_cost REAL,

            oil_analysis_date DATE,
            next_oil_analysis_date DATE,
            oil_analysis_cost REAL,
            iron_level REAL,
            aluminum_level REAL,
            copper_level REAL,
            viscosity REAL,
            tbn REAL,
            fuel_dilution REAL,
            coolant_contamination INTEGER,
            driving_conditions TEXT,
            oil_consumption_notes TEXT,
            linked_oil_change_id INTEGER REFERENCES maintenance_records(id) ON DELETE SET NULL,

            tire_meta TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_maintenance_vehicle_date ON maintenance_records(vehicle_id, date)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_maintenance_vehicle_mileage ON maintenance_records(vehicle_id, mileage)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_fuel_entries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS fuel_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            vehicle_id INTEGER NOT NULL REFERENCES vehicles(id) ON DELETE CASCADE,
            date DATE NOT NULL,
            time TEXT,
            mileage INTEGER NOT NULL,
            fuel_amount REAL NOT NULL,
            fuel_cost REAL NOT NULL,
            fuel_type TEXT,
            driving_pattern TEXT,
            notes TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_fuel_vehicle_mileage ON fuel_entries(vehicle_id, mileage)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_future_maintenance_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS future_maintenance (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            vehicle_id INTEGER NOT NULL REFERENCES vehicles(id) ON DELETE CASCADE,
            maintenance_type TEXT NOT NULL,
            target_mileage INTEGER,
            target_date DATE,
            mileage_reminder INTEGER NOT NULL DEFAULT 100,
            date_reminder INTEGER NOT NULL DEFAULT 30,
            estimated_cost REAL,
            parts_link TEXT,
            notes TEXT,
            is_recurring INTEGER NOT NULL DEFAULT 0,
            recurrence_interval_miles INTEGER,
            recurrence_interval_months INTEGER,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_email_subscriptions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS email_subscriptions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            vehicle_id INTEGER NOT NULL REFERENCES vehicles(id) ON DELETE CASCADE,
            email_address TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            reminder_frequency_days INTEGER NOT NULL DEFAULT 7,
            last_email_sent DATE,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (vehicle_id, email_address)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
