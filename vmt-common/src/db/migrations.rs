//! Database schema migrations
//!
//! Versioned, idempotent upgrades for databases created by older builds.
//! Fresh databases already get the current table layout from `init`, so each
//! migration checks before it alters anything.
//!
//! # Migration Guidelines
//!
//! 1. Never modify an existing migration, add a new one
//! 2. Check `pragma_table_info` before `ALTER TABLE`
//! 3. Prefer `ALTER TABLE` over drop-and-recreate to keep data

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 3;

/// Descriptions that name a service other than an oil change
const NON_OIL_SERVICES: [&str; 9] = [
    "brake",
    "tire",
    "rotation",
    "battery",
    "air filter",
    "cabin filter",
    "fuel filter",
    "wiper",
    "alignment",
];

/// Latest applied version, 0 for an untracked database
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let version: Option<i32> =
        sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
            .fetch_one(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

async fn has_column(pool: &SqlitePool, table: &str, column: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?",
    )
    .bind(table)
    .bind(column)
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("Migration v2 completed");
    }

    if current_version < 3 {
        migrate_v3(pool).await?;
        set_schema_version(pool, 3).await?;
        info!("Migration v3 completed");
    }

    Ok(())
}

/// v1: tire measurements column on maintenance records
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    if !has_column(pool, "maintenance_records", "tire_meta").await? {
        sqlx::query("ALTER TABLE maintenance_records ADD COLUMN tire_meta TEXT")
            .execute(pool)
            .await?;
        info!("Migration v1: added tire_meta to maintenance_records");
    }
    Ok(())
}

/// v2: vehicles belong to an account; orphans move to the default account
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    if !has_column(pool, "vehicles", "account_id").await? {
        sqlx::query("ALTER TABLE vehicles ADD COLUMN account_id TEXT REFERENCES accounts(id)")
            .execute(pool)
            .await?;
        info!("Migration v2: added account_id to vehicles");
    }

    let default_account: Option<String> = sqlx::query_scalar(
        "SELECT id FROM accounts WHERE is_default = 1 ORDER BY created_at LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    let Some(account_id) = default_account else {
        warn!("Migration v2: no default account, vehicles left unassigned");
        return Ok(());
    };

    let moved = sqlx::query("UPDATE vehicles SET account_id = ? WHERE account_id IS NULL")
        .bind(&account_id)
        .execute(pool)
        .await?
        .rows_affected();

    if moved > 0 {
        info!("Migration v2: assigned {} vehicles to default account", moved);
    }
    Ok(())
}

/// v3: clear the oil change flag on records that describe other services
async fn migrate_v3(pool: &SqlitePool) -> Result<()> {
    let flagged: Vec<(i64, String)> = sqlx::query_as(
        "SELECT id, description FROM maintenance_records WHERE is_oil_change = 1",
    )
    .fetch_all(pool)
    .await?;

    let mut fixed = 0;
    for (id, description) in flagged {
        if !is_misflagged_oil_change(&description) {
            continue;
        }
        sqlx::query("UPDATE maintenance_records SET is_oil_change = 0 WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        fixed += 1;
    }

    if fixed > 0 {
        info!("Migration v3: cleared oil change flag on {} records", fixed);
    }
    Ok(())
}

fn is_misflagged_oil_change(description: &str) -> bool {
    let lower = description.to_lowercase();
    !lower.contains("oil") && NON_OIL_SERVICES.iter().any(|s| lower.contains(s))
}
