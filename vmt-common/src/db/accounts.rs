//! Account queries
//!
//! Every owner has exactly one default account; new vehicles land there
//! unless another account is chosen.

use crate::db::models::Account;
use crate::db::unique_violation;
use crate::{Error, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_ACCOUNT_NAME: &str = "Default";

pub async fn list_accounts(pool: &SqlitePool, owner: &str) -> Result<Vec<Account>> {
    let accounts = sqlx::query_as::<_, Account>(
        "SELECT * FROM accounts WHERE owner_user_id = ? ORDER BY is_default DESC, name",
    )
    .bind(owner)
    .fetch_all(pool)
    .await?;

    Ok(accounts)
}

pub async fn get_account(pool: &SqlitePool, id: &str) -> Result<Account> {
    sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found(format!("Account {id}")))
}

pub async fn get_default_account(pool: &SqlitePool, owner: &str) -> Result<Account> {
    sqlx::query_as::<_, Account>(
        "SELECT * FROM accounts WHERE owner_user_id = ? AND is_default = 1 LIMIT 1",
    )
    .bind(owner)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::not_found(format!("Default account for {owner}")))
}

/// Return the owner's default account, creating or promoting one if needed
pub async fn ensure_default_account(pool: &SqlitePool, owner: &str) -> Result<Account> {
    match get_default_account(pool, owner).await {
        Ok(account) => return Ok(account),
        Err(Error::NotFound(_)) => {}
        Err(e) => return Err(e),
    }

    let existing = list_accounts(pool, owner).await?;
    if let Some(first) = existing.first() {
        return set_default_account(pool, owner, &first.id).await;
    }

    let now = Utc::now();
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO accounts (id, owner_user_id, name, is_default, created_at, updated_at)
        VALUES (?, ?, ?, 1, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(owner)
    .bind(DEFAULT_ACCOUNT_NAME)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    info!("Created default account for owner {}", owner);
    get_account(pool, &id).await
}

pub async fn create_account(pool: &SqlitePool, owner: &str, name: &str) -> Result<Account> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid("Account name is required"));
    }
    if name.chars().count() > 100 {
        return Err(Error::invalid("Account name must be 100 characters or fewer"));
    }

    let now = Utc::now();
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO accounts (id, owner_user_id, name, is_default, created_at, updated_at)
        VALUES (?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(owner)
    .bind(name)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| unique_violation(e, "An account with this name already exists"))?;

    get_account(pool, &id).await
}

/// Make `id` the owner's only default account
pub async fn set_default_account(pool: &SqlitePool, owner: &str, id: &str) -> Result<Account> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();

    let found = sqlx::query("UPDATE accounts SET is_default = 1, updated_at = ? WHERE id = ? AND owner_user_id = ?")
        .bind(now)
        .bind(id)
        .bind(owner)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if found == 0 {
        return Err(Error::not_found(format!("Account {id}")));
    }

    sqlx::query(
        "UPDATE accounts SET is_default = 0, updated_at = ? WHERE owner_user_id = ? AND id != ? AND is_default = 1",
    )
    .bind(now)
    .bind(owner)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    get_account(pool, id).await
}
