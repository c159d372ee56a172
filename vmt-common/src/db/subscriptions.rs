//! Email subscription queries

use crate::db::models::{EmailSubscription, NewEmailSubscription};
use crate::db::{unique_violation, vehicles};
use crate::{Error, Result};
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::info;

pub const MAX_FREQUENCY_DAYS: i64 = 365;

/// Loose syntax check: one `@`, a non-empty local part and a dotted domain
pub fn is_valid_email(address: &str) -> bool {
    let Some((local, domain)) = address.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !address.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|part| !part.is_empty())
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<EmailSubscription> {
    sqlx::query_as::<_, EmailSubscription>("SELECT * FROM email_subscriptions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::not_found(format!("Email subscription {id}")))
}

pub async fn list(pool: &SqlitePool) -> Result<Vec<EmailSubscription>> {
    let subs = sqlx::query_as::<_, EmailSubscription>(
        "SELECT * FROM email_subscriptions ORDER BY vehicle_id, email_address",
    )
    .fetch_all(pool)
    .await?;
    Ok(subs)
}

pub async fn list_active(pool: &SqlitePool) -> Result<Vec<EmailSubscription>> {
    let subs = sqlx::query_as::<_, EmailSubscription>(
        "SELECT * FROM email_subscriptions WHERE is_active = 1 ORDER BY vehicle_id, id",
    )
    .fetch_all(pool)
    .await?;
    Ok(subs)
}

pub async fn create(pool: &SqlitePool, input: &NewEmailSubscription) -> Result<EmailSubscription> {
    let address = input.email_address.trim().to_lowercase();
    if !is_valid_email(&address) {
        return Err(Error::invalid(format!("Invalid email address: {address}")));
    }
    if !(1..=MAX_FREQUENCY_DAYS).contains(&input.reminder_frequency_days) {
        return Err(Error::invalid(format!(
            "Reminder frequency must be between 1 and {MAX_FREQUENCY_DAYS} days"
        )));
    }
    vehicles::get_vehicle(pool, input.vehicle_id).await?;

    let id = sqlx::query(
        r#"
        INSERT INTO email_subscriptions (vehicle_id, email_address, is_active, reminder_frequency_days, created_at)
        VALUES (?, ?, 1, ?, ?)
        "#,
    )
    .bind(input.vehicle_id)
    .bind(&address)
    .bind(input.reminder_frequency_days)
    .bind(Utc::now())
    .execute(pool)
    .await
    .map_err(|e| unique_violation(e, "This address is already subscribed to this vehicle"))?
    .last_insert_rowid();

    info!(subscription_id = id, vehicle_id = input.vehicle_id, "Created email subscription");
    get(pool, id).await
}

pub async fn set_active(pool: &SqlitePool, id: i64, active: bool) -> Result<EmailSubscription> {
    let updated = sqlx::query("UPDATE email_subscriptions SET is_active = ? WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(Error::not_found(format!("Email subscription {id}")));
    }
    get(pool, id).await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
    let deleted = sqlx::query("DELETE FROM email_subscriptions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(Error::not_found(format!("Email subscription {id}")));
    }
    Ok(())
}

pub async fn mark_sent(pool: &SqlitePool, id: i64, date: NaiveDate) -> Result<()> {
    sqlx::query("UPDATE email_subscriptions SET last_email_sent = ? WHERE id = ?")
        .bind(date)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::is_valid_email;

    #[test]
    fn email_syntax() {
        assert!(is_valid_email("me@example.com"));
        assert!(is_valid_email("first.last@mail.example.org"));
        assert!(!is_valid_email("example.com"));
        assert!(!is_valid_email("me@localhost"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("me@@example.com"));
        assert!(!is_valid_email("me@example..com"));
        assert!(!is_valid_email("me @example.com"));
    }
}
