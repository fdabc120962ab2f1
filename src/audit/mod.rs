//! Append-only audit trail in the `logging` table.
//!
//! Every record mutation writes one entry; PTR-side mutations write their
//! own with the `R`-prefixed actions.

use chrono::Utc;

use crate::db::models::log::LogEntry;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

/// Append a log line for `domain_id` on behalf of `user_id`.
///
/// Fails with `NotFound` if the domain is missing or not writable, or the
/// user no longer exists.
pub async fn add_log(db: &DbPool, domain_id: i64, user_id: i64, log: &str) -> AppResult<LogEntry> {
    let domain: Option<i64> =
        sqlx::query_scalar("SELECT id FROM domains WHERE id = ? AND type IN ('MASTER', 'NATIVE')")
            .bind(domain_id)
            .fetch_optional(db)
            .await?;
    if domain.is_none() {
        return Err(AppError::NotFound(format!("domain {domain_id}")));
    }

    let user: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(db)
        .await?;
    if user.is_none() {
        return Err(AppError::NotFound(format!("user {user_id}")));
    }

    let now = Utc::now().to_rfc3339();
    let result =
        sqlx::query("INSERT INTO logging (domain_id, user_id, timestamp, log) VALUES (?, ?, ?, ?)")
            .bind(domain_id)
            .bind(user_id)
            .bind(&now)
            .bind(log)
            .execute(db)
            .await?;

    get_log(db, result.last_insert_rowid()).await
}

pub async fn get_log(db: &DbPool, id: i64) -> AppResult<LogEntry> {
    sqlx::query_as::<_, LogEntry>(
        "SELECT id, domain_id, user_id, timestamp, log FROM logging WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("log entry {id}")))
}
