//! Capability checks over the `users`/`permissions` tables.
//!
//! Admins bypass per-domain permission rows; everyone else needs a row in
//! `permissions` for the domain in question.

use crate::db::DbPool;
use crate::error::AppResult;

pub async fn is_admin(db: &DbPool, user_id: i64) -> AppResult<bool> {
    let kind: Option<String> = sqlx::query_scalar("SELECT type FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(db)
        .await?;

    Ok(kind.as_deref() == Some("admin"))
}

pub async fn can_access_domain(db: &DbPool, user_id: i64, domain_id: i64) -> AppResult<bool> {
    if is_admin(db, user_id).await? {
        return Ok(true);
    }

    let granted: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM permissions WHERE user_id = ? AND domain_id = ?")
            .bind(user_id)
            .bind(domain_id)
            .fetch_optional(db)
            .await?;

    Ok(granted.is_some())
}

/// A missing record yields `false` for non-admins: the check cannot tie it
/// to a domain the caller may see.
pub async fn can_access_record(db: &DbPool, user_id: i64, record_id: i64) -> AppResult<bool> {
    if is_admin(db, user_id).await? {
        return Ok(true);
    }

    let domain_id: Option<i64> = sqlx::query_scalar("SELECT domain_id FROM records WHERE id = ?")
        .bind(record_id)
        .fetch_optional(db)
        .await?;

    match domain_id {
        Some(domain_id) => can_access_domain(db, user_id, domain_id).await,
        None => Ok(false),
    }
}
