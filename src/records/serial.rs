//! SOA serial maintenance.

use sqlx::SqliteConnection;

use crate::error::{AppError, AppResult};

/// Increment the zone serial and return the new value.
///
/// Runs on the caller's connection so the bump commits or rolls back
/// together with the record write it belongs to.
pub async fn bump(conn: &mut SqliteConnection, domain_id: i64) -> AppResult<i64> {
    let result = sqlx::query("UPDATE domains SET serial = serial + 1 WHERE id = ?")
        .bind(domain_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("domain {domain_id}")));
    }

    let serial = sqlx::query_scalar("SELECT serial FROM domains WHERE id = ?")
        .bind(domain_id)
        .fetch_one(conn)
        .await?;

    Ok(serial)
}
