//! CNAME exclusivity: a name carrying a CNAME may carry nothing else.

use sqlx::SqliteConnection;

use crate::config::Config;
use crate::db::models::record::RecordQuery;
use crate::error::{AppError, AppResult};

use super::repository;

/// Reject a write that would put a CNAME next to another record (or the
/// other way around) at `name`.
///
/// Called with the effective post-write name and type, inside the
/// mutation's transaction; `except_id` excludes the row being updated from
/// the search.
pub async fn ensure_exclusive(
    conn: &mut SqliteConnection,
    config: &Config,
    domain_id: i64,
    name: &str,
    rtype: &str,
    except_id: Option<i64>,
) -> AppResult<()> {
    let query = if rtype == "CNAME" {
        // Any record at this name blocks a CNAME.
        RecordQuery {
            name: Some(name.to_string()),
            except_id,
            ..Default::default()
        }
    } else {
        // Only an existing CNAME blocks other types.
        RecordQuery {
            name: Some(name.to_string()),
            rtype: Some("CNAME".to_string()),
            except_id,
            ..Default::default()
        }
    };

    match repository::find(conn, config, domain_id, &query).await {
        Err(AppError::NotFound(_)) => Ok(()),
        Ok(existing) => Err(AppError::Conflict(format!(
            "record {} already exists at {name}",
            existing.id
        ))),
        Err(AppError::Ambiguous(_)) => Err(AppError::Conflict(format!(
            "multiple records already exist at {name}"
        ))),
        Err(err) => Err(err),
    }
}
