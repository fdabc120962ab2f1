//! CRUD over record rows.
//!
//! Mutating functions run on a caller-supplied connection so that the
//! exclusivity pre-check, the write and the serial bump share a single
//! transaction. Each of `add`/`update`/`delete` bumps the owning zone's
//! serial on that same connection.

use sqlx::SqliteConnection;

use crate::access;
use crate::config::Config;
use crate::db::models::record::{NewRecord, Record, RecordChange, RecordListFilter, RecordPatch, RecordQuery};
use crate::db::paging::{Page, Paging};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

use super::serial;

pub async fn get(conn: &mut SqliteConnection, id: i64) -> AppResult<Record> {
    sqlx::query_as::<_, Record>(
        "SELECT id, domain_id, name, type, content, ttl, prio, disabled FROM records WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("record {id}")))
}

/// Locate exactly one record in `domain_id` matching the supplied filters.
///
/// Zero matches fail `NotFound`, more than one `Ambiguous`; a type filter
/// outside the allow-list fails `Semantic`.
pub async fn find(
    conn: &mut SqliteConnection,
    config: &Config,
    domain_id: i64,
    query: &RecordQuery,
) -> AppResult<Record> {
    if let Some(rtype) = &query.rtype {
        if !config.records.is_allowed_type(rtype) {
            return Err(AppError::Semantic(format!("invalid record type {rtype}")));
        }
    }

    let mut sql = String::from("SELECT id FROM records WHERE domain_id = ?");
    if query.name.is_some() {
        sql.push_str(" AND name = ?");
    }
    if query.rtype.is_some() {
        sql.push_str(" AND type = ?");
    }
    if query.content.is_some() {
        sql.push_str(" AND content = ?");
    }
    if query.priority.is_some() {
        sql.push_str(" AND prio = ?");
    }
    if query.ttl.is_some() {
        sql.push_str(" AND ttl = ?");
    }
    if query.except_id.is_some() {
        sql.push_str(" AND id != ?");
    }

    let mut q = sqlx::query_scalar::<_, i64>(&sql).bind(domain_id);
    if let Some(name) = &query.name {
        q = q.bind(name);
    }
    if let Some(rtype) = &query.rtype {
        q = q.bind(rtype);
    }
    if let Some(content) = &query.content {
        q = q.bind(content);
    }
    if let Some(priority) = query.priority {
        q = q.bind(priority);
    }
    if let Some(ttl) = query.ttl {
        q = q.bind(ttl);
    }
    if let Some(except_id) = query.except_id {
        q = q.bind(except_id);
    }

    let ids = q.fetch_all(&mut *conn).await?;

    match ids.as_slice() {
        [] => Err(AppError::NotFound("no record matches the filters".to_string())),
        [id] => get(conn, *id).await,
        _ => Err(AppError::Ambiguous(format!("{} records match the filters", ids.len()))),
    }
}

/// Insert a record and bump the zone serial.
pub async fn add(conn: &mut SqliteConnection, config: &Config, new: &NewRecord) -> AppResult<Record> {
    if !config.records.is_allowed_type(&new.rtype) {
        return Err(AppError::Semantic(format!("invalid record type {}", new.rtype)));
    }

    ensure_writable_domain(&mut *conn, new.domain_id).await?;

    let result = sqlx::query(
        "INSERT INTO records (domain_id, name, type, content, ttl, prio) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(new.domain_id)
    .bind(&new.name)
    .bind(&new.rtype)
    .bind(&new.content)
    .bind(new.ttl)
    .bind(new.priority)
    .execute(&mut *conn)
    .await?;

    serial::bump(&mut *conn, new.domain_id).await?;

    get(conn, result.last_insert_rowid()).await
}

/// Apply a partial update and bump the zone serial. Returns the pre-image
/// and post-image rows.
pub async fn update(
    conn: &mut SqliteConnection,
    config: &Config,
    id: i64,
    patch: &RecordPatch,
) -> AppResult<RecordChange> {
    if let Some(rtype) = &patch.rtype {
        if !config.records.is_allowed_type(rtype) {
            return Err(AppError::Semantic(format!("invalid record type {rtype}")));
        }
    }

    let old = get(&mut *conn, id).await?;
    ensure_writable_domain(&mut *conn, old.domain_id).await?;

    let name = patch.name.as_deref().unwrap_or(&old.name);
    let rtype = patch.rtype.as_deref().unwrap_or(&old.rtype);
    let content = patch.content.as_deref().unwrap_or(&old.content);
    let ttl = patch.ttl.unwrap_or(old.ttl);
    let priority = patch.priority.unwrap_or(old.priority);
    let disabled = patch.disabled.unwrap_or(old.disabled);

    sqlx::query(
        "UPDATE records SET name = ?, type = ?, content = ?, ttl = ?, prio = ?, disabled = ?
         WHERE id = ?",
    )
    .bind(name)
    .bind(rtype)
    .bind(content)
    .bind(ttl)
    .bind(priority)
    .bind(disabled)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    serial::bump(&mut *conn, old.domain_id).await?;

    let new = get(conn, id).await?;
    Ok(RecordChange { old, new })
}

/// Delete a record (with its remote-auth credentials) and bump the zone
/// serial. Returns the deleted snapshot.
pub async fn delete(conn: &mut SqliteConnection, id: i64) -> AppResult<Record> {
    let record = get(&mut *conn, id).await?;
    ensure_writable_domain(&mut *conn, record.domain_id).await?;

    sqlx::query("DELETE FROM remote WHERE record = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("DELETE FROM records WHERE id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await?;

    serial::bump(conn, record.domain_id).await?;

    Ok(record)
}

/// Writes only land on MASTER and NATIVE zones; anything else reads as
/// absent to the caller.
async fn ensure_writable_domain(conn: &mut SqliteConnection, domain_id: i64) -> AppResult<()> {
    let domain: Option<i64> =
        sqlx::query_scalar("SELECT id FROM domains WHERE id = ? AND type IN ('MASTER', 'NATIVE')")
            .bind(domain_id)
            .fetch_optional(conn)
            .await?;

    if domain.is_none() {
        return Err(AppError::NotFound(format!(
            "domain {domain_id} does not exist or is not writable"
        )));
    }
    Ok(())
}

/// Permission-scoped listing. SOA rows are never listed; the count and the
/// fetch run in one transaction so the page total matches the snapshot.
pub async fn list(
    db: &DbPool,
    user_id: i64,
    filter: &RecordListFilter,
    paging: &Paging,
) -> AppResult<Page<Record>> {
    let sort_clause = sorting_clause(filter.sort.as_deref())?;

    let user_is_admin = access::is_admin(db, user_id).await?;

    let mut conditions: Vec<String> = vec![
        "(P.user_id = ? OR ?)".to_string(),
        "R.type <> 'SOA'".to_string(),
    ];
    if let Some(domains) = &filter.domains {
        if domains.is_empty() {
            conditions.push("1 = 0".to_string());
        } else {
            conditions.push(format!("R.domain_id IN ({})", placeholders(domains.len())));
        }
    }
    if let Some(types) = &filter.types {
        if types.is_empty() {
            conditions.push("1 = 0".to_string());
        } else {
            conditions.push(format!("R.type IN ({})", placeholders(types.len())));
        }
    }
    if filter.query_name.is_some() {
        conditions.push("R.name LIKE ?".to_string());
    }
    if filter.query_content.is_some() {
        conditions.push("R.content LIKE ?".to_string());
    }

    let where_clause = conditions.join(" AND ");

    let count_sql = format!(
        "SELECT COUNT(DISTINCT R.id) FROM records R
         LEFT OUTER JOIN permissions P ON P.domain_id = R.domain_id
         WHERE {where_clause}"
    );
    let mut data_sql = format!(
        "SELECT R.id, R.domain_id, R.name, R.type, R.content, R.ttl, R.prio, R.disabled
         FROM records R
         LEFT OUTER JOIN permissions P ON P.domain_id = R.domain_id
         WHERE {where_clause}
         GROUP BY R.id{sort_clause}"
    );
    if paging.limit_offset().is_some() {
        data_sql.push_str(" LIMIT ? OFFSET ?");
    }

    let mut tx = db.begin().await?;

    let total_pages = match paging.limit_offset() {
        None => 1,
        Some(_) => {
            let mut q = sqlx::query_scalar::<_, i64>(&count_sql)
                .bind(user_id)
                .bind(user_is_admin);
            if let Some(domains) = &filter.domains {
                for domain_id in domains {
                    q = q.bind(domain_id);
                }
            }
            if let Some(types) = &filter.types {
                for rtype in types {
                    q = q.bind(rtype);
                }
            }
            if let Some(name) = &filter.query_name {
                q = q.bind(format!("%{name}%"));
            }
            if let Some(content) = &filter.query_content {
                q = q.bind(format!("%{content}%"));
            }
            let total = q.fetch_one(&mut *tx).await?;
            paging.total_pages(total)
        }
    };

    let mut q = sqlx::query_as::<_, Record>(&data_sql)
        .bind(user_id)
        .bind(user_is_admin);
    if let Some(domains) = &filter.domains {
        for domain_id in domains {
            q = q.bind(domain_id);
        }
    }
    if let Some(types) = &filter.types {
        for rtype in types {
            q = q.bind(rtype);
        }
    }
    if let Some(name) = &filter.query_name {
        q = q.bind(format!("%{name}%"));
    }
    if let Some(content) = &filter.query_content {
        q = q.bind(format!("%{content}%"));
    }
    if let Some((limit, offset)) = paging.limit_offset() {
        q = q.bind(limit).bind(offset);
    }
    let items = q.fetch_all(&mut *tx).await?;

    tx.commit().await?;

    Ok(Page { items, total_pages })
}

const SORT_FIELDS: &[(&str, &str)] = &[
    ("id", "R.id"),
    ("name", "R.name"),
    ("type", "R.type"),
    ("content", "R.content"),
    ("priority", "R.prio"),
    ("ttl", "R.ttl"),
];

/// Parse `field-asc,field2-desc` into an ORDER BY clause. Only fields from
/// the allow-list are accepted; anything else fails `Semantic`.
fn sorting_clause(sort: Option<&str>) -> AppResult<String> {
    let Some(sort) = sort else {
        return Ok(" ORDER BY R.id ASC".to_string());
    };

    let mut terms = Vec::new();
    for part in sort.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (field, direction) = match part.rsplit_once('-') {
            Some((field, "asc")) => (field, "ASC"),
            Some((field, "desc")) => (field, "DESC"),
            _ => return Err(AppError::Semantic(format!("invalid sort term {part}"))),
        };
        let column = SORT_FIELDS
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, column)| *column)
            .ok_or_else(|| AppError::Semantic(format!("cannot sort by {field}")))?;
        terms.push(format!("{column} {direction}"));
    }

    if terms.is_empty() {
        return Ok(" ORDER BY R.id ASC".to_string());
    }
    Ok(format!(" ORDER BY {}", terms.join(", ")))
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}
