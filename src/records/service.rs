//! The mutation façade: capability checks, transactional writes, the audit
//! trail, and best-effort PTR synchronization.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::access;
use crate::audit;
use crate::config::Config;
use crate::db::models::record::{NewRecord, Record, RecordChange, RecordListFilter, RecordPatch};
use crate::db::paging::{Page, Paging};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};

use super::{cname, ptr, repository};

/// Entry point for all record reads and writes. Bundles the storage handle
/// and configuration so callers pass context explicitly instead of reaching
/// into process-wide state.
#[derive(Clone)]
pub struct RecordService {
    db: DbPool,
    config: Arc<Config>,
}

impl RecordService {
    pub fn new(db: DbPool, config: Arc<Config>) -> Self {
        Self { db, config }
    }

    pub(crate) fn db(&self) -> &DbPool {
        &self.db
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    /// List records visible to `user_id`, filtered and paged.
    pub async fn list_records(
        &self,
        user_id: i64,
        filter: &RecordListFilter,
        paging: &Paging,
    ) -> AppResult<Page<Record>> {
        repository::list(&self.db, user_id, filter, paging).await
    }

    pub async fn get_record(&self, user_id: i64, id: i64) -> AppResult<Record> {
        if !access::can_access_record(&self.db, user_id, id).await? {
            debug!(user_id, record_id = id, "record access denied");
            return Err(AppError::Forbidden(format!("no permission for record {id}")));
        }

        let mut conn = self.db.acquire().await?;
        repository::get(&mut conn, id).await
    }

    /// Create a record. With `ptr_sync`, an A/AAAA record is mirrored into
    /// its reverse zone afterwards, best effort.
    pub async fn add_record(
        &self,
        user_id: i64,
        new: NewRecord,
        ptr_sync: bool,
    ) -> AppResult<Record> {
        if !access::can_access_domain(&self.db, user_id, new.domain_id).await? {
            debug!(user_id, domain_id = new.domain_id, "domain access denied");
            return Err(AppError::Forbidden(format!(
                "no permission for domain {}",
                new.domain_id
            )));
        }

        let record = self.add_guarded(&new).await?;

        audit::add_log(
            &self.db,
            record.domain_id,
            user_id,
            &format!(
                "ADD: #{} {} {} {}",
                record.id, record.name, record.rtype, record.content
            ),
        )
        .await?;

        if ptr_sync {
            if let Err(err) = ptr::sync_created(self, user_id, &record).await {
                warn!(record_id = record.id, error = %err, "PTR synchronization failed after add");
            }
        }

        Ok(record)
    }

    /// Update a record. With `ptr_sync`, the PTR mirror follows the change,
    /// best effort, including moves between reverse zones.
    pub async fn update_record(
        &self,
        user_id: i64,
        id: i64,
        patch: RecordPatch,
        ptr_sync: bool,
    ) -> AppResult<RecordChange> {
        if !access::can_access_record(&self.db, user_id, id).await? {
            debug!(user_id, record_id = id, "record access denied");
            return Err(AppError::Forbidden(format!("no permission for record {id}")));
        }

        let change = self.update_guarded(id, &patch).await?;

        audit::add_log(
            &self.db,
            change.old.domain_id,
            user_id,
            &format!(
                "UPD: #{} {} {}",
                change.old.id,
                change.old.name,
                diff_line(&change)
            ),
        )
        .await?;

        if ptr_sync {
            if let Err(err) = ptr::sync_updated(self, user_id, &change).await {
                warn!(record_id = id, error = %err, "PTR synchronization failed after update");
            }
        }

        Ok(change)
    }

    /// Delete a record; a PTR mirror of an A/AAAA record is cleaned up,
    /// best effort.
    pub async fn delete_record(&self, user_id: i64, id: i64) -> AppResult<Record> {
        if !access::can_access_record(&self.db, user_id, id).await? {
            debug!(user_id, record_id = id, "record access denied");
            return Err(AppError::Forbidden(format!("no permission for record {id}")));
        }

        let record = self.delete_in_tx(id).await?;
        info!(record_id = id, "deleted record");

        audit::add_log(
            &self.db,
            record.domain_id,
            user_id,
            &format!(
                "DEL: #{} {} {} {}",
                record.id, record.name, record.rtype, record.content
            ),
        )
        .await?;

        if let Err(err) = ptr::sync_deleted(self, user_id, &record).await {
            warn!(record_id = id, error = %err, "PTR synchronization failed after delete");
        }

        Ok(record)
    }

    /// Guarded transactional add: the exclusivity check, the insert and the
    /// serial bump commit or roll back together.
    pub(crate) async fn add_guarded(&self, new: &NewRecord) -> AppResult<Record> {
        let mut tx = self.db.begin().await?;
        cname::ensure_exclusive(&mut tx, &self.config, new.domain_id, &new.name, &new.rtype, None)
            .await?;
        let record = repository::add(&mut tx, &self.config, new).await?;
        tx.commit().await?;
        Ok(record)
    }

    /// Guarded transactional update, checked against the effective
    /// post-write name and type.
    pub(crate) async fn update_guarded(&self, id: i64, patch: &RecordPatch) -> AppResult<RecordChange> {
        let mut tx = self.db.begin().await?;
        let old = repository::get(&mut tx, id).await?;
        let name = patch.name.as_deref().unwrap_or(&old.name);
        let rtype = patch.rtype.as_deref().unwrap_or(&old.rtype);
        cname::ensure_exclusive(&mut tx, &self.config, old.domain_id, name, rtype, Some(id)).await?;
        let change = repository::update(&mut tx, &self.config, id, patch).await?;
        tx.commit().await?;
        Ok(change)
    }

    pub(crate) async fn delete_in_tx(&self, id: i64) -> AppResult<Record> {
        let mut tx = self.db.begin().await?;
        let record = repository::delete(&mut tx, id).await?;
        tx.commit().await?;
        Ok(record)
    }
}

/// Human readable `field: "old"->"new"` pairs for the audit trail.
pub(crate) fn diff_line(change: &RecordChange) -> String {
    let pairs = [
        ("name", change.old.name.clone(), change.new.name.clone()),
        ("type", change.old.rtype.clone(), change.new.rtype.clone()),
        ("content", change.old.content.clone(), change.new.content.clone()),
        ("priority", change.old.priority.to_string(), change.new.priority.to_string()),
        ("ttl", change.old.ttl.to_string(), change.new.ttl.to_string()),
        ("disabled", change.old.disabled.to_string(), change.new.disabled.to_string()),
    ];

    let mut line = String::new();
    for (field, old, new) in pairs {
        if old != new {
            line.push_str(&format!("{field}: \"{old}\"->\"{new}\" "));
        }
    }
    line.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::record::Record;

    fn record(name: &str, rtype: &str, content: &str, ttl: i64) -> Record {
        Record {
            id: 1,
            domain_id: 1,
            name: name.to_string(),
            rtype: rtype.to_string(),
            content: content.to_string(),
            ttl,
            priority: 0,
            disabled: false,
        }
    }

    #[test]
    fn test_diff_line_lists_changed_fields() {
        let change = RecordChange {
            old: record("www.example.com", "A", "1.2.3.4", 3600),
            new: record("www.example.com", "A", "1.2.3.5", 7200),
        };
        assert_eq!(
            diff_line(&change),
            "content: \"1.2.3.4\"->\"1.2.3.5\" ttl: \"3600\"->\"7200\""
        );
    }

    #[test]
    fn test_diff_line_empty_when_unchanged() {
        let change = RecordChange {
            old: record("www.example.com", "A", "1.2.3.4", 3600),
            new: record("www.example.com", "A", "1.2.3.4", 3600),
        };
        assert_eq!(diff_line(&change), "");
    }
}
