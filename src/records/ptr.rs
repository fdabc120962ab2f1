//! Keeps PTR records in reverse zones aligned with forward A/AAAA records.
//!
//! Synchronization runs after the forward mutation has committed and is
//! best effort: an unresolved reverse zone or an ambiguous existing PTR
//! ends the sync without touching the forward result. Each PTR mutation
//! goes through the same guarded transactional path as a forward one and
//! writes its own audit entry.

use tracing::debug;

use crate::audit;
use crate::db::models::record::{NewRecord, Record, RecordChange, RecordPatch, RecordQuery};
use crate::error::{AppError, AppResult};

use super::repository;
use super::reverse::{self, ReverseZone};
use super::service::{diff_line, RecordService};

/// Outcome of probing a reverse zone for the PTR row at the derived name.
#[derive(Debug)]
pub(crate) enum PtrLookup {
    Missing,
    Single(Record),
    Ambiguous,
}

fn is_address_type(rtype: &str) -> bool {
    rtype == "A" || rtype == "AAAA"
}

async fn lookup(svc: &RecordService, zone: &ReverseZone) -> AppResult<PtrLookup> {
    let mut conn = svc.db().acquire().await?;
    let query = RecordQuery {
        name: Some(zone.reverse_name.clone()),
        rtype: Some("PTR".to_string()),
        ..Default::default()
    };
    match repository::find(&mut conn, svc.config(), zone.zone_id, &query).await {
        Ok(record) => Ok(PtrLookup::Single(record)),
        Err(AppError::NotFound(_)) => Ok(PtrLookup::Missing),
        Err(AppError::Ambiguous(_)) => Ok(PtrLookup::Ambiguous),
        Err(err) => Err(err),
    }
}

async fn create_ptr(
    svc: &RecordService,
    user_id: i64,
    zone: &ReverseZone,
    forward: &Record,
) -> AppResult<()> {
    let new = NewRecord {
        domain_id: zone.zone_id,
        name: zone.reverse_name.clone(),
        rtype: "PTR".to_string(),
        content: forward.name.clone(),
        ttl: forward.ttl,
        priority: forward.priority,
    };
    let record = svc.add_guarded(&new).await?;

    audit::add_log(
        svc.db(),
        zone.zone_id,
        user_id,
        &format!(
            "RADD: #{} {} {} {}",
            record.id, record.name, record.rtype, record.content
        ),
    )
    .await?;
    Ok(())
}

async fn update_ptr(
    svc: &RecordService,
    user_id: i64,
    existing: &Record,
    zone: &ReverseZone,
    forward: &Record,
) -> AppResult<()> {
    let patch = RecordPatch {
        name: Some(zone.reverse_name.clone()),
        rtype: Some("PTR".to_string()),
        content: Some(forward.name.clone()),
        ttl: Some(forward.ttl),
        priority: Some(forward.priority),
        disabled: None,
    };
    let change = svc.update_guarded(existing.id, &patch).await?;

    audit::add_log(
        svc.db(),
        change.old.domain_id,
        user_id,
        &format!(
            "RUPD: #{} {} {}",
            change.old.id,
            change.old.name,
            diff_line(&change)
        ),
    )
    .await?;
    Ok(())
}

async fn delete_ptr(svc: &RecordService, user_id: i64, existing: &Record) -> AppResult<()> {
    let record = svc.delete_in_tx(existing.id).await?;

    audit::add_log(
        svc.db(),
        record.domain_id,
        user_id,
        &format!(
            "RDEL: #{} {} {} {}",
            record.id, record.name, record.rtype, record.content
        ),
    )
    .await?;
    Ok(())
}

/// Mirror a freshly created forward record into its reverse zone.
pub(crate) async fn sync_created(
    svc: &RecordService,
    user_id: i64,
    forward: &Record,
) -> AppResult<()> {
    if !is_address_type(&forward.rtype) {
        return Ok(());
    }

    let Some(zone) = reverse::resolve(svc.db(), user_id, &forward.rtype, &forward.content).await?
    else {
        debug!(record_id = forward.id, "no reverse zone for record content");
        return Ok(());
    };

    match lookup(svc, &zone).await? {
        PtrLookup::Missing => create_ptr(svc, user_id, &zone, forward).await,
        PtrLookup::Single(existing) => update_ptr(svc, user_id, &existing, &zone, forward).await,
        PtrLookup::Ambiguous => {
            debug!(reverse_name = %zone.reverse_name, "multiple PTR records, leaving them untouched");
            Ok(())
        }
    }
}

/// Re-align the PTR mirror after a forward update, covering moves between
/// reverse zones and type changes away from A/AAAA.
pub(crate) async fn sync_updated(
    svc: &RecordService,
    user_id: i64,
    change: &RecordChange,
) -> AppResult<()> {
    let old = &change.old;
    let new = &change.new;

    // Locate the PTR that mirrored the old state, if any.
    let old_zone = if is_address_type(&old.rtype) {
        reverse::resolve(svc.db(), user_id, &old.rtype, &old.content).await?
    } else {
        None
    };
    let old_ptr = match &old_zone {
        Some(zone) => lookup(svc, zone).await?,
        None => PtrLookup::Missing,
    };

    if !is_address_type(&new.rtype) {
        // The record no longer carries an address; a leftover mirror is stale.
        if let PtrLookup::Single(existing) = old_ptr {
            return delete_ptr(svc, user_id, &existing).await;
        }
        return Ok(());
    }

    let new_zone = reverse::resolve(svc.db(), user_id, &new.rtype, &new.content).await?;

    if let PtrLookup::Single(existing) = old_ptr {
        if let (Some(old_z), Some(new_z)) = (&old_zone, &new_zone) {
            if old_z == new_z {
                // Zone unchanged: refresh the mirror in place.
                return update_ptr(svc, user_id, &existing, new_z, new).await;
            }
        }
        // Zone changed or vanished: the old mirror is stale.
        delete_ptr(svc, user_id, &existing).await?;
        if let Some(zone) = &new_zone {
            return create_ptr(svc, user_id, zone, new).await;
        }
        return Ok(());
    }

    // No usable mirror in the old zone (missing, ambiguous, or no old zone).
    let Some(zone) = &new_zone else {
        return Ok(());
    };
    match lookup(svc, zone).await? {
        PtrLookup::Missing => create_ptr(svc, user_id, zone, new).await,
        PtrLookup::Single(existing) => update_ptr(svc, user_id, &existing, zone, new).await,
        PtrLookup::Ambiguous => {
            debug!(reverse_name = %zone.reverse_name, "multiple PTR records, leaving them untouched");
            Ok(())
        }
    }
}

/// Drop the PTR mirror of a deleted forward record.
pub(crate) async fn sync_deleted(
    svc: &RecordService,
    user_id: i64,
    forward: &Record,
) -> AppResult<()> {
    if !is_address_type(&forward.rtype) {
        return Ok(());
    }

    let Some(zone) = reverse::resolve(svc.db(), user_id, &forward.rtype, &forward.content).await?
    else {
        return Ok(());
    };

    match lookup(svc, &zone).await? {
        PtrLookup::Single(existing) => delete_ptr(svc, user_id, &existing).await,
        PtrLookup::Missing | PtrLookup::Ambiguous => Ok(()),
    }
}
