use serde::{Deserialize, Serialize};

/// A resource record row. `priority` maps to the stored `prio` column
/// (PowerDNS schema convention).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Record {
    pub id: i64,
    pub domain_id: i64,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub rtype: String,
    pub content: String,
    pub ttl: i64,
    #[sqlx(rename = "prio")]
    pub priority: i64,
    pub disabled: bool,
}

impl Record {
    /// True for the forward types that can carry a PTR mirror.
    pub fn is_address_type(&self) -> bool {
        self.rtype == "A" || self.rtype == "AAAA"
    }
}

/// Fields for a new record. `disabled` starts cleared.
#[derive(Debug, Clone, Deserialize)]
pub struct NewRecord {
    pub domain_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub rtype: String,
    pub content: String,
    pub ttl: i64,
    pub priority: i64,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordPatch {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub rtype: Option<String>,
    pub content: Option<String>,
    pub ttl: Option<i64>,
    pub priority: Option<i64>,
    pub disabled: Option<bool>,
}

/// Conjunctive filters for a single-record lookup; `None` means wildcard.
#[derive(Debug, Clone, Default)]
pub struct RecordQuery {
    pub name: Option<String>,
    pub rtype: Option<String>,
    pub content: Option<String>,
    pub priority: Option<i64>,
    pub ttl: Option<i64>,
    pub except_id: Option<i64>,
}

/// Result of an update: the pre-image and post-image rows.
#[derive(Debug, Clone, Serialize)]
pub struct RecordChange {
    pub old: Record,
    pub new: Record,
}

/// Filters for the permission-scoped listing.
#[derive(Debug, Clone, Default)]
pub struct RecordListFilter {
    /// Restrict to these domain ids; `None` means all visible domains.
    pub domains: Option<Vec<i64>>,
    /// Restrict to these record types.
    pub types: Option<Vec<String>>,
    /// Substring match on the record name.
    pub query_name: Option<String>,
    /// Substring match on the record content.
    pub query_content: Option<String>,
    /// Sort expression, `field-asc,field2-desc`.
    pub sort: Option<String>,
}
