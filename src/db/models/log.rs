use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LogEntry {
    pub id: i64,
    pub domain_id: i64,
    pub user_id: i64,
    pub timestamp: DateTime<Utc>,
    pub log: String,
}
