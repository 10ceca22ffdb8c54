use chrono::{DateTime, Utc};
use serde::Serialize;

/// A row of the migration ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRecord {
    /// Surrogate key, increasing in insertion order.
    pub id: i64,
    pub version: String,
    pub description: String,
    /// When the migration was applied (UTC).
    pub applied_at: DateTime<Utc>,
}
