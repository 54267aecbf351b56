use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A single named changeset, loaded from the `migrations` list of the
/// config document. Immutable once loaded; the list order is the only
/// valid apply/rollback order.
#[derive(Debug, Clone, Deserialize)]
pub struct Migration {
    /// Unique name within a run (e.g. "0001_create_users").
    pub name: String,

    /// Path of the "up" SQL body, relative to the file-context root.
    pub up: String,

    /// Path of the "down" SQL body, relative to the file-context root.
    pub down: String,
}

/// A migration recorded as applied in the history table.
///
/// At most one record exists per distinct name; the record is removed
/// again on successful rollback.
#[derive(Debug, Clone)]
pub struct AppliedMigration {
    /// Backend-assigned surrogate key.
    pub id: i64,

    /// Matches a [`Migration`] name.
    pub name: String,

    /// UTC timestamp assigned by the backend at apply time.
    pub applied_at: DateTime<Utc>,
}
