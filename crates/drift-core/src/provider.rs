use async_trait::async_trait;

use crate::error::Result;
use crate::migration::AppliedMigration;

/// Backend contract for a database engine.
///
/// A provider can list the migrations recorded as applied, and apply or
/// roll back a single named changeset. Apply and rollback are atomic:
/// the changeset's statements and the history bookkeeping either all
/// take effect or none do.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Return every migration currently recorded as applied, creating
    /// the history table first if it does not exist.
    ///
    /// A pre-existing table with the wrong shape surfaces as an error,
    /// never as a silent empty set.
    async fn applied_migrations(&self) -> Result<Vec<AppliedMigration>>;

    /// Execute the changeset body and insert the history record, as a
    /// single transaction.
    async fn apply(&self, name: &str, content: &str) -> Result<()>;

    /// Execute the "down" body and delete the history record, as a
    /// single transaction.
    async fn rollback(&self, name: &str, content: &str) -> Result<()>;
}
