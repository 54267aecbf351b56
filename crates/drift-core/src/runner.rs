use std::collections::{HashMap, HashSet};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::migration::{AppliedMigration, Migration};
use crate::provider::Provider;
use crate::reader::ChangesetReader;

/// Drives a provider across an ordered migration list.
///
/// The runner never reorders the list: forward for apply, reverse for
/// rollback. The applied set is fetched once per run and consulted for
/// membership only; ordering comes entirely from the list. One
/// migration runs at a time, by design.
pub struct Runner<'a> {
    provider: &'a dyn Provider,
    reader: &'a dyn ChangesetReader,
    cancel: CancellationToken,
}

impl<'a> Runner<'a> {
    pub fn new(provider: &'a dyn Provider, reader: &'a dyn ChangesetReader) -> Self {
        Self {
            provider,
            reader,
            cancel: CancellationToken::new(),
        }
    }

    /// Abort the run between migrations when `cancel` fires. An
    /// interrupted run surfaces as [`Error::Interrupted`]; the migration
    /// in flight either commits or rolls back whole.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Apply every unapplied migration in list order.
    ///
    /// Stops successfully after applying `target` when one is given; a
    /// target that never matches is not an error, the whole list is
    /// processed. Any failure halts the run: earlier migrations stay
    /// applied, later ones are not attempted.
    pub async fn apply(&self, migrations: &[Migration], target: Option<&str>) -> Result<()> {
        let applied = applied_names(self.provider.applied_migrations().await?);

        for migration in migrations {
            self.checkpoint()?;

            if applied.contains(migration.name.as_str()) {
                info!("Already applied, skipping: {}", migration.name);
                continue;
            }

            info!("Applying {}...", migration.name);

            let content = self.reader.read(&migration.up)?;
            self.provider.apply(&migration.name, &content).await?;

            info!("Applied {}", migration.name);

            if target == Some(migration.name.as_str()) {
                return Ok(());
            }
        }

        if let Some(target) = target {
            warn!(
                "Target '{}' not reached; the whole list was processed",
                target
            );
        }

        Ok(())
    }

    /// Roll back every applied migration in reverse list order.
    ///
    /// The mirror of [`Runner::apply`]: a migration is only acted on if
    /// it is present in the applied set, and the `down` body is executed
    /// instead of `up`. Target-stop semantics are identical.
    pub async fn rollback(&self, migrations: &[Migration], target: Option<&str>) -> Result<()> {
        let applied = applied_names(self.provider.applied_migrations().await?);

        for migration in migrations.iter().rev() {
            self.checkpoint()?;

            if !applied.contains(migration.name.as_str()) {
                info!("Not applied, skipping: {}", migration.name);
                continue;
            }

            info!("Rolling back {}...", migration.name);

            let content = self.reader.read(&migration.down)?;
            self.provider.rollback(&migration.name, &content).await?;

            info!("Rolled back {}", migration.name);

            if target == Some(migration.name.as_str()) {
                return Ok(());
            }
        }

        if let Some(target) = target {
            warn!(
                "Target '{}' not reached; the whole list was processed",
                target
            );
        }

        Ok(())
    }

    /// Read-only pairing of the migration list with the applied set.
    pub async fn status(&self, migrations: &[Migration]) -> Result<MigrationStatus> {
        let records = self.provider.applied_migrations().await?;
        let mut by_name: HashMap<String, AppliedMigration> = records
            .into_iter()
            .map(|record| (record.name.clone(), record))
            .collect();

        let mut applied = Vec::new();
        let mut pending = Vec::new();

        for migration in migrations {
            match by_name.remove(&migration.name) {
                Some(record) => applied.push(record),
                None => pending.push(migration.name.clone()),
            }
        }

        let mut unknown: Vec<AppliedMigration> = by_name.into_values().collect();
        unknown.sort_by_key(|record| record.id);

        Ok(MigrationStatus {
            applied,
            pending,
            unknown,
        })
    }

    fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(Error::Interrupted);
        }
        Ok(())
    }
}

/// Result of [`Runner::status`].
#[derive(Debug)]
pub struct MigrationStatus {
    /// Applied migrations that match a descriptor, in list order.
    pub applied: Vec<AppliedMigration>,

    /// Descriptor names with no applied record, in list order.
    pub pending: Vec<String>,

    /// Applied records matching no descriptor. Usually a sign of a
    /// stale or renamed migration list.
    pub unknown: Vec<AppliedMigration>,
}

fn applied_names(records: Vec<AppliedMigration>) -> HashSet<String> {
    records.into_iter().map(|record| record.name).collect()
}
