//! Applies, rolls back and reports migrations against the ledger.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use keel_core::error::{KeelError, Result};
use keel_core::migration::Migration;
use keel_core::registry::Registry;
use keel_core::store::{Database, MigrationRecord};

use crate::db::abandon;

/// Outcome of applying pending migrations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Versions applied by this run, in order.
    pub applied: Vec<String>,
}

impl MigrationReport {
    pub fn count(&self) -> usize {
        self.applied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum MigrationState {
    Applied { applied_at: DateTime<Utc> },
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatusEntry {
    pub version: String,
    pub description: String,
    #[serde(flatten)]
    pub state: MigrationState,
}

impl MigrationStatusEntry {
    pub fn is_applied(&self) -> bool {
        matches!(self.state, MigrationState::Applied { .. })
    }
}

/// Applied/pending state of every registered migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    /// One entry per registered migration, ascending by version.
    pub entries: Vec<MigrationStatusEntry>,
    /// Ledger rows with no registered migration.
    pub orphaned: Vec<MigrationRecord>,
    pub applied_count: usize,
    pub pending_count: usize,
    pub total: usize,
}

/// Runs registered migrations against a database.
pub struct MigrationRunner<D: Database> {
    db: D,
    migrations: Registry<dyn Migration>,
}

impl<D: Database> MigrationRunner<D> {
    /// Create a runner; fails if two migrations share a version.
    pub fn new(db: D, migrations: Vec<Box<dyn Migration>>) -> Result<Self> {
        Ok(Self::from_registry(db, Registry::migrations(migrations)?))
    }

    pub fn from_registry(db: D, migrations: Registry<dyn Migration>) -> Self {
        Self { db, migrations }
    }

    pub fn db(&self) -> &D {
        &self.db
    }

    pub fn migrations(&self) -> &Registry<dyn Migration> {
        &self.migrations
    }

    /// Apply every registered migration not yet in the ledger, oldest version
    /// first. Stops at the first failure; earlier migrations stay applied.
    pub async fn run(&self) -> Result<MigrationReport> {
        self.db.ensure_ledger().await?;

        let applied: HashSet<String> = self
            .db
            .applied_migrations()
            .await?
            .into_iter()
            .map(|r| r.version)
            .collect();
        debug!("Already applied migrations: {:?}", applied);

        let pending: Vec<&str> = self
            .migrations
            .sorted_keys()
            .into_iter()
            .filter(|version| !applied.contains(*version))
            .collect();

        if pending.is_empty() {
            info!("No pending migrations found");
            return Ok(MigrationReport::default());
        }

        let mut report = MigrationReport::default();
        for version in pending {
            let Some(migration) = self.migrations.get(version) else {
                continue;
            };
            self.apply(migration)
                .await
                .map_err(|e| KeelError::migration(version, e))?;
            report.applied.push(version.to_string());
        }

        info!(count = report.count(), "All migrations completed successfully");
        Ok(report)
    }

    /// Revert the `count` most recently applied migrations, newest first.
    ///
    /// Asking for more than were applied reverts all of them.
    pub async fn rollback(&self, count: usize) -> Result<Vec<String>> {
        if count == 0 {
            return Err(KeelError::InvalidArgument(
                "rollback count must be greater than 0".to_string(),
            ));
        }

        self.db.ensure_ledger().await?;

        let records = self.db.latest_migrations(count).await?;
        if records.is_empty() {
            info!("No migrations to rollback");
            return Ok(Vec::new());
        }
        if records.len() < count {
            warn!(
                requested = count,
                available = records.len(),
                "Requested more rollbacks than applied migrations"
            );
        }

        let mut reverted = Vec::with_capacity(records.len());
        for record in records {
            let migration = self
                .migrations
                .get(&record.version)
                .ok_or_else(|| KeelError::UnknownMigration(record.version.clone()))?;

            self.revert(migration)
                .await
                .map_err(|e| KeelError::rollback(record.version.as_str(), e))?;
            reverted.push(record.version);
        }

        info!(count = reverted.len(), "Rollback completed successfully");
        Ok(reverted)
    }

    /// Report which registered migrations are applied.
    pub async fn status(&self) -> Result<MigrationStatus> {
        self.db.ensure_ledger().await?;

        let records = self.db.applied_migrations().await?;
        let applied_at: HashMap<&str, DateTime<Utc>> = records
            .iter()
            .map(|r| (r.version.as_str(), r.applied_at))
            .collect();

        let entries: Vec<MigrationStatusEntry> = self
            .migrations
            .sorted_keys()
            .into_iter()
            .filter_map(|version| {
                let migration = self.migrations.get(version)?;
                let state = match applied_at.get(version) {
                    Some(&at) => MigrationState::Applied { applied_at: at },
                    None => MigrationState::Pending,
                };
                Some(MigrationStatusEntry {
                    version: version.to_string(),
                    description: migration.description().to_string(),
                    state,
                })
            })
            .collect();

        let orphaned: Vec<MigrationRecord> = records
            .iter()
            .filter(|r| !self.migrations.contains(&r.version))
            .cloned()
            .collect();

        let applied_count = entries.iter().filter(|e| e.is_applied()).count();
        let total = entries.len();

        Ok(MigrationStatus {
            entries,
            orphaned,
            applied_count,
            pending_count: total - applied_count,
            total,
        })
    }

    async fn apply(&self, migration: &dyn Migration) -> Result<()> {
        info!(
            version = migration.version(),
            description = migration.description(),
            "Running migration"
        );

        let mut tx = self.db.begin().await?;

        let result = migration.up(tx.executor()).await;
        let result = match result {
            Ok(()) => {
                tx.record_migration(migration.version(), migration.description(), Utc::now())
                    .await
            }
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            abandon(tx).await;
            return Err(e);
        }

        tx.commit().await?;
        info!(version = migration.version(), "Migration completed");
        Ok(())
    }

    async fn revert(&self, migration: &dyn Migration) -> Result<()> {
        info!(
            version = migration.version(),
            description = migration.description(),
            "Rolling back migration"
        );

        let mut tx = self.db.begin().await?;

        let result = migration.down(tx.executor()).await;
        let result = match result {
            Ok(()) => tx.forget_migration(migration.version()).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            abandon(tx).await;
            return Err(e);
        }

        tx.commit().await?;
        info!(version = migration.version(), "Rollback completed");
        Ok(())
    }
}
