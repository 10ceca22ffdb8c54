//! Database handle abstraction consumed by the migration and seeder runners.
//!
//! Work units only ever see an [`Executor`]. The runners additionally use a
//! [`Transaction`] to keep the migration ledger in step with each unit, and a
//! [`Database`] to open transactions and read the ledger.

mod record;

pub use record::MigrationRecord;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

use crate::error::Result;

/// Statement execution within a transaction.
pub trait Executor: Send {
    /// Execute a single statement, returning the number of affected rows.
    fn execute<'a>(&'a mut self, sql: &'a str) -> BoxFuture<'a, Result<u64>>;

    /// Run a query returning a single integer (typically `SELECT COUNT(*) ...`).
    fn fetch_count<'a>(&'a mut self, sql: &'a str) -> BoxFuture<'a, Result<i64>>;
}

/// An open transaction.
///
/// Dropping a transaction without calling [`Transaction::commit`] rolls it back.
pub trait Transaction: Executor {
    /// View this transaction as the executor handed to work units.
    fn executor(&mut self) -> &mut dyn Executor;

    /// Insert a ledger row for an applied migration.
    fn record_migration<'a>(
        &'a mut self,
        version: &'a str,
        description: &'a str,
        applied_at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<()>>;

    /// Delete the ledger row for `version`.
    fn forget_migration<'a>(&'a mut self, version: &'a str) -> BoxFuture<'a, Result<()>>;

    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<()>>;

    fn rollback(self: Box<Self>) -> BoxFuture<'static, Result<()>>;
}

/// Shared database handle.
pub trait Database: Send + Sync {
    /// Create the migration ledger table if it does not exist.
    fn ensure_ledger(&self) -> BoxFuture<'_, Result<()>>;

    /// All ledger rows, oldest application first.
    fn applied_migrations(&self) -> BoxFuture<'_, Result<Vec<MigrationRecord>>>;

    /// Up to `limit` ledger rows, most recently applied first.
    fn latest_migrations(&self, limit: usize) -> BoxFuture<'_, Result<Vec<MigrationRecord>>>;

    /// Begin a new transaction.
    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn Transaction>>>;
}
