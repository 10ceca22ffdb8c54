use futures::future::BoxFuture;

use crate::error::Result;
use crate::store::Executor;

/// A versioned schema change.
///
/// Versions follow `YYYY_MM_DD_HHMMSS_name`; plain string ordering of the
/// version decides the order in which pending migrations are applied, so every
/// component must be zero padded.
pub trait Migration: Send + Sync {
    /// Unique, sortable identifier.
    fn version(&self) -> &str;

    /// Human-readable summary stored in the ledger.
    fn description(&self) -> &str;

    /// Apply the change.
    fn up<'a>(&'a self, db: &'a mut dyn Executor) -> BoxFuture<'a, Result<()>>;

    /// Revert the change.
    fn down<'a>(&'a self, db: &'a mut dyn Executor) -> BoxFuture<'a, Result<()>>;
}

impl std::fmt::Debug for dyn Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version())
            .field("description", &self.description())
            .finish()
    }
}
