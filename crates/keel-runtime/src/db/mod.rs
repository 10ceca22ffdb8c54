mod pool;

pub use pool::PgDatabase;

use keel_core::store::Transaction;

/// Roll back `tx`, logging rather than returning a rollback failure so the
/// error that triggered it is the one reported.
pub(crate) async fn abandon(tx: Box<dyn Transaction>) {
    if let Err(e) = tx.rollback().await {
        tracing::warn!("Failed to roll back transaction: {}", e);
    }
}
