use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;

use keel_core::error::{KeelError, Result};
use keel_core::store::{Database, Executor, MigrationRecord, Transaction};

/// In-memory database handle for tests.
///
/// Statements are not interpreted: committed statements are journaled in
/// order, ledger rows are kept in a list, and counting queries answer from
/// values set with [`MemoryDatabase::set_count`]. Work staged in a transaction
/// only becomes visible on commit.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    ledger_ready: bool,
    records: Vec<MigrationRecord>,
    next_id: i64,
    statements: Vec<String>,
    counts: HashMap<String, i64>,
    failures: Vec<String>,
    commits: usize,
    rollbacks: usize,
}

impl MemoryState {
    fn check_failure(&self, sql: &str) -> Result<()> {
        match self.failures.iter().find(|pattern| sql.contains(pattern.as_str())) {
            Some(pattern) => Err(KeelError::Database(format!(
                "injected failure matching {:?}",
                pattern
            ))),
            None => Ok(()),
        }
    }

    fn insert_record(&mut self, version: String, description: String, applied_at: DateTime<Utc>) {
        self.next_id += 1;
        self.records.push(MigrationRecord {
            id: self.next_id,
            version,
            description,
            applied_at,
        });
    }
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Committed statements, in commit order.
    pub fn statements(&self) -> Vec<String> {
        self.state().statements.clone()
    }

    /// Versions present in the ledger, in insertion order.
    pub fn applied_versions(&self) -> Vec<String> {
        self.state()
            .records
            .iter()
            .map(|r| r.version.clone())
            .collect()
    }

    /// Whether the ledger table has been created.
    pub fn ledger_ready(&self) -> bool {
        self.state().ledger_ready
    }

    /// Insert a ledger row directly, creating the ledger if needed.
    pub fn insert_record(&self, version: &str, description: &str, applied_at: DateTime<Utc>) {
        let mut state = self.state();
        state.ledger_ready = true;
        state.insert_record(version.to_string(), description.to_string(), applied_at);
    }

    /// Answer `fetch_count(sql)` with `count`.
    pub fn set_count(&self, sql: &str, count: i64) {
        self.state().counts.insert(sql.to_string(), count);
    }

    /// Fail every statement containing `pattern`.
    pub fn fail_on(&self, pattern: &str) {
        self.state().failures.push(pattern.to_string());
    }

    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    pub fn commits(&self) -> usize {
        self.state().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.state().rollbacks
    }
}

impl Database for MemoryDatabase {
    fn ensure_ledger(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.state().ledger_ready = true;
            Ok(())
        })
    }

    fn applied_migrations(&self) -> BoxFuture<'_, Result<Vec<MigrationRecord>>> {
        Box::pin(async move {
            let state = self.state();
            if !state.ledger_ready {
                return Err(KeelError::Database(
                    "relation \"migration_records\" does not exist".to_string(),
                ));
            }
            let mut records = state.records.clone();
            records.sort_by(|a, b| (a.applied_at, a.id).cmp(&(b.applied_at, b.id)));
            Ok(records)
        })
    }

    fn latest_migrations(&self, limit: usize) -> BoxFuture<'_, Result<Vec<MigrationRecord>>> {
        Box::pin(async move {
            let mut records = self.applied_migrations().await?;
            records.reverse();
            records.truncate(limit);
            Ok(records)
        })
    }

    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn Transaction>>> {
        Box::pin(async move {
            Ok(Box::new(MemoryTransaction {
                db: self.clone(),
                staged: Vec::new(),
            }) as Box<dyn Transaction>)
        })
    }
}

enum Staged {
    Statement(String),
    Record {
        version: String,
        description: String,
        applied_at: DateTime<Utc>,
    },
    Forget(String),
}

/// Transaction over a [`MemoryDatabase`]; dropped without commit, its staged
/// work is discarded.
struct MemoryTransaction {
    db: MemoryDatabase,
    staged: Vec<Staged>,
}

impl MemoryTransaction {
    fn is_recorded(&self, version: &str) -> bool {
        let committed = self.db.state().records.iter().any(|r| r.version == version);
        let mut present = committed;
        for staged in &self.staged {
            match staged {
                Staged::Record { version: v, .. } if v == version => present = true,
                Staged::Forget(v) if v == version => present = false,
                _ => {}
            }
        }
        present
    }
}

impl Executor for MemoryTransaction {
    fn execute<'a>(&'a mut self, sql: &'a str) -> BoxFuture<'a, Result<u64>> {
        Box::pin(async move {
            self.db.state().check_failure(sql)?;
            self.staged.push(Staged::Statement(sql.to_string()));
            Ok(0)
        })
    }

    fn fetch_count<'a>(&'a mut self, sql: &'a str) -> BoxFuture<'a, Result<i64>> {
        Box::pin(async move {
            let state = self.db.state();
            state.check_failure(sql)?;
            Ok(state.counts.get(sql).copied().unwrap_or(0))
        })
    }
}

impl Transaction for MemoryTransaction {
    fn executor(&mut self) -> &mut dyn Executor {
        self
    }

    fn record_migration<'a>(
        &'a mut self,
        version: &'a str,
        description: &'a str,
        applied_at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if !self.db.ledger_ready() {
                return Err(KeelError::Database(
                    "relation \"migration_records\" does not exist".to_string(),
                ));
            }
            if self.is_recorded(version) {
                return Err(KeelError::Database(format!(
                    "duplicate key value violates unique constraint: version {}",
                    version
                )));
            }
            self.staged.push(Staged::Record {
                version: version.to_string(),
                description: description.to_string(),
                applied_at,
            });
            Ok(())
        })
    }

    fn forget_migration<'a>(&'a mut self, version: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.staged.push(Staged::Forget(version.to_string()));
            Ok(())
        })
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            let this = *self;
            let mut state = this.db.state();
            for staged in this.staged {
                match staged {
                    Staged::Statement(sql) => state.statements.push(sql),
                    Staged::Record {
                        version,
                        description,
                        applied_at,
                    } => state.insert_record(version, description, applied_at),
                    Staged::Forget(version) => state.records.retain(|r| r.version != version),
                }
            }
            state.commits += 1;
            Ok(())
        })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            self.db.state().rollbacks += 1;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_publishes_staged_work() {
        let db = MemoryDatabase::new();
        db.ensure_ledger().await.unwrap();

        let mut tx = db.begin().await.unwrap();
        tx.execute("CREATE TABLE t (id INT)").await.unwrap();
        tx.record_migration("v1", "first", Utc::now()).await.unwrap();
        assert!(db.statements().is_empty());
        tx.commit().await.unwrap();

        assert_eq!(db.statements(), vec!["CREATE TABLE t (id INT)"]);
        assert_eq!(db.applied_versions(), vec!["v1"]);
        assert_eq!(db.commits(), 1);
    }

    #[tokio::test]
    async fn test_rollback_and_drop_discard_work() {
        let db = MemoryDatabase::new();
        db.ensure_ledger().await.unwrap();

        let mut tx = db.begin().await.unwrap();
        tx.execute("INSERT 1").await.unwrap();
        tx.rollback().await.unwrap();

        {
            let mut tx = db.begin().await.unwrap();
            tx.execute("INSERT 2").await.unwrap();
        }

        assert!(db.statements().is_empty());
        assert_eq!(db.rollbacks(), 1);
        assert_eq!(db.commits(), 0);
    }

    #[tokio::test]
    async fn test_ledger_must_exist() {
        let db = MemoryDatabase::new();
        assert!(db.applied_migrations().await.is_err());

        let mut tx = db.begin().await.unwrap();
        assert!(tx.record_migration("v1", "x", Utc::now()).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_version_rejected() {
        let db = MemoryDatabase::new();
        db.insert_record("v1", "first", Utc::now());

        let mut tx = db.begin().await.unwrap();
        let err = tx.record_migration("v1", "again", Utc::now()).await.unwrap_err();
        assert!(err.to_string().contains("duplicate key"));
    }

    #[tokio::test]
    async fn test_latest_orders_by_applied_at() {
        let db = MemoryDatabase::new();
        let base = Utc::now();
        db.insert_record("b", "", base);
        db.insert_record("a", "", base + chrono::Duration::seconds(10));
        db.insert_record("c", "", base + chrono::Duration::seconds(5));

        let latest: Vec<String> = db
            .latest_migrations(2)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.version)
            .collect();
        assert_eq!(latest, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn test_counts_and_failures() {
        let db = MemoryDatabase::new();
        db.set_count("SELECT COUNT(*) FROM users", 3);
        db.fail_on("DROP");

        let mut tx = db.begin().await.unwrap();
        assert_eq!(tx.fetch_count("SELECT COUNT(*) FROM users").await.unwrap(), 3);
        assert_eq!(tx.fetch_count("SELECT COUNT(*) FROM other").await.unwrap(), 0);
        assert!(tx.execute("DROP TABLE users").await.is_err());

        db.clear_failures();
        assert!(tx.execute("DROP TABLE users").await.is_ok());
    }
}
