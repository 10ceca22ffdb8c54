use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Postgres;

use keel_core::config::KeelConfig;
use keel_core::error::{KeelError, Result};
use keel_core::store::{Database, Executor, MigrationRecord, Transaction};

/// PostgreSQL database handle backed by a connection pool.
#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
    /// Migration ledger table name.
    ledger_table: String,
}

impl PgDatabase {
    /// Connect using the database and ledger settings from `config`.
    pub async fn from_config(config: &KeelConfig) -> Result<Self> {
        let pool = Self::create_pool(
            &config.database.url,
            config.database.pool_size,
            config.database.pool_timeout_secs,
        )
        .await
        .map_err(|e| KeelError::Database(format!("Failed to connect to database: {}", e)))?;

        Self::new(pool, &config.migrations.table)
    }

    /// Wrap an existing pool.
    pub fn new(pool: PgPool, ledger_table: &str) -> Result<Self> {
        if !is_valid_table_name(ledger_table) {
            return Err(KeelError::Config(format!(
                "Invalid migration table name: {:?}",
                ledger_table
            )));
        }

        Ok(Self {
            pool,
            ledger_table: ledger_table.to_string(),
        })
    }

    /// Create a connection pool with the given parameters.
    async fn create_pool(url: &str, size: u32, timeout_secs: u64) -> sqlx::Result<PgPool> {
        PgPoolOptions::new()
            .max_connections(size)
            .acquire_timeout(Duration::from_secs(timeout_secs))
            .connect(url)
            .await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn ledger_table(&self) -> &str {
        &self.ledger_table
    }

    /// Check database connectivity.
    pub async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| KeelError::Database(format!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Close all connections gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn fetch_records(&self, sql: &str, limit: Option<i64>) -> Result<Vec<MigrationRecord>> {
        let mut query = sqlx::query_as::<_, (i64, String, String, DateTime<Utc>)>(sql);
        if let Some(limit) = limit {
            query = query.bind(limit);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(|e| {
            KeelError::Database(format!("Failed to get applied migrations: {}", e))
        })?;

        Ok(rows
            .into_iter()
            .map(|(id, version, description, applied_at)| MigrationRecord {
                id,
                version,
                description,
                applied_at,
            })
            .collect())
    }
}

impl Database for PgDatabase {
    fn ensure_ledger(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let sql = format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id BIGSERIAL PRIMARY KEY,
                    version TEXT UNIQUE NOT NULL,
                    description TEXT NOT NULL,
                    applied_at TIMESTAMPTZ NOT NULL
                )
                "#,
                self.ledger_table
            );

            sqlx::query(&sql).execute(&self.pool).await.map_err(|e| {
                KeelError::Database(format!("Failed to create migrations table: {}", e))
            })?;
            Ok(())
        })
    }

    fn applied_migrations(&self) -> BoxFuture<'_, Result<Vec<MigrationRecord>>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT id, version, description, applied_at FROM {} ORDER BY applied_at ASC, id ASC",
                self.ledger_table
            );
            self.fetch_records(&sql, None).await
        })
    }

    fn latest_migrations(&self, limit: usize) -> BoxFuture<'_, Result<Vec<MigrationRecord>>> {
        Box::pin(async move {
            let sql = format!(
                "SELECT id, version, description, applied_at FROM {} ORDER BY applied_at DESC, id DESC LIMIT $1",
                self.ledger_table
            );
            self.fetch_records(&sql, Some(sql_limit(limit))).await
        })
    }

    fn begin(&self) -> BoxFuture<'_, Result<Box<dyn Transaction>>> {
        Box::pin(async move {
            let tx = self.pool.begin().await.map_err(|e| {
                KeelError::Database(format!("Failed to start transaction: {}", e))
            })?;

            Ok(Box::new(PgTransaction {
                tx,
                ledger_table: self.ledger_table.clone(),
            }) as Box<dyn Transaction>)
        })
    }
}

/// A pooled connection inside `BEGIN ... COMMIT`.
struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
    ledger_table: String,
}

impl Executor for PgTransaction {
    fn execute<'a>(&'a mut self, sql: &'a str) -> BoxFuture<'a, Result<u64>> {
        Box::pin(async move {
            let result = sqlx::query(sql).execute(&mut *self.tx).await?;
            Ok(result.rows_affected())
        })
    }

    fn fetch_count<'a>(&'a mut self, sql: &'a str) -> BoxFuture<'a, Result<i64>> {
        Box::pin(async move {
            let count = sqlx::query_scalar::<_, i64>(sql)
                .fetch_one(&mut *self.tx)
                .await?;
            Ok(count)
        })
    }
}

impl Transaction for PgTransaction {
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
            let sql = format!(
                "INSERT INTO {} (version, description, applied_at) VALUES ($1, $2, $3)",
                self.ledger_table
            );
            sqlx::query(&sql)
                .bind(version)
                .bind(description)
                .bind(applied_at)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| KeelError::Database(format!("Failed to record migration: {}", e)))?;
            Ok(())
        })
    }

    fn forget_migration<'a>(&'a mut self, version: &'a str) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let sql = format!("DELETE FROM {} WHERE version = $1", self.ledger_table);
            sqlx::query(&sql)
                .bind(version)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| {
                    KeelError::Database(format!("Failed to remove migration record: {}", e))
                })?;
            Ok(())
        })
    }

    fn commit(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            let this = *self;
            this.tx
                .commit()
                .await
                .map_err(|e| KeelError::Database(format!("Failed to commit transaction: {}", e)))
        })
    }

    fn rollback(self: Box<Self>) -> BoxFuture<'static, Result<()>> {
        Box::pin(async move {
            let this = *self;
            this.tx.rollback().await.map_err(|e| {
                KeelError::Database(format!("Failed to roll back transaction: {}", e))
            })
        })
    }
}

/// `LIMIT` takes a BIGINT; anything larger means "no limit".
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

/// Accept `table` or `schema.table` made of ASCII identifier characters.
fn is_valid_table_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lazy_pool() -> PgPool {
        PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy("postgres://localhost/test")
            .expect("Failed to create lazy pool")
    }

    #[test]
    fn test_table_name_validation() {
        assert!(is_valid_table_name("migration_records"));
        assert!(is_valid_table_name("public.migration_records"));
        assert!(is_valid_table_name("_ledger2"));
        assert!(!is_valid_table_name(""));
        assert!(!is_valid_table_name("2ledger"));
        assert!(!is_valid_table_name("ledger; DROP TABLE users"));
        assert!(!is_valid_table_name("a.b.c"));
    }

    #[test]
    fn test_sql_limit_saturates() {
        assert_eq!(sql_limit(0), 0);
        assert_eq!(sql_limit(5), 5);
        assert_eq!(sql_limit(usize::MAX), i64::MAX);
    }

    #[tokio::test]
    async fn test_rejects_invalid_ledger_table() {
        let err = PgDatabase::new(lazy_pool(), "bad name").err().unwrap();
        assert!(matches!(err, KeelError::Config(_)));
    }

    #[tokio::test]
    async fn test_keeps_ledger_table() {
        let db = PgDatabase::new(lazy_pool(), "schema_ledger").unwrap();
        assert_eq!(db.ledger_table(), "schema_ledger");
    }

    // Runs only when TEST_DATABASE_URL points at a disposable database.
    #[tokio::test]
    async fn test_ledger_round_trip_against_postgres() {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            return;
        };

        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .unwrap();
        let db = PgDatabase::new(pool, "keel_test_migration_records").unwrap();
        sqlx::query("DROP TABLE IF EXISTS keel_test_migration_records")
            .execute(db.pool())
            .await
            .unwrap();

        db.health_check().await.unwrap();
        db.ensure_ledger().await.unwrap();
        db.ensure_ledger().await.unwrap();

        let mut tx = db.begin().await.unwrap();
        tx.record_migration("2024_01_01_000000_a", "A", Utc::now())
            .await
            .unwrap();
        tx.rollback().await.unwrap();
        assert!(db.applied_migrations().await.unwrap().is_empty());

        let mut tx = db.begin().await.unwrap();
        tx.record_migration("2024_01_01_000000_a", "A", Utc::now())
            .await
            .unwrap();
        assert_eq!(tx.fetch_count("SELECT 42::BIGINT").await.unwrap(), 42);
        tx.commit().await.unwrap();

        let latest = db.latest_migrations(5).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].version, "2024_01_01_000000_a");
        assert_eq!(db.latest_migrations(usize::MAX).await.unwrap().len(), 1);

        let mut tx = db.begin().await.unwrap();
        tx.forget_migration("2024_01_01_000000_a").await.unwrap();
        tx.commit().await.unwrap();
        assert!(db.applied_migrations().await.unwrap().is_empty());

        sqlx::query("DROP TABLE keel_test_migration_records")
            .execute(db.pool())
            .await
            .unwrap();
    }
}
