//! Composition root: collects configuration and work units, then hands them
//! to the migration and seeder runners.

use std::path::PathBuf;

use keel_core::config::KeelConfig;
use keel_core::error::{KeelError, Result};
use keel_core::migration::Migration;
use keel_core::registry::Registry;
use keel_core::seeder::Seeder;
use keel_core::store::Database;
use keel_runtime::migrations::{load_migrations_from_dir, MigrationRunner};
use keel_runtime::seeders::SeederRunner;
use keel_runtime::PgDatabase;

/// Prelude module for writing migrations and seeders.
pub mod prelude {
    pub use futures::future::BoxFuture;

    pub use keel_core::config::KeelConfig;
    pub use keel_core::error::{KeelError, Result};
    pub use keel_core::migration::Migration;
    pub use keel_core::seeder::Seeder;
    pub use keel_core::store::Executor;

    pub use crate::{Keel, KeelBuilder};
}

/// Configured set of migrations and seeders.
pub struct Keel {
    config: KeelConfig,
    migrations: Registry<dyn Migration>,
    seeders: Registry<dyn Seeder>,
}

impl Keel {
    /// Create a new builder for configuring Keel.
    pub fn builder() -> KeelBuilder {
        KeelBuilder::new()
    }

    pub fn config(&self) -> &KeelConfig {
        &self.config
    }

    pub fn migrations(&self) -> &Registry<dyn Migration> {
        &self.migrations
    }

    pub fn seeders(&self) -> &Registry<dyn Seeder> {
        &self.seeders
    }

    /// Connect to the configured PostgreSQL database.
    pub async fn connect(&self) -> Result<PgDatabase> {
        let db = PgDatabase::from_config(&self.config).await?;
        db.health_check().await?;
        tracing::debug!("Connected to database");
        Ok(db)
    }

    /// Turn into a migration runner over `db`.
    pub fn into_migrator<D: Database>(self, db: D) -> MigrationRunner<D> {
        MigrationRunner::from_registry(db, self.migrations)
    }

    /// Turn into a seeder runner over `db`.
    pub fn into_seeder<D: Database>(self, db: D) -> SeederRunner<D> {
        SeederRunner::from_registry(db, self.seeders)
    }
}

/// Builder for [`Keel`].
pub struct KeelBuilder {
    config: Option<KeelConfig>,
    migrations_dir: Option<PathBuf>,
    migrations: Vec<Box<dyn Migration>>,
    seeders: Vec<Box<dyn Seeder>>,
}

impl KeelBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            migrations_dir: None,
            migrations: Vec::new(),
            seeders: Vec::new(),
        }
    }

    /// Set the configuration.
    pub fn config(mut self, config: KeelConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Directory to load SQL migrations from.
    ///
    /// Defaults to `migrations.directory` from the configuration. Files are
    /// named `<version>.up.sql` with an optional `<version>.down.sql`.
    pub fn migrations_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.migrations_dir = Some(path.into());
        self
    }

    /// Add a migration.
    pub fn migration(mut self, migration: Box<dyn Migration>) -> Self {
        self.migrations.push(migration);
        self
    }

    pub fn migrations(mut self, migrations: impl IntoIterator<Item = Box<dyn Migration>>) -> Self {
        self.migrations.extend(migrations);
        self
    }

    /// Add a seeder.
    pub fn seeder(mut self, seeder: Box<dyn Seeder>) -> Self {
        self.seeders.push(seeder);
        self
    }

    pub fn seeders(mut self, seeders: impl IntoIterator<Item = Box<dyn Seeder>>) -> Self {
        self.seeders.extend(seeders);
        self
    }

    /// Build, loading SQL migrations and rejecting duplicate versions or names.
    pub fn build(self) -> Result<Keel> {
        let config = self
            .config
            .ok_or_else(|| KeelError::Config("Configuration is required".to_string()))?;

        let dir = self
            .migrations_dir
            .unwrap_or_else(|| PathBuf::from(&config.migrations.directory));

        let mut migrations = self.migrations;
        for migration in load_migrations_from_dir(&dir)? {
            migrations.push(Box::new(migration));
        }

        Ok(Keel {
            migrations: Registry::migrations(migrations)?,
            seeders: Registry::seeders(self.seeders)?,
            config,
        })
    }
}

impl Default for KeelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database;
    use keel_runtime::MemoryDatabase;
    use tempfile::TempDir;

    fn config() -> KeelConfig {
        KeelConfig::default_with_database_url("postgres://localhost/keel_test")
    }

    #[test]
    fn test_build_requires_config() {
        let err = Keel::builder().build().err().unwrap();
        assert!(matches!(err, KeelError::Config(_)));
    }

    #[test]
    fn test_build_merges_sql_migrations() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("2024_02_01_000000_create_orders_table.up.sql"),
            "CREATE TABLE orders (id INT);",
        )
        .unwrap();

        let keel = Keel::builder()
            .config(config())
            .migrations_dir(dir.path())
            .migrations(database::migrations::all())
            .build()
            .unwrap();

        assert_eq!(
            keel.migrations().sorted_keys(),
            vec![
                "2024_01_15_120000_create_users_table",
                "2024_01_15_130000_create_products_table",
                "2024_02_01_000000_create_orders_table",
            ]
        );
    }

    #[test]
    fn test_build_rejects_duplicate_version() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("2024_01_15_120000_create_users_table.up.sql"),
            "CREATE TABLE users (id INT);",
        )
        .unwrap();

        let err = Keel::builder()
            .config(config())
            .migrations_dir(dir.path())
            .migrations(database::migrations::all())
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, KeelError::DuplicateUnit { kind: "migration", .. }));
    }

    #[tokio::test]
    async fn test_migrator_over_memory_database() {
        let dir = TempDir::new().unwrap();
        let db = MemoryDatabase::new();
        let keel = Keel::builder()
            .config(config())
            .migrations_dir(dir.path())
            .migrations(database::migrations::all())
            .build()
            .unwrap();

        let migrator = keel.into_migrator(db.clone());
        let report = migrator.run().await.unwrap();
        assert_eq!(report.count(), 2);

        let reverted = migrator.rollback(1).await.unwrap();
        assert_eq!(reverted, vec!["2024_01_15_130000_create_products_table"]);
        assert_eq!(
            db.statements().last().map(String::as_str),
            Some("DROP TABLE IF EXISTS products")
        );
    }
}
