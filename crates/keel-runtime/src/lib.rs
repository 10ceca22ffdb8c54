//! Keel runtime: the PostgreSQL handle plus the migration and seeder runners.

pub mod db;
pub mod migrations;
pub mod seeders;
pub mod testing;

pub use db::PgDatabase;
pub use migrations::{
    load_migrations_from_dir, MigrationReport, MigrationRunner, MigrationStatus, SqlMigration,
};
pub use seeders::{DependencyGraph, SeederListing, SeederRunner};
pub use testing::MemoryDatabase;
