//! Migration runner and SQL-file migrations.

mod runner;
mod sql;

pub use runner::{
    MigrationReport, MigrationRunner, MigrationState, MigrationStatus, MigrationStatusEntry,
};
pub use sql::{describe_version, execute_script, load_migrations_from_dir, SqlMigration};
