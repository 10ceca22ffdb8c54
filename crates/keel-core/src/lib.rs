//! Core types for Keel: errors, configuration, work-unit traits and the
//! database handle the migration and seeder runners drive.

pub mod config;
pub mod error;
pub mod migration;
pub mod registry;
pub mod seeder;
pub mod store;

pub use config::KeelConfig;
pub use error::{KeelError, Result};
pub use migration::Migration;
pub use registry::Registry;
pub use seeder::{normalize_seeder_name, Seeder};
pub use store::{Database, Executor, MigrationRecord, Transaction};
