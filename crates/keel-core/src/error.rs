use thiserror::Error;

/// Core error type for Keel operations.
#[derive(Error, Debug)]
pub enum KeelError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Duplicate {kind} registered: {id}")]
    DuplicateUnit { kind: &'static str, id: String },

    #[error("migration {0} not found in registered migrations")]
    UnknownMigration(String),

    #[error("seeder {0} not found")]
    UnknownSeeder(String),

    #[error("migration {0} has no down migration")]
    IrreversibleMigration(String),

    #[error("seeder {seeder} depends on {dependency} but {dependency} not found")]
    MissingDependency { seeder: String, dependency: String },

    #[error("circular dependency detected involving {}", .involving.join(", "))]
    CircularDependency { involving: Vec<String> },

    #[error("migration {version} failed: {source}")]
    Migration {
        version: String,
        #[source]
        source: Box<KeelError>,
    },

    #[error("rollback failed for migration {version}: {source}")]
    Rollback {
        version: String,
        #[source]
        source: Box<KeelError>,
    },

    #[error("seeder {name} failed: {source}")]
    Seeder {
        name: String,
        #[source]
        source: Box<KeelError>,
    },
}

impl KeelError {
    /// Wrap an error raised while applying `version`.
    pub fn migration(version: impl Into<String>, source: KeelError) -> Self {
        Self::Migration {
            version: version.into(),
            source: Box::new(source),
        }
    }

    /// Wrap an error raised while rolling back `version`.
    pub fn rollback(version: impl Into<String>, source: KeelError) -> Self {
        Self::Rollback {
            version: version.into(),
            source: Box::new(source),
        }
    }

    /// Wrap an error raised while running seeder `name`.
    pub fn seeder(name: impl Into<String>, source: KeelError) -> Self {
        Self::Seeder {
            name: name.into(),
            source: Box::new(source),
        }
    }
}

/// Result type alias using KeelError.
pub type Result<T> = std::result::Result<T, KeelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dependency_names_both_seeders() {
        let err = KeelError::MissingDependency {
            seeder: "ProductSeeder".to_string(),
            dependency: "GhostSeeder".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "seeder ProductSeeder depends on GhostSeeder but GhostSeeder not found"
        );
    }

    #[test]
    fn test_circular_dependency_lists_nodes() {
        let err = KeelError::CircularDependency {
            involving: vec!["ASeeder".to_string(), "BSeeder".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "circular dependency detected involving ASeeder, BSeeder"
        );
    }

    #[test]
    fn test_migration_error_keeps_cause() {
        let err = KeelError::migration(
            "2024_01_01_000000_a",
            KeelError::Database("relation exists".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "migration 2024_01_01_000000_a failed: Database error: relation exists"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
