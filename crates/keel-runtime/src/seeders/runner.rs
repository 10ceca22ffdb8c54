use serde::Serialize;
use tracing::{error, info};

use keel_core::error::{KeelError, Result};
use keel_core::registry::Registry;
use keel_core::seeder::{normalize_seeder_name, Seeder};
use keel_core::store::Database;

use super::graph::DependencyGraph;
use crate::db::abandon;

/// A seeder as shown by [`SeederRunner::list`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeederListing {
    /// 1-based position in execution order.
    pub position: usize,
    pub name: String,
    pub dependencies: Vec<String>,
}

/// Seeders of `registry` in execution order with their dependencies.
///
/// If the graph is invalid the error is logged and registration order is used
/// instead.
pub fn list_seeders(registry: &Registry<dyn Seeder>) -> Vec<SeederListing> {
    let order = match DependencyGraph::from_registry(registry).topological_order() {
        Ok(order) => order,
        Err(e) => {
            error!(error = %e, "Failed to resolve seeder order");
            registry.iter().map(|(name, _)| name.to_string()).collect()
        }
    };

    order
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let dependencies = registry
                .get(&name)
                .map(|s| s.dependencies().iter().map(|d| d.to_string()).collect())
                .unwrap_or_default();
            SeederListing {
                position: i + 1,
                name,
                dependencies,
            }
        })
        .collect()
}

/// Runs registered seeders in dependency order.
pub struct SeederRunner<D: Database> {
    db: D,
    seeders: Registry<dyn Seeder>,
}

impl<D: Database> SeederRunner<D> {
    /// Create a runner; fails if two seeders share a name.
    pub fn new(db: D, seeders: Vec<Box<dyn Seeder>>) -> Result<Self> {
        Ok(Self::from_registry(db, Registry::seeders(seeders)?))
    }

    pub fn from_registry(db: D, seeders: Registry<dyn Seeder>) -> Self {
        Self { db, seeders }
    }

    pub fn db(&self) -> &D {
        &self.db
    }

    pub fn seeders(&self) -> &Registry<dyn Seeder> {
        &self.seeders
    }

    pub fn graph(&self) -> DependencyGraph {
        DependencyGraph::from_registry(&self.seeders)
    }

    /// Run every seeder, or only `target` and its dependencies.
    ///
    /// The order is resolved before anything runs, so an invalid graph runs
    /// nothing. Returns the names of the seeders that ran.
    pub async fn run(&self, target: Option<&str>) -> Result<Vec<String>> {
        let order = match target {
            Some(name) => {
                let name = normalize_seeder_name(name);
                info!(seeder = %name, "Running seeder with its dependencies");
                self.graph().closure_order(&name)?
            }
            None => {
                if self.seeders.is_empty() {
                    info!("No seeders registered");
                    return Ok(Vec::new());
                }
                info!("Running all seeders");
                self.graph().topological_order()?
            }
        };

        for name in &order {
            self.run_one(name)
                .await
                .map_err(|e| KeelError::seeder(name.as_str(), e))?;
        }

        info!(count = order.len(), "All seeders completed successfully");
        Ok(order)
    }

    /// Seeders in execution order with their dependencies.
    pub fn list(&self) -> Vec<SeederListing> {
        list_seeders(&self.seeders)
    }

    async fn run_one(&self, name: &str) -> Result<()> {
        let seeder = self
            .seeders
            .get(name)
            .ok_or_else(|| KeelError::UnknownSeeder(name.to_string()))?;

        info!(name = name, "Running seeder");

        let mut tx = self.db.begin().await?;
        let result = seeder.run(tx.executor()).await;
        if let Err(e) = result {
            abandon(tx).await;
            return Err(e);
        }
        tx.commit().await?;

        info!(name = name, "Seeder completed");
        Ok(())
    }
}
