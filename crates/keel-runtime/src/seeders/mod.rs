//! Seeder dependency resolution and execution.

mod graph;
mod runner;

pub use graph::DependencyGraph;
pub use runner::{list_seeders, SeederListing, SeederRunner};
