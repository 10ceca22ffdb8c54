//! Keel - versioned schema migrations and dependency-ordered seeders for
//! PostgreSQL.

pub mod database;
pub mod logging;
mod runtime;

pub use keel_core;
pub use keel_runtime;

pub use runtime::prelude;
pub use runtime::{Keel, KeelBuilder};
