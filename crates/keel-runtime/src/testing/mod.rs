//! Test support: an in-memory database handle.

mod memory;

pub use memory::MemoryDatabase;
