//! Application schema and sample data.

pub mod migrations;
pub mod seeders;
