mod create_products_table;
mod create_users_table;

pub use create_products_table::CreateProductsTable;
pub use create_users_table::CreateUsersTable;

use keel_core::migration::Migration;

/// Every migration the application ships.
pub fn all() -> Vec<Box<dyn Migration>> {
    vec![Box::new(CreateUsersTable), Box::new(CreateProductsTable)]
}
