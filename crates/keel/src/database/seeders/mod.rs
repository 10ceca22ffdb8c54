mod product_seeder;
mod user_seeder;

pub use product_seeder::ProductSeeder;
pub use user_seeder::UserSeeder;

use keel_core::seeder::Seeder;

/// Every seeder the application ships.
pub fn all() -> Vec<Box<dyn Seeder>> {
    vec![Box::new(UserSeeder), Box::new(ProductSeeder)]
}

/// Render `value` as a SQL string literal.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
