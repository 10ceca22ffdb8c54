use futures::future::BoxFuture;

use keel_core::error::Result;
use keel_core::migration::Migration;
use keel_core::store::Executor;

const UP: &str = r#"
CREATE TABLE products (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    description TEXT,
    price DECIMAL(10,2) NOT NULL,
    stock INTEGER NOT NULL DEFAULT 0,
    category VARCHAR(100) NOT NULL,
    is_active BOOLEAN DEFAULT true,
    created_by UUID NOT NULL,
    created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
    updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
    deleted_at TIMESTAMP WITH TIME ZONE,
    FOREIGN KEY (created_by) REFERENCES users(id)
)
"#;

/// Products reference the user who created them, so this runs after
/// `CreateUsersTable`.
pub struct CreateProductsTable;

impl Migration for CreateProductsTable {
    fn version(&self) -> &str {
        "2024_01_15_130000_create_products_table"
    }

    fn description(&self) -> &str {
        "Create products table"
    }

    fn up<'a>(&'a self, db: &'a mut dyn Executor) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            db.execute(UP).await?;
            Ok(())
        })
    }

    fn down<'a>(&'a self, db: &'a mut dyn Executor) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            db.execute("DROP TABLE IF EXISTS products").await?;
            Ok(())
        })
    }
}
