use futures::future::BoxFuture;

use keel_core::error::Result;
use keel_core::migration::Migration;
use keel_core::store::Executor;

const UP: &str = r#"
CREATE TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email VARCHAR(255) UNIQUE NOT NULL,
    username VARCHAR(50) UNIQUE NOT NULL,
    password VARCHAR(255) NOT NULL,
    first_name VARCHAR(100) NOT NULL,
    last_name VARCHAR(100) NOT NULL,
    is_active BOOLEAN DEFAULT true,
    created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
    updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
    deleted_at TIMESTAMP WITH TIME ZONE
)
"#;

pub struct CreateUsersTable;

impl Migration for CreateUsersTable {
    fn version(&self) -> &str {
        "2024_01_15_120000_create_users_table"
    }

    fn description(&self) -> &str {
        "Create users table"
    }

    fn up<'a>(&'a self, db: &'a mut dyn Executor) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            db.execute(UP).await?;
            Ok(())
        })
    }

    fn down<'a>(&'a self, db: &'a mut dyn Executor) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            db.execute("DROP TABLE IF EXISTS users").await?;
            Ok(())
        })
    }
}
