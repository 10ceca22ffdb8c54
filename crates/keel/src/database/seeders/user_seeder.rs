use futures::future::BoxFuture;
use tracing::info;

use keel_core::error::Result;
use keel_core::seeder::Seeder;
use keel_core::store::Executor;

use super::quote;

const COUNT_USERS: &str = "SELECT COUNT(*) FROM users";

/// Plain-text password shared by every sample user; hashed with bcrypt by pgcrypto.
const DEFAULT_PASSWORD: &str = "password";

struct SampleUser {
    email: &'static str,
    username: &'static str,
    first_name: &'static str,
    last_name: &'static str,
}

const USERS: &[SampleUser] = &[
    SampleUser {
        email: "admin@example.com",
        username: "admin",
        first_name: "Admin",
        last_name: "User",
    },
    SampleUser {
        email: "john@example.com",
        username: "johndoe",
        first_name: "John",
        last_name: "Doe",
    },
    SampleUser {
        email: "jane@example.com",
        username: "janedoe",
        first_name: "Jane",
        last_name: "Doe",
    },
];

/// Sample accounts, including the admin that owns the sample products.
pub struct UserSeeder;

impl Seeder for UserSeeder {
    fn name(&self) -> &str {
        "UserSeeder"
    }

    fn run<'a>(&'a self, db: &'a mut dyn Executor) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if db.fetch_count(COUNT_USERS).await? > 0 {
                info!("Users already exist, skipping UserSeeder");
                return Ok(());
            }

            db.execute("CREATE EXTENSION IF NOT EXISTS pgcrypto").await?;

            for user in USERS {
                let sql = format!(
                    "INSERT INTO users (email, username, password, first_name, last_name, is_active, created_at, updated_at) \
                     VALUES ({}, {}, crypt({}, gen_salt('bf')), {}, {}, true, NOW(), NOW())",
                    quote(user.email),
                    quote(user.username),
                    quote(DEFAULT_PASSWORD),
                    quote(user.first_name),
                    quote(user.last_name),
                );
                db.execute(&sql).await?;
            }

            info!(users_created = USERS.len(), "UserSeeder completed successfully");
            Ok(())
        })
    }
}
