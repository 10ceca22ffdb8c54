use futures::future::BoxFuture;
use tracing::{error, info};

use keel_core::error::{KeelError, Result};
use keel_core::seeder::Seeder;
use keel_core::store::Executor;

use super::quote;

const COUNT_PRODUCTS: &str = "SELECT COUNT(*) FROM products";

const ADMIN_EMAIL: &str = "admin@example.com";

pub(super) const ADMIN_EXISTS: &str =
    "SELECT COUNT(*) FROM users WHERE email = 'admin@example.com'";

struct SampleProduct {
    name: &'static str,
    description: &'static str,
    price: &'static str,
    stock: i32,
    category: &'static str,
}

const PRODUCTS: &[SampleProduct] = &[
    SampleProduct {
        name: "MacBook Pro 16",
        description: "Apple MacBook Pro 16-inch with M2 Pro chip",
        price: "2499.99",
        stock: 10,
        category: "Electronics",
    },
    SampleProduct {
        name: "iPhone 15 Pro",
        description: "Latest iPhone with titanium design",
        price: "999.99",
        stock: 25,
        category: "Electronics",
    },
    SampleProduct {
        name: "Nike Air Force 1",
        description: "Classic white sneakers",
        price: "90.00",
        stock: 50,
        category: "Fashion",
    },
    SampleProduct {
        name: "The Go Programming Language",
        description: "Comprehensive guide to Go programming",
        price: "45.99",
        stock: 100,
        category: "Books",
    },
    SampleProduct {
        name: "Wireless Mouse",
        description: "Ergonomic wireless mouse with long battery life",
        price: "29.99",
        stock: 75,
        category: "Electronics",
    },
];

/// Sample catalogue owned by the admin user.
pub struct ProductSeeder;

impl Seeder for ProductSeeder {
    fn name(&self) -> &str {
        "ProductSeeder"
    }

    fn dependencies(&self) -> &[&str] {
        &["UserSeeder"]
    }

    fn run<'a>(&'a self, db: &'a mut dyn Executor) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            if db.fetch_count(COUNT_PRODUCTS).await? > 0 {
                info!("Products already exist, skipping ProductSeeder");
                return Ok(());
            }

            if db.fetch_count(ADMIN_EXISTS).await? == 0 {
                error!(email = ADMIN_EMAIL, "Admin user not found for ProductSeeder");
                return Err(KeelError::Database(format!(
                    "admin user {} not found",
                    ADMIN_EMAIL
                )));
            }

            for product in PRODUCTS {
                let sql = format!(
                    "INSERT INTO products (name, description, price, stock, category, is_active, created_by, created_at, updated_at) \
                     SELECT {}, {}, {}, {}, {}, true, id, NOW(), NOW() FROM users WHERE email = {}",
                    quote(product.name),
                    quote(product.description),
                    product.price,
                    product.stock,
                    quote(product.category),
                    quote(ADMIN_EMAIL),
                );
                db.execute(&sql).await?;
            }

            info!(products_created = PRODUCTS.len(), "ProductSeeder completed successfully");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::store::Database;
    use keel_runtime::MemoryDatabase;

    #[tokio::test]
    async fn test_skips_when_products_exist() {
        let db = MemoryDatabase::new();
        db.set_count(COUNT_PRODUCTS, 5);

        let mut tx = db.begin().await.unwrap();
        ProductSeeder.run(tx.executor()).await.unwrap();
        tx.commit().await.unwrap();

        assert!(db.statements().is_empty());
    }

    #[tokio::test]
    async fn test_requires_admin_user() {
        let db = MemoryDatabase::new();

        let mut tx = db.begin().await.unwrap();
        let err = ProductSeeder.run(tx.executor()).await.unwrap_err();
        assert!(err.to_string().contains("admin@example.com"));
    }

    #[tokio::test]
    async fn test_inserts_products_for_admin() {
        let db = MemoryDatabase::new();
        db.set_count(ADMIN_EXISTS, 1);

        let mut tx = db.begin().await.unwrap();
        ProductSeeder.run(tx.executor()).await.unwrap();
        tx.commit().await.unwrap();

        let statements = db.statements();
        assert_eq!(statements.len(), 5);
        assert!(statements
            .iter()
            .all(|s| s.ends_with("FROM users WHERE email = 'admin@example.com'")));
        assert!(statements[0].contains("2499.99"));
    }

    #[test]
    fn test_depends_on_users() {
        assert_eq!(ProductSeeder.dependencies(), &["UserSeeder"]);
    }
}
