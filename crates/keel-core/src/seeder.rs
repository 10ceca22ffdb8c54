use futures::future::BoxFuture;

use crate::error::Result;
use crate::store::Executor;

/// Suffix every seeder name carries by convention.
pub const SEEDER_SUFFIX: &str = "Seeder";

/// A data population task.
///
/// Seeders are not tracked in a ledger: each one must be safe to run again,
/// usually by checking whether its target data already exists.
pub trait Seeder: Send + Sync {
    /// Unique name, conventionally ending in `Seeder`.
    fn name(&self) -> &str;

    /// Names of seeders that must run before this one.
    fn dependencies(&self) -> &[&str] {
        &[]
    }

    /// Populate data.
    fn run<'a>(&'a self, db: &'a mut dyn Executor) -> BoxFuture<'a, Result<()>>;
}

impl std::fmt::Debug for dyn Seeder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Seeder")
            .field("name", &self.name())
            .field("dependencies", &self.dependencies())
            .finish()
    }
}

/// Append the `Seeder` suffix to `name` unless already present.
pub fn normalize_seeder_name(name: &str) -> String {
    if name.ends_with(SEEDER_SUFFIX) {
        name.to_string()
    } else {
        format!("{}{}", name, SEEDER_SUFFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_seeder_name() {
        assert_eq!(normalize_seeder_name("User"), "UserSeeder");
        assert_eq!(normalize_seeder_name("UserSeeder"), "UserSeeder");
    }
}
