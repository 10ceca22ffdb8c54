use std::collections::HashMap;

use crate::error::{KeelError, Result};
use crate::migration::Migration;
use crate::seeder::Seeder;

/// Identity-keyed collection of work units.
///
/// Units keep their registration order. Registering a second unit under an
/// existing key is an error.
pub struct Registry<U: ?Sized> {
    kind: &'static str,
    entries: Vec<(String, Box<U>)>,
    index: HashMap<String, usize>,
}

impl<U: ?Sized> Registry<U> {
    /// Create an empty registry for units of `kind` (used in error messages).
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register `unit` under `key`.
    pub fn insert(&mut self, key: impl Into<String>, unit: Box<U>) -> Result<()> {
        let key = key.into();
        if self.index.contains_key(&key) {
            return Err(KeelError::DuplicateUnit {
                kind: self.kind,
                id: key,
            });
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, unit));
        Ok(())
    }

    /// Get a unit by key.
    pub fn get(&self, key: &str) -> Option<&U> {
        self.index.get(key).map(|&i| self.entries[i].1.as_ref())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Iterate units in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &U)> {
        self.entries.iter().map(|(k, u)| (k.as_str(), u.as_ref()))
    }

    /// All keys in ascending order.
    pub fn sorted_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.iter().map(|(k, _)| k.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    /// Get the number of registered units.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Registry<dyn Migration> {
    /// Build a migration registry keyed by version.
    pub fn migrations(units: Vec<Box<dyn Migration>>) -> Result<Self> {
        let mut registry = Self::new("migration");
        for unit in units {
            registry.register(unit)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, migration: Box<dyn Migration>) -> Result<()> {
        let version = migration.version().to_string();
        self.insert(version, migration)
    }
}

impl Registry<dyn Seeder> {
    /// Build a seeder registry keyed by name.
    pub fn seeders(units: Vec<Box<dyn Seeder>>) -> Result<Self> {
        let mut registry = Self::new("seeder");
        for unit in units {
            registry.register(unit)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, seeder: Box<dyn Seeder>) -> Result<()> {
        let name = seeder.name().to_string();
        self.insert(name, seeder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_registry() {
        let registry: Registry<str> = Registry::new("thing");
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_keeps_registration_order() {
        let mut registry: Registry<str> = Registry::new("thing");
        registry.insert("b", "second".into()).unwrap();
        registry.insert("a", "first".into()).unwrap();

        let keys: Vec<&str> = registry.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(registry.sorted_keys(), vec!["a", "b"]);
        assert_eq!(registry.get("a"), Some("first"));
        assert!(registry.contains("b"));
    }

    #[test]
    fn test_rejects_duplicate_key() {
        let mut registry: Registry<str> = Registry::new("thing");
        registry.insert("a", "first".into()).unwrap();

        let err = registry.insert("a", "again".into()).unwrap_err();
        assert!(matches!(
            err,
            KeelError::DuplicateUnit { kind: "thing", ref id } if id == "a"
        ));
        assert_eq!(registry.get("a"), Some("first"));
        assert_eq!(registry.len(), 1);
    }
}
