//! Seeder dependency graph and execution ordering.

use std::collections::{BTreeSet, HashMap};

use keel_core::error::{KeelError, Result};
use keel_core::registry::Registry;
use keel_core::seeder::Seeder;

/// Dependency graph over seeder names.
///
/// Nodes keep insertion order; dependencies keep their declared order.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    order: Vec<String>,
    dependencies: HashMap<String, Vec<String>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph of every seeder in `registry`.
    pub fn from_registry(registry: &Registry<dyn Seeder>) -> Self {
        let mut graph = Self::new();
        for (name, seeder) in registry.iter() {
            graph.add(name, seeder.dependencies().iter().copied());
        }
        graph
    }

    /// Add a node with its dependencies, replacing any previous entry.
    pub fn add<'a>(&mut self, name: &str, dependencies: impl IntoIterator<Item = &'a str>) {
        let deps = dependencies.into_iter().map(str::to_string).collect();
        if self.dependencies.insert(name.to_string(), deps).is_none() {
            self.order.push(name.to_string());
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }

    /// Declared dependencies of `name`.
    pub fn dependencies(&self, name: &str) -> &[String] {
        self.dependencies
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Check that every dependency names a node, in insertion order.
    pub fn validate(&self) -> Result<()> {
        for name in &self.order {
            for dep in self.dependencies(name) {
                if !self.contains(dep) {
                    return Err(KeelError::MissingDependency {
                        seeder: name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Order every node so that each comes after all of its dependencies.
    ///
    /// Among nodes that are ready at the same time, the smaller name goes first.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        self.validate()?;

        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

        for name in &self.order {
            let deps = self.dependencies(name);
            in_degree.insert(name.as_str(), deps.len());
            for dep in deps {
                dependents
                    .entry(dep.as_str())
                    .or_default()
                    .push(name.as_str());
            }
        }

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, &degree)| degree == 0)
            .map(|(&name, _)| name)
            .collect();

        let mut result = Vec::with_capacity(self.order.len());
        while let Some(name) = ready.pop_first() {
            result.push(name.to_string());

            for &dependent in dependents.get(name).map(Vec::as_slice).unwrap_or(&[]) {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if result.len() != self.order.len() {
            let mut involving: Vec<String> = in_degree
                .into_iter()
                .filter(|(_, degree)| *degree > 0)
                .map(|(name, _)| name.to_string())
                .collect();
            involving.sort();
            return Err(KeelError::CircularDependency { involving });
        }

        Ok(result)
    }

    /// Order `target` and everything it transitively depends on, dependencies
    /// first in declared order. Nodes outside that closure are left out.
    pub fn closure_order(&self, target: &str) -> Result<Vec<String>> {
        if !self.contains(target) {
            return Err(KeelError::UnknownSeeder(target.to_string()));
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut path: Vec<&str> = Vec::new();
        let mut result = Vec::new();
        self.visit(target, &mut marks, &mut path, &mut result)?;
        Ok(result)
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
        result: &mut Vec<String>,
    ) -> Result<()> {
        match marks.get(name) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let start = path.iter().position(|&n| n == name).unwrap_or(0);
                return Err(KeelError::CircularDependency {
                    involving: path[start..].iter().map(|n| n.to_string()).collect(),
                });
            }
            None => {}
        }

        marks.insert(name, Mark::InProgress);
        path.push(name);

        for dep in self.dependencies(name) {
            if !self.contains(dep) {
                return Err(KeelError::MissingDependency {
                    seeder: name.to_string(),
                    dependency: dep.clone(),
                });
            }
            self.visit(dep, marks, path, result)?;
        }

        path.pop();
        marks.insert(name, Mark::Done);
        result.push(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(nodes: &[(&str, &[&str])]) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for (name, deps) in nodes {
            graph.add(name, deps.iter().copied());
        }
        graph
    }

    fn position(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn test_topological_order_respects_dependencies() {
        let g = graph(&[
            ("ProductSeeder", &["UserSeeder"]),
            ("OrderSeeder", &["ProductSeeder", "UserSeeder"]),
            ("UserSeeder", &[]),
        ]);

        let order = g.topological_order().unwrap();
        assert_eq!(order, vec!["UserSeeder", "ProductSeeder", "OrderSeeder"]);
    }

    #[test]
    fn test_topological_order_breaks_ties_by_name() {
        let g = graph(&[
            ("ZSeeder", &[]),
            ("MSeeder", &["ZSeeder"]),
            ("ASeeder", &[]),
            ("BSeeder", &[]),
        ]);

        let order = g.topological_order().unwrap();
        assert_eq!(order, vec!["ASeeder", "BSeeder", "ZSeeder", "MSeeder"]);
    }

    #[test]
    fn test_topological_order_every_edge() {
        let g = graph(&[
            ("E", &["C", "D"]),
            ("D", &["B"]),
            ("C", &["A", "B"]),
            ("B", &["A"]),
            ("A", &[]),
        ]);

        let order = g.topological_order().unwrap();
        assert_eq!(order.len(), 5);
        for name in ["A", "B", "C", "D", "E"] {
            for dep in g.dependencies(name) {
                assert!(position(&order, dep) < position(&order, name));
            }
        }
    }

    #[test]
    fn test_topological_order_detects_cycle() {
        let g = graph(&[
            ("ASeeder", &["BSeeder"]),
            ("BSeeder", &["ASeeder"]),
            ("CSeeder", &[]),
        ]);

        let err = g.topological_order().unwrap_err();
        match err {
            KeelError::CircularDependency { involving } => {
                assert_eq!(involving, vec!["ASeeder", "BSeeder"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_topological_order_missing_dependency() {
        let g = graph(&[("UserSeeder", &[]), ("ProductSeeder", &["GhostSeeder"])]);

        let err = g.topological_order().unwrap_err();
        assert!(matches!(
            err,
            KeelError::MissingDependency { ref seeder, ref dependency }
                if seeder == "ProductSeeder" && dependency == "GhostSeeder"
        ));
    }

    #[test]
    fn test_closure_order_limits_to_target() {
        let g = graph(&[
            ("UserSeeder", &[]),
            ("ProductSeeder", &["UserSeeder"]),
            ("TagSeeder", &[]),
            ("OrderSeeder", &["ProductSeeder"]),
        ]);

        assert_eq!(
            g.closure_order("ProductSeeder").unwrap(),
            vec!["UserSeeder", "ProductSeeder"]
        );
        assert_eq!(g.closure_order("TagSeeder").unwrap(), vec!["TagSeeder"]);
    }

    #[test]
    fn test_closure_order_shared_dependency_once() {
        let g = graph(&[
            ("A", &[]),
            ("B", &["A"]),
            ("C", &["A"]),
            ("D", &["C", "B"]),
        ]);

        assert_eq!(g.closure_order("D").unwrap(), vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn test_closure_order_detects_cycle() {
        let g = graph(&[("A", &["B"]), ("B", &["C"]), ("C", &["B"])]);

        let err = g.closure_order("A").unwrap_err();
        match err {
            KeelError::CircularDependency { involving } => {
                assert_eq!(involving, vec!["B", "C"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_closure_order_missing_dependency() {
        let g = graph(&[("ProductSeeder", &["GhostSeeder"])]);

        let err = g.closure_order("ProductSeeder").unwrap_err();
        assert!(matches!(
            err,
            KeelError::MissingDependency { ref seeder, ref dependency }
                if seeder == "ProductSeeder" && dependency == "GhostSeeder"
        ));
    }

    #[test]
    fn test_closure_order_unknown_target() {
        let g = graph(&[("UserSeeder", &[])]);
        assert!(matches!(
            g.closure_order("NopeSeeder"),
            Err(KeelError::UnknownSeeder(ref n)) if n == "NopeSeeder"
        ));
    }

    #[test]
    fn test_empty_graph() {
        let g = DependencyGraph::new();
        assert!(g.is_empty());
        assert!(g.topological_order().unwrap().is_empty());
    }
}
