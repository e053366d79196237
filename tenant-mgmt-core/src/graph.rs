//! Graph - Dependency analysis between stacks

use std::collections::{HashMap, HashSet};

/// Why one stack depends on another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Producer stack name
    pub target: String,
    /// Export that carries the value (e.g., "Network:ExportsOutputRefVpc")
    pub export_name: String,
}

/// Dependency graph between stacks
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Stack name -> list of dependencies
    pub edges: HashMap<String, Vec<Dependency>>,
    /// Reverse edges: target -> list of stacks that depend on it
    pub reverse_edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency edge; repeated edges for the same export are ignored
    pub fn add_edge(&mut self, from: String, dependency: Dependency) {
        let deps = self.edges.entry(from.clone()).or_default();
        if deps.contains(&dependency) {
            return;
        }
        let target = dependency.target.clone();
        deps.push(dependency);

        let dependents = self.reverse_edges.entry(target).or_default();
        if !dependents.contains(&from) {
            dependents.push(from);
        }
    }

    /// Get direct dependencies of a stack
    pub fn dependencies_of(&self, node: &str) -> &[Dependency] {
        self.edges.get(node).map_or(&[], |v| v.as_slice())
    }

    /// Names of the stacks a stack directly depends on, deduplicated, in first-seen order
    pub fn dependency_names(&self, node: &str) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for dep in self.dependencies_of(node) {
            if !names.contains(&dep.target) {
                names.push(dep.target.clone());
            }
        }
        names
    }

    /// Get stacks that depend on this stack
    pub fn dependents_of(&self, node: &str) -> &[String] {
        self.reverse_edges.get(node).map_or(&[], |v| v.as_slice())
    }

    /// Check if the graph has any cycles
    pub fn has_cycle(&self) -> bool {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        let mut nodes: Vec<&String> = self.edges.keys().collect();
        nodes.sort();
        for node in nodes {
            if self.has_cycle_util(node, &mut visited, &mut rec_stack) {
                return true;
            }
        }
        false
    }

    fn has_cycle_util(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        rec_stack: &mut HashSet<String>,
    ) -> bool {
        if rec_stack.contains(node) {
            return true;
        }
        if visited.contains(node) {
            return false;
        }

        visited.insert(node.to_string());
        rec_stack.insert(node.to_string());

        if let Some(deps) = self.edges.get(node) {
            for dep in deps {
                if self.has_cycle_util(&dep.target, visited, rec_stack) {
                    return true;
                }
            }
        }

        rec_stack.remove(node);
        false
    }

    /// Order `nodes` so every stack comes after its dependencies.
    ///
    /// Ties keep the order of `nodes`. Returns `None` if the graph has a cycle.
    pub fn topological_order(&self, nodes: &[String]) -> Option<Vec<String>> {
        if self.has_cycle() {
            return None;
        }

        fn visit(
            graph: &DependencyGraph,
            node: &str,
            visited: &mut HashSet<String>,
            sorted: &mut Vec<String>,
        ) {
            if visited.contains(node) {
                return;
            }
            visited.insert(node.to_string());
            for dep in graph.dependency_names(node) {
                visit(graph, &dep, visited, sorted);
            }
            sorted.push(node.to_string());
        }

        let mut visited = HashSet::new();
        let mut sorted = Vec::new();
        for node in nodes {
            visit(self, node, &mut visited, &mut sorted);
        }
        Some(sorted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(target: &str) -> Dependency {
        Dependency {
            target: target.to_string(),
            export_name: format!("{}:ExportsOutputRefThing", target),
        }
    }

    #[test]
    fn test_cycle_detection() {
        let mut graph = DependencyGraph::new();

        // Create a cycle: a -> b -> c -> a
        graph.add_edge("a".to_string(), dep("b"));
        graph.add_edge("b".to_string(), dep("c"));
        graph.add_edge("c".to_string(), dep("a"));

        assert!(graph.has_cycle());
        assert!(
            graph
                .topological_order(&["a".to_string(), "b".to_string(), "c".to_string()])
                .is_none()
        );
    }

    #[test]
    fn test_no_cycle() {
        let mut graph = DependencyGraph::new();

        // Create a DAG: a -> b -> c
        graph.add_edge("a".to_string(), dep("b"));
        graph.add_edge("b".to_string(), dep("c"));

        assert!(!graph.has_cycle());
    }

    #[test]
    fn topological_order_puts_producers_first() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("monitoring".to_string(), dep("service"));
        graph.add_edge("service".to_string(), dep("network"));

        let order = graph
            .topological_order(&[
                "monitoring".to_string(),
                "service".to_string(),
                "network".to_string(),
            ])
            .unwrap();
        assert_eq!(order, vec!["network", "service", "monitoring"]);
    }

    #[test]
    fn independent_nodes_keep_declaration_order() {
        let graph = DependencyGraph::new();
        let order = graph
            .topological_order(&["b".to_string(), "a".to_string()])
            .unwrap();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn repeated_edges_are_collapsed() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("service".to_string(), dep("network"));
        graph.add_edge("service".to_string(), dep("network"));
        graph.add_edge(
            "service".to_string(),
            Dependency {
                target: "network".to_string(),
                export_name: "network:ExportsOutputFnGetAttVpcCidrBlock".to_string(),
            },
        );

        assert_eq!(graph.dependencies_of("service").len(), 2);
        assert_eq!(graph.dependency_names("service"), vec!["network"]);
        assert_eq!(graph.dependents_of("network"), ["service".to_string()]);
    }
}
