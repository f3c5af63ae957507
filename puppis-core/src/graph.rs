//! Graph - Dependency analysis over resource declarations
//!
//! Every `Value::Ref` in a resource's attributes is an edge to the
//! declaration it references. The resulting graph must be a DAG with all
//! references resolved before a plan is emitted; application order is the
//! topological order of this graph, not declaration order.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::resource::{Resource, Value};

/// A single dependency edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    /// Binding name of the referenced declaration
    pub target: String,
    /// Attribute of the target being referenced (e.g., "vpc_id")
    pub attribute: String,
    /// Attribute of the referencing resource the value is used in
    pub used_in: String,
}

/// Errors detected while validating the graph
#[derive(Debug, Clone, thiserror::Error)]
pub enum GraphError {
    #[error("Dependency cycle involving '{binding}'")]
    Cycle { binding: String },

    #[error("'{from}' references unknown binding '{target}' in attribute '{used_in}'")]
    UnresolvedReference {
        from: String,
        target: String,
        used_in: String,
    },
}

/// Dependency graph over a set of resource declarations
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Bindings declared as resources
    declared: BTreeSet<String>,
    /// Binding -> dependencies it holds references to
    edges: HashMap<String, Vec<Dependency>>,
    /// Reverse edges: target binding -> bindings that depend on it
    reverse_edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from resource declarations by walking every
    /// attribute value for references.
    pub fn from_resources(resources: &[Resource]) -> Self {
        let mut graph = Self::new();
        for resource in resources {
            graph.declare(&resource.binding);
        }
        for resource in resources {
            let mut attrs: Vec<_> = resource.attributes.iter().collect();
            attrs.sort_by(|a, b| a.0.cmp(b.0));
            for (key, value) in attrs {
                collect_references(&resource.binding, key, value, &mut graph);
            }
        }
        graph
    }

    /// Declare a binding as a graph node
    pub fn declare(&mut self, binding: &str) {
        self.declared.insert(binding.to_string());
    }

    pub fn add_edge(&mut self, from: String, dependency: Dependency) {
        let target = dependency.target.clone();
        self.edges.entry(from.clone()).or_default().push(dependency);
        self.reverse_edges.entry(target).or_default().push(from);
    }

    pub fn contains(&self, binding: &str) -> bool {
        self.declared.contains(binding)
    }

    pub fn node_count(&self) -> usize {
        self.declared.len()
    }

    /// Direct dependencies of a binding
    pub fn dependencies_of(&self, binding: &str) -> &[Dependency] {
        self.edges.get(binding).map_or(&[], |v| v.as_slice())
    }

    /// Bindings that reference this one
    pub fn dependents_of(&self, binding: &str) -> &[String] {
        self.reverse_edges.get(binding).map_or(&[], |v| v.as_slice())
    }

    /// Declared bindings with no dependencies (the graph roots)
    pub fn root_resources(&self) -> Vec<String> {
        self.declared
            .iter()
            .filter(|n| self.dependencies_of(n).is_empty())
            .cloned()
            .collect()
    }

    /// Declared bindings nothing depends on (the graph leaves)
    pub fn leaf_resources(&self) -> Vec<String> {
        self.declared
            .iter()
            .filter(|n| self.dependents_of(n).is_empty())
            .cloned()
            .collect()
    }

    /// References whose target was never declared as a resource
    pub fn unresolved_references(&self) -> Vec<GraphError> {
        let mut errors = Vec::new();
        let mut froms: Vec<_> = self.edges.keys().collect();
        froms.sort();
        for from in froms {
            for dep in &self.edges[from] {
                if !self.declared.contains(&dep.target) {
                    errors.push(GraphError::UnresolvedReference {
                        from: from.clone(),
                        target: dep.target.clone(),
                        used_in: dep.used_in.clone(),
                    });
                }
            }
        }
        errors
    }

    /// Whether the graph contains a dependency cycle
    pub fn has_cycle(&self) -> bool {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for node in self.edges.keys() {
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

    /// Topological order of all declared bindings, dependencies first.
    ///
    /// Kahn's algorithm with a lexicographic tie-break, so the order is
    /// deterministic across runs. Edges to undeclared targets are ignored
    /// here; `unresolved_references` reports those separately.
    pub fn topological_order(&self) -> Result<Vec<String>, GraphError> {
        let mut in_degree: BTreeMap<&str, usize> = self
            .declared
            .iter()
            .map(|n| (n.as_str(), self.distinct_declared_targets(n).len()))
            .collect();

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(n, _)| *n)
            .collect();
        let mut order = Vec::with_capacity(self.declared.len());

        while let Some(&node) = ready.iter().next() {
            ready.remove(node);
            order.push(node.to_string());

            let mut dependents: Vec<&str> = self
                .dependents_of(node)
                .iter()
                .map(|s| s.as_str())
                .collect();
            dependents.sort();
            dependents.dedup();
            for dependent in dependents {
                if let Some(deg) = in_degree.get_mut(dependent) {
                    *deg -= 1;
                    if *deg == 0 {
                        ready.insert(dependent);
                    }
                }
            }
        }

        if order.len() != self.declared.len() {
            let stuck = self
                .declared
                .iter()
                .find(|n| !order.contains(n))
                .cloned()
                .unwrap_or_default();
            return Err(GraphError::Cycle { binding: stuck });
        }

        Ok(order)
    }

    fn distinct_declared_targets(&self, binding: &str) -> BTreeSet<&str> {
        self.dependencies_of(binding)
            .iter()
            .filter(|d| self.declared.contains(&d.target))
            .map(|d| d.target.as_str())
            .collect()
    }
}

/// Recursively collect references out of a value
fn collect_references(from: &str, used_in: &str, value: &Value, graph: &mut DependencyGraph) {
    match value {
        Value::Ref(target, attribute) => {
            graph.add_edge(
                from.to_string(),
                Dependency {
                    target: target.clone(),
                    attribute: attribute.clone(),
                    used_in: used_in.to_string(),
                },
            );
        }
        Value::List(items) => {
            for item in items {
                collect_references(from, used_in, item, graph);
            }
        }
        Value::Map(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            for (key, item) in entries {
                collect_references(from, key, item, graph);
            }
        }
        Value::String(_) | Value::Int(_) | Value::Bool(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vpc_subnet_resources() -> Vec<Resource> {
        vec![
            Resource::new("ec2.vpc", "vpc")
                .with_attribute("cidr_block", Value::String("10.0.0.0/16".into())),
            Resource::new("ec2.subnet", "subnet_0")
                .with_attribute("vpc_id", Value::reference("vpc", "vpc_id")),
            Resource::new("ec2.subnet", "subnet_1")
                .with_attribute("vpc_id", Value::reference("vpc", "vpc_id")),
        ]
    }

    #[test]
    fn builds_edges_from_references() {
        let graph = DependencyGraph::from_resources(&vpc_subnet_resources());
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.dependencies_of("subnet_0").len(), 1);
        assert_eq!(graph.dependencies_of("subnet_0")[0].target, "vpc");
        assert_eq!(graph.dependents_of("vpc").len(), 2);
    }

    #[test]
    fn roots_and_leaves() {
        let graph = DependencyGraph::from_resources(&vpc_subnet_resources());
        assert_eq!(graph.root_resources(), vec!["vpc".to_string()]);
        let leaves = graph.leaf_resources();
        assert!(leaves.contains(&"subnet_0".to_string()));
        assert!(leaves.contains(&"subnet_1".to_string()));
        assert!(!leaves.contains(&"vpc".to_string()));
    }

    #[test]
    fn references_inside_lists_are_edges() {
        let resources = vec![
            Resource::new("ec2.subnet", "subnet_0"),
            Resource::new("eks.cluster", "cluster").with_attribute(
                "subnet_ids",
                Value::List(vec![Value::reference("subnet_0", "subnet_id")]),
            ),
        ];
        let graph = DependencyGraph::from_resources(&resources);
        assert_eq!(graph.dependencies_of("cluster").len(), 1);
        assert_eq!(graph.dependencies_of("cluster")[0].used_in, "subnet_ids");
    }

    #[test]
    fn topological_order_puts_dependencies_first() {
        let graph = DependencyGraph::from_resources(&vpc_subnet_resources());
        let order = graph.topological_order().unwrap();
        let vpc_pos = order.iter().position(|b| b == "vpc").unwrap();
        let subnet_pos = order.iter().position(|b| b == "subnet_0").unwrap();
        assert!(vpc_pos < subnet_pos);
    }

    #[test]
    fn topological_order_is_deterministic() {
        let graph = DependencyGraph::from_resources(&vpc_subnet_resources());
        let first = graph.topological_order().unwrap();
        let second = graph.topological_order().unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec!["vpc", "subnet_0", "subnet_1"]);
    }

    #[test]
    fn duplicate_references_count_once() {
        let resources = vec![
            Resource::new("ec2.vpc", "vpc"),
            Resource::new("ec2.route", "route")
                .with_attribute("vpc_id", Value::reference("vpc", "vpc_id"))
                .with_attribute("other", Value::reference("vpc", "cidr_block")),
        ];
        let graph = DependencyGraph::from_resources(&resources);
        let order = graph.topological_order().unwrap();
        assert_eq!(order, vec!["vpc", "route"]);
    }

    #[test]
    fn cycle_is_detected() {
        let mut graph = DependencyGraph::new();
        graph.declare("a");
        graph.declare("b");
        graph.add_edge(
            "a".to_string(),
            Dependency {
                target: "b".to_string(),
                attribute: "id".to_string(),
                used_in: "x".to_string(),
            },
        );
        graph.add_edge(
            "b".to_string(),
            Dependency {
                target: "a".to_string(),
                attribute: "id".to_string(),
                used_in: "y".to_string(),
            },
        );
        assert!(graph.has_cycle());
        assert!(graph.topological_order().is_err());
    }

    #[test]
    fn unresolved_reference_is_reported() {
        let resources = vec![
            Resource::new("ec2.subnet", "subnet_0")
                .with_attribute("vpc_id", Value::reference("vpc", "vpc_id")),
        ];
        let graph = DependencyGraph::from_resources(&resources);
        let errors = graph.unresolved_references();
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            &errors[0],
            GraphError::UnresolvedReference { target, .. } if target == "vpc"
        ));
    }

    #[test]
    fn resolved_graph_has_no_unresolved_references() {
        let graph = DependencyGraph::from_resources(&vpc_subnet_resources());
        assert!(graph.unresolved_references().is_empty());
    }
}
