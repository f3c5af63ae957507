//! Stack - The full declaration set, validated and ordered
//!
//! Assembles the network, cluster, identity, GitOps and secret
//! components into one resource set, validates every declaration against
//! its schema, and checks the dependency graph before anything is
//! planned. Construction fails on the first structural problem; a Stack
//! that exists is safe to plan.

use puppis_core::graph::{DependencyGraph, GraphError};
use puppis_core::resource::{Resource, Value};

use crate::config::{ConfigError, StackConfig};
use crate::{cluster, gitops, identity, network, schemas, secret};

/// A named value the stack exposes after convergence
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: String,
    pub value: Value,
    /// Redact in display output
    pub sensitive: bool,
}

/// Errors building a stack
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("Schema validation failed for '{resource}': {message}")]
    Schema { resource: String, message: String },

    #[error("Stack shape violated: {0}")]
    Shape(String),
}

/// The validated stack
#[derive(Debug)]
pub struct Stack {
    config: StackConfig,
    resources: Vec<Resource>,
    graph: DependencyGraph,
    order: Vec<String>,
}

impl Stack {
    /// Build and validate the stack from a configuration.
    pub fn from_config(config: StackConfig) -> Result<Self, StackError> {
        config.validate()?;

        let network = network::declare(&config)?;
        let cluster = cluster::declare(&config, &network.subnet_bindings);
        let identity = identity::declare(&config);
        let gitops = gitops::declare(&config)?;
        let secret = secret::declare(&config);

        let mut resources = Vec::new();
        resources.extend(network.resources);
        resources.extend(cluster.resources);
        resources.extend(identity.resources);
        resources.extend(gitops.resources);
        resources.extend(secret.resources);

        let schemas = schemas::all_schemas();
        for resource in &resources {
            if let Some(schema) = schemas.get(&resource.id.resource_type)
                && let Err(errors) = schema.validate(&resource.attributes)
            {
                let message = errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(StackError::Schema {
                    resource: resource.id.to_string(),
                    message,
                });
            }
        }

        let graph = DependencyGraph::from_resources(&resources);
        if let Some(error) = graph.unresolved_references().into_iter().next() {
            return Err(error.into());
        }
        let order = graph.topological_order()?;
        check_shape(&graph)?;

        Ok(Self {
            config,
            resources,
            graph,
            order,
        })
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// All declarations, in declaration order
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Binding names in application order, dependencies first
    pub fn application_order(&self) -> &[String] {
        &self.order
    }

    /// Declarations in application order
    pub fn topological_resources(&self) -> Vec<&Resource> {
        self.order
            .iter()
            .filter_map(|binding| self.resources.iter().find(|r| &r.binding == binding))
            .collect()
    }

    /// Values the stack exposes once converged. The credential bundle is
    /// sensitive; everything else is plain.
    pub fn outputs(&self) -> Vec<Output> {
        vec![
            Output {
                name: "vpc_id".to_string(),
                value: Value::reference(network::VPC_BINDING, "vpc_id"),
                sensitive: false,
            },
            Output {
                name: "cluster_name".to_string(),
                value: Value::reference(cluster::CLUSTER_BINDING, "name"),
                sensitive: false,
            },
            Output {
                name: "kubeconfig".to_string(),
                value: Value::reference(cluster::CLUSTER_BINDING, "kubeconfig"),
                sensitive: true,
            },
        ]
    }

    /// Render the stack as a JSON document, resources in application
    /// order, references in interpolation form. This is what an external
    /// execution engine consumes.
    pub fn export_document(&self) -> serde_json::Value {
        let resources: Vec<serde_json::Value> = self
            .topological_resources()
            .iter()
            .map(|r| {
                let mut attrs: Vec<_> = r.attributes.iter().collect();
                attrs.sort_by(|a, b| a.0.cmp(b.0));
                serde_json::json!({
                    "type": r.id.resource_type,
                    "name": r.id.name,
                    "binding": r.binding,
                    "sensitive": r.sensitive,
                    "attributes": attrs
                        .into_iter()
                        .map(|(k, v)| (k.clone(), v.to_json()))
                        .collect::<serde_json::Map<_, _>>(),
                })
            })
            .collect();

        serde_json::json!({
            "version": 1,
            "resources": resources,
        })
    }
}

/// The VPC must root the graph and the secret must end it. A component
/// change that breaks this ordering is a bug in the declarations, not
/// in the user's configuration.
fn check_shape(graph: &DependencyGraph) -> Result<(), StackError> {
    if !graph
        .root_resources()
        .iter()
        .any(|b| b == network::VPC_BINDING)
    {
        return Err(StackError::Shape(format!(
            "'{}' must not depend on any other resource",
            network::VPC_BINDING
        )));
    }
    if !graph
        .leaf_resources()
        .iter()
        .any(|b| b == secret::SECRET_BINDING)
    {
        return Err(StackError::Shape(format!(
            "no resource may depend on '{}'",
            secret::SECRET_BINDING
        )));
    }
    Ok(())
}
