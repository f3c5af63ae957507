//! Cluster provisioning: managed control plane, node pool, pod-identity agent
//!
//! The cluster is bound to exactly the subnets the network topology
//! produced. Its generated credential bundle (kubeconfig) is the
//! secret-marked output later components authenticate with.

use puppis_core::resource::{Resource, Value};

use crate::config::StackConfig;

/// Binding of the cluster declaration
pub const CLUSTER_BINDING: &str = "cluster";
/// Platform add-on delivering pod identity to workloads
pub const POD_IDENTITY_ADDON: &str = "eks-pod-identity-agent";
/// Root volume size for nodes, in GiB
const NODE_ROOT_VOLUME_GIB: i64 = 100;

/// The declared cluster and its node pool
#[derive(Debug)]
pub struct ClusterSpec {
    pub resources: Vec<Resource>,
}

/// Declare the managed cluster on top of the given subnets.
pub fn declare(config: &StackConfig, subnet_bindings: &[String]) -> ClusterSpec {
    let subnet_refs: Vec<Value> = subnet_bindings
        .iter()
        .map(|binding| Value::reference(binding, "subnet_id"))
        .collect();

    let mut resources = Vec::new();

    resources.push(
        Resource::new("eks.cluster", CLUSTER_BINDING)
            .with_attribute("subnet_ids", Value::List(subnet_refs))
            .with_attribute("endpoint_public_access", Value::Bool(true))
            .with_attribute("endpoint_private_access", Value::Bool(false))
            .with_attribute(
                "authentication_mode",
                Value::String("API_AND_CONFIG_MAP".to_string()),
            )
            .with_attribute("enable_workload_identity", Value::Bool(true)),
    );

    resources.push(
        Resource::new("eks.node_group", "node_group")
            .with_attribute("cluster_name", Value::reference(CLUSTER_BINDING, "name"))
            .with_attribute(
                "instance_types",
                Value::List(vec![Value::String(config.node_instance_type.clone())]),
            )
            .with_attribute("min_size", Value::Int(config.node_min_size))
            .with_attribute("max_size", Value::Int(config.node_max_size))
            .with_attribute("desired_size", Value::Int(config.node_desired_size))
            .with_attribute("disk_size", Value::Int(NODE_ROOT_VOLUME_GIB)),
    );

    resources.push(
        Resource::new("eks.addon", "pod_identity_agent")
            .with_attribute("cluster_name", Value::reference(CLUSTER_BINDING, "name"))
            .with_attribute(
                "addon_name",
                Value::String(POD_IDENTITY_ADDON.to_string()),
            ),
    );

    ClusterSpec { resources }
}
