//! Identity and access bindings
//!
//! Two grants: a cluster-admin access entry for an external principal,
//! and a workload identity (role + registry policy + pod-identity
//! association) for the GitOps controller's image reflector, so it can
//! pull from the registry without static credentials.

use puppis_core::resource::{Resource, Value};

use crate::cluster::CLUSTER_BINDING;
use crate::config::StackConfig;
use crate::gitops::CONTROLLER_NAMESPACE;

/// The only service allowed to assume the workload role
pub const POD_IDENTITY_SERVICE: &str = "pods.eks.amazonaws.com";
/// Cluster-wide admin policy granted to the external principal
pub const CLUSTER_ADMIN_POLICY_ARN: &str =
    "arn:aws:eks::aws:cluster-access-policy/AmazonEKSClusterAdminPolicy";
/// In-cluster service account inheriting the workload role
pub const WORKLOAD_SERVICE_ACCOUNT: &str = "image-reflector-controller";
/// Binding of the workload role declaration
pub const WORKLOAD_ROLE_BINDING: &str = "workload_role";

/// The declared identity bindings
#[derive(Debug)]
pub struct IdentityBindings {
    pub resources: Vec<Resource>,
}

/// Trust policy document allowing only the pod-identity service to
/// assume the workload role.
pub fn workload_trust_policy() -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": POD_IDENTITY_SERVICE },
            "Action": ["sts:AssumeRole", "sts:TagSession"]
        }]
    })
    .to_string()
}

/// Permissions document granting the wildcard registry capability
fn registry_policy_document() -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Action": "ecr:*",
            "Resource": "*"
        }]
    })
    .to_string()
}

/// Declare the access entry, workload role, policy and associations.
pub fn declare(config: &StackConfig) -> IdentityBindings {
    let mut resources = Vec::new();

    resources.push(
        Resource::new("eks.access_entry", "admin_access_entry")
            .with_attribute("cluster_name", Value::reference(CLUSTER_BINDING, "name"))
            .with_attribute(
                "principal_arn",
                Value::String(config.admin_principal_arn.clone()),
            )
            .with_attribute("access_entry_type", Value::String("STANDARD".to_string())),
    );

    // Referencing the entry's principal orders the association after it
    resources.push(
        Resource::new("eks.access_policy_association", "admin_policy")
            .with_attribute("cluster_name", Value::reference(CLUSTER_BINDING, "name"))
            .with_attribute(
                "principal_arn",
                Value::reference("admin_access_entry", "principal_arn"),
            )
            .with_attribute(
                "policy_arn",
                Value::String(CLUSTER_ADMIN_POLICY_ARN.to_string()),
            )
            .with_attribute("access_scope", Value::String("cluster".to_string())),
    );

    resources.push(
        Resource::new("iam.role", WORKLOAD_ROLE_BINDING)
            .with_attribute("assume_role_policy", Value::String(workload_trust_policy())),
    );

    resources.push(
        Resource::new("iam.policy", "registry_policy")
            .with_attribute("policy", Value::String(registry_policy_document())),
    );

    resources.push(
        Resource::new("iam.role_policy_attachment", "workload_role_attachment")
            .with_attribute("role", Value::reference(WORKLOAD_ROLE_BINDING, "name"))
            .with_attribute("policy_arn", Value::reference("registry_policy", "arn")),
    );

    // Requires both the cluster and the role to exist first
    resources.push(
        Resource::new("eks.pod_identity_association", "workload_identity")
            .with_attribute("cluster_name", Value::reference(CLUSTER_BINDING, "name"))
            .with_attribute("role_arn", Value::reference(WORKLOAD_ROLE_BINDING, "arn"))
            .with_attribute(
                "namespace",
                Value::String(CONTROLLER_NAMESPACE.to_string()),
            )
            .with_attribute(
                "service_account",
                Value::String(WORKLOAD_SERVICE_ACCOUNT.to_string()),
            ),
    );

    IdentityBindings { resources }
}
