//! Schemas for every resource type the stack declares
//!
//! Validation happens before a plan is emitted, so a typo'd attribute
//! or a negative node count fails at plan time rather than mid-apply.

use std::collections::HashMap;

use puppis_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

fn tags_type() -> AttributeType {
    AttributeType::Map(Box::new(AttributeType::String))
}

fn string_list() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::String))
}

pub fn vpc_schema() -> ResourceSchema {
    ResourceSchema::new("ec2.vpc")
        .with_description("A virtual network")
        .attribute(AttributeSchema::new("cidr_block", types::cidr()).required())
        .attribute(AttributeSchema::new(
            "enable_dns_hostnames",
            AttributeType::Bool,
        ))
        .attribute(AttributeSchema::new(
            "enable_dns_support",
            AttributeType::Bool,
        ))
        .attribute(AttributeSchema::new("tags", tags_type()))
        .attribute(
            AttributeSchema::new("vpc_id", AttributeType::String)
                .with_description("Assigned identifier (read-only)"),
        )
}

pub fn internet_gateway_schema() -> ResourceSchema {
    ResourceSchema::new("ec2.internet_gateway")
        .with_description("Internet egress for a virtual network")
        .attribute(AttributeSchema::new("tags", tags_type()))
        .attribute(AttributeSchema::new(
            "internet_gateway_id",
            AttributeType::String,
        ))
}

pub fn vpc_gateway_attachment_schema() -> ResourceSchema {
    ResourceSchema::new("ec2.vpc_gateway_attachment")
        .attribute(AttributeSchema::new("vpc_id", AttributeType::String).required())
        .attribute(AttributeSchema::new("internet_gateway_id", AttributeType::String).required())
}

pub fn route_table_schema() -> ResourceSchema {
    ResourceSchema::new("ec2.route_table")
        .attribute(AttributeSchema::new("vpc_id", AttributeType::String).required())
        .attribute(AttributeSchema::new("tags", tags_type()))
        .attribute(AttributeSchema::new("route_table_id", AttributeType::String))
}

pub fn route_schema() -> ResourceSchema {
    ResourceSchema::new("ec2.route")
        .attribute(AttributeSchema::new("route_table_id", AttributeType::String).required())
        .attribute(AttributeSchema::new("destination_cidr_block", types::cidr()).required())
        .attribute(AttributeSchema::new("gateway_id", AttributeType::String).required())
}

pub fn subnet_schema() -> ResourceSchema {
    ResourceSchema::new("ec2.subnet")
        .with_description("A public subnet in one availability zone")
        .attribute(AttributeSchema::new("vpc_id", AttributeType::String).required())
        .attribute(AttributeSchema::new("cidr_block", types::cidr()).required())
        .attribute(AttributeSchema::new("availability_zone", AttributeType::String).required())
        .attribute(AttributeSchema::new(
            "map_public_ip_on_launch",
            AttributeType::Bool,
        ))
        .attribute(AttributeSchema::new("subnet_id", AttributeType::String))
}

pub fn subnet_route_table_association_schema() -> ResourceSchema {
    ResourceSchema::new("ec2.subnet_route_table_association")
        .attribute(AttributeSchema::new("subnet_id", AttributeType::String).required())
        .attribute(AttributeSchema::new("route_table_id", AttributeType::String).required())
}

pub fn cluster_schema() -> ResourceSchema {
    ResourceSchema::new("eks.cluster")
        .with_description("A managed Kubernetes control plane")
        .attribute(AttributeSchema::new("subnet_ids", string_list()).required())
        .attribute(AttributeSchema::new(
            "endpoint_public_access",
            AttributeType::Bool,
        ))
        .attribute(AttributeSchema::new(
            "endpoint_private_access",
            AttributeType::Bool,
        ))
        .attribute(AttributeSchema::new(
            "authentication_mode",
            AttributeType::Enum(vec![
                "API".to_string(),
                "API_AND_CONFIG_MAP".to_string(),
                "CONFIG_MAP".to_string(),
            ]),
        ))
        .attribute(AttributeSchema::new(
            "enable_workload_identity",
            AttributeType::Bool,
        ))
        .attribute(
            AttributeSchema::new("kubeconfig", AttributeType::String)
                .with_description("Generated credential bundle (read-only, sensitive)"),
        )
        .attribute(AttributeSchema::new("name", AttributeType::String))
}

pub fn node_group_schema() -> ResourceSchema {
    ResourceSchema::new("eks.node_group")
        .attribute(AttributeSchema::new("cluster_name", AttributeType::String).required())
        .attribute(AttributeSchema::new("instance_types", string_list()).required())
        .attribute(AttributeSchema::new("min_size", types::non_negative_int()).required())
        .attribute(AttributeSchema::new("max_size", types::non_negative_int()).required())
        .attribute(AttributeSchema::new("desired_size", types::non_negative_int()).required())
        .attribute(AttributeSchema::new("disk_size", types::non_negative_int()))
}

pub fn addon_schema() -> ResourceSchema {
    ResourceSchema::new("eks.addon")
        .attribute(AttributeSchema::new("cluster_name", AttributeType::String).required())
        .attribute(AttributeSchema::new("addon_name", AttributeType::String).required())
}

pub fn access_entry_schema() -> ResourceSchema {
    ResourceSchema::new("eks.access_entry")
        .attribute(AttributeSchema::new("cluster_name", AttributeType::String).required())
        .attribute(AttributeSchema::new("principal_arn", AttributeType::String).required())
        .attribute(AttributeSchema::new(
            "access_entry_type",
            AttributeType::Enum(vec!["STANDARD".to_string(), "EC2_LINUX".to_string()]),
        ))
}

pub fn access_policy_association_schema() -> ResourceSchema {
    ResourceSchema::new("eks.access_policy_association")
        .attribute(AttributeSchema::new("cluster_name", AttributeType::String).required())
        .attribute(AttributeSchema::new("principal_arn", AttributeType::String).required())
        .attribute(AttributeSchema::new("policy_arn", AttributeType::String).required())
        .attribute(AttributeSchema::new(
            "access_scope",
            AttributeType::Enum(vec!["cluster".to_string(), "namespace".to_string()]),
        ))
}

pub fn role_schema() -> ResourceSchema {
    ResourceSchema::new("iam.role")
        .attribute(AttributeSchema::new("assume_role_policy", AttributeType::String).required())
        .attribute(AttributeSchema::new("arn", AttributeType::String))
        .attribute(AttributeSchema::new("name", AttributeType::String))
}

pub fn policy_schema() -> ResourceSchema {
    ResourceSchema::new("iam.policy")
        .attribute(AttributeSchema::new("policy", AttributeType::String).required())
        .attribute(AttributeSchema::new("arn", AttributeType::String))
}

pub fn role_policy_attachment_schema() -> ResourceSchema {
    ResourceSchema::new("iam.role_policy_attachment")
        .attribute(AttributeSchema::new("role", AttributeType::String).required())
        .attribute(AttributeSchema::new("policy_arn", AttributeType::String).required())
}

pub fn pod_identity_association_schema() -> ResourceSchema {
    ResourceSchema::new("eks.pod_identity_association")
        .attribute(AttributeSchema::new("cluster_name", AttributeType::String).required())
        .attribute(AttributeSchema::new("role_arn", AttributeType::String).required())
        .attribute(AttributeSchema::new("namespace", AttributeType::String).required())
        .attribute(AttributeSchema::new("service_account", AttributeType::String).required())
}

pub fn manifest_install_schema() -> ResourceSchema {
    ResourceSchema::new("k8s.manifest_install")
        .with_description("A manifest applied verbatim to a cluster")
        .attribute(AttributeSchema::new("manifest", AttributeType::String).required())
        .attribute(AttributeSchema::new("namespace", AttributeType::String).required())
        .attribute(AttributeSchema::new("kubeconfig", AttributeType::String).required())
}

pub fn secret_schema() -> ResourceSchema {
    ResourceSchema::new("k8s.secret")
        .attribute(AttributeSchema::new("namespace", AttributeType::String).required())
        .attribute(AttributeSchema::new(
            "secret_type",
            AttributeType::Enum(vec!["Opaque".to_string()]),
        ))
        .attribute(
            AttributeSchema::new("string_data", AttributeType::Map(Box::new(AttributeType::String)))
                .required(),
        )
        .attribute(AttributeSchema::new("kubeconfig", AttributeType::String).required())
}

/// All schemas, keyed by resource type
pub fn all_schemas() -> HashMap<String, ResourceSchema> {
    let schemas = [
        vpc_schema(),
        internet_gateway_schema(),
        vpc_gateway_attachment_schema(),
        route_table_schema(),
        route_schema(),
        subnet_schema(),
        subnet_route_table_association_schema(),
        cluster_schema(),
        node_group_schema(),
        addon_schema(),
        access_entry_schema(),
        access_policy_association_schema(),
        role_schema(),
        policy_schema(),
        role_policy_attachment_schema(),
        pod_identity_association_schema(),
        manifest_install_schema(),
        secret_schema(),
    ];

    schemas
        .into_iter()
        .map(|s| (s.resource_type.clone(), s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use puppis_core::resource::Value;

    #[test]
    fn every_declared_type_has_a_schema() {
        let schemas = all_schemas();
        for resource_type in [
            "ec2.vpc",
            "ec2.internet_gateway",
            "ec2.vpc_gateway_attachment",
            "ec2.route_table",
            "ec2.route",
            "ec2.subnet",
            "ec2.subnet_route_table_association",
            "eks.cluster",
            "eks.node_group",
            "eks.addon",
            "eks.access_entry",
            "eks.access_policy_association",
            "iam.role",
            "iam.policy",
            "iam.role_policy_attachment",
            "eks.pod_identity_association",
            "k8s.manifest_install",
            "k8s.secret",
        ] {
            assert!(schemas.contains_key(resource_type), "{}", resource_type);
        }
    }

    #[test]
    fn node_group_rejects_negative_capacity() {
        let schema = node_group_schema();
        let mut attrs = HashMap::new();
        attrs.insert("cluster_name".to_string(), Value::String("c".to_string()));
        attrs.insert(
            "instance_types".to_string(),
            Value::List(vec![Value::String("t3.medium".to_string())]),
        );
        attrs.insert("min_size".to_string(), Value::Int(-1));
        attrs.insert("max_size".to_string(), Value::Int(6));
        attrs.insert("desired_size".to_string(), Value::Int(3));

        assert!(schema.validate(&attrs).is_err());
    }

    #[test]
    fn cluster_subnet_refs_validate_as_strings() {
        let schema = cluster_schema();
        let mut attrs = HashMap::new();
        attrs.insert(
            "subnet_ids".to_string(),
            Value::List(vec![
                Value::reference("subnet_0", "subnet_id"),
                Value::reference("subnet_1", "subnet_id"),
            ]),
        );

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn route_requires_a_valid_destination() {
        let schema = route_schema();
        let mut attrs = HashMap::new();
        attrs.insert(
            "route_table_id".to_string(),
            Value::reference("route_table", "route_table_id"),
        );
        attrs.insert(
            "destination_cidr_block".to_string(),
            Value::String("everywhere".to_string()),
        );
        attrs.insert(
            "gateway_id".to_string(),
            Value::reference("igw", "internet_gateway_id"),
        );

        assert!(schema.validate(&attrs).is_err());
    }
}
