//! End-to-end properties of the built-in stack

use std::collections::HashMap;

use puppis_core::differ::create_plan;
use puppis_core::resource::{Resource, State, Value};
use puppis_stack::cluster::CLUSTER_BINDING;
use puppis_stack::gitops::CONTROLLER_NAMESPACE;
use puppis_stack::identity::{POD_IDENTITY_SERVICE, WORKLOAD_SERVICE_ACCOUNT};
use puppis_stack::network::{DEFAULT_ROUTE_CIDR, VPC_BINDING};
use puppis_stack::secret::{SECRET_BINDING, TOKEN_FIELD};
use puppis_stack::{ConfigError, Stack, StackConfig, StackError};

fn config() -> StackConfig {
    StackConfig {
        admin_principal_arn: "arn:aws:iam::123456789012:user/admin".to_string(),
        ..StackConfig::default()
    }
}

fn find<'a>(stack: &'a Stack, resource_type: &str) -> Vec<&'a Resource> {
    stack
        .resources()
        .iter()
        .filter(|r| r.id.resource_type == resource_type)
        .collect()
}

#[test]
fn one_subnet_per_configured_zone() {
    let three_zones = StackConfig {
        availability_zones: vec![
            "us-west-2a".to_string(),
            "us-west-2b".to_string(),
            "us-west-2c".to_string(),
        ],
        public_subnet_cidrs: vec![
            "10.0.0.0/20".to_string(),
            "10.0.16.0/20".to_string(),
            "10.0.32.0/20".to_string(),
        ],
        ..config()
    };
    let stack = Stack::from_config(three_zones).unwrap();
    assert_eq!(find(&stack, "ec2.subnet").len(), 3);
    assert_eq!(find(&stack, "ec2.subnet_route_table_association").len(), 3);
}

#[test]
fn route_table_has_exactly_one_catch_all_route() {
    let stack = Stack::from_config(config()).unwrap();
    let routes = find(&stack, "ec2.route");
    assert_eq!(routes.len(), 1);
    assert_eq!(
        routes[0].attribute("destination_cidr_block"),
        Some(&Value::String(DEFAULT_ROUTE_CIDR.to_string()))
    );
}

#[test]
fn cluster_spans_exactly_the_declared_subnets() {
    let stack = Stack::from_config(config()).unwrap();
    let cluster = find(&stack, "eks.cluster")[0];

    let subnet_bindings: Vec<String> = find(&stack, "ec2.subnet")
        .iter()
        .map(|r| r.binding.clone())
        .collect();
    let expected = Value::List(
        subnet_bindings
            .iter()
            .map(|b| Value::reference(b, "subnet_id"))
            .collect(),
    );
    assert_eq!(cluster.attribute("subnet_ids"), Some(&expected));
}

#[test]
fn workload_role_trusts_only_the_pod_identity_service() {
    let stack = Stack::from_config(config()).unwrap();
    let role = find(&stack, "iam.role")[0];
    let Some(Value::String(doc)) = role.attribute("assume_role_policy") else {
        panic!("trust policy missing");
    };

    let parsed: serde_json::Value = serde_json::from_str(doc).unwrap();
    let statements = parsed["Statement"].as_array().unwrap();
    assert_eq!(statements.len(), 1);
    assert_eq!(
        statements[0]["Principal"],
        serde_json::json!({ "Service": POD_IDENTITY_SERVICE })
    );
}

#[test]
fn pod_identity_targets_controller_namespace_and_account() {
    let stack = Stack::from_config(config()).unwrap();
    let association = find(&stack, "eks.pod_identity_association")[0];
    assert_eq!(
        association.attribute("namespace"),
        Some(&Value::String(CONTROLLER_NAMESPACE.to_string()))
    );
    assert_eq!(
        association.attribute("service_account"),
        Some(&Value::String(WORKLOAD_SERVICE_ACCOUNT.to_string()))
    );
}

#[test]
fn secret_carries_token_field_even_when_unset() {
    let stack = Stack::from_config(config()).unwrap();
    let secret = find(&stack, "k8s.secret")[0];
    let Some(Value::Map(data)) = secret.attribute("string_data") else {
        panic!("string_data missing");
    };
    assert_eq!(data.get(TOKEN_FIELD), Some(&Value::String(String::new())));
    assert!(secret.sensitive);
}

#[test]
fn zone_cidr_mismatch_fails_stack_construction() {
    let bad = StackConfig {
        public_subnet_cidrs: vec!["10.0.0.0/20".to_string()],
        ..config()
    };
    assert!(matches!(
        Stack::from_config(bad),
        Err(StackError::Config(ConfigError::ZoneCidrMismatch {
            zones: 2,
            cidrs: 1
        }))
    ));
}

#[test]
fn inverted_capacity_fails_stack_construction() {
    let bad = StackConfig {
        node_min_size: 6,
        node_desired_size: 3,
        node_max_size: 2,
        ..config()
    };
    assert!(matches!(
        Stack::from_config(bad),
        Err(StackError::Config(ConfigError::CapacityBounds { .. }))
    ));
}

#[test]
fn vpc_is_a_root_and_secret_is_a_leaf() {
    let stack = Stack::from_config(config()).unwrap();
    assert!(
        stack
            .graph()
            .root_resources()
            .contains(&VPC_BINDING.to_string())
    );
    assert!(
        stack
            .graph()
            .leaf_resources()
            .contains(&SECRET_BINDING.to_string())
    );
}

#[test]
fn application_order_respects_every_reference() {
    let stack = Stack::from_config(config()).unwrap();
    let order = stack.application_order();
    let pos: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, b)| (b.as_str(), i))
        .collect();

    for resource in stack.resources() {
        for dep in stack.graph().dependencies_of(&resource.binding) {
            assert!(
                pos[dep.target.as_str()] < pos[resource.binding.as_str()],
                "{} must precede {}",
                dep.target,
                resource.binding
            );
        }
    }
}

// A full apply records each resource's attributes; planning again over
// that record must be a no-op.
#[test]
fn converged_stack_replans_to_nothing() {
    let stack = Stack::from_config(config()).unwrap();
    let desired = stack.topological_resources();

    let recorded: HashMap<_, _> = desired
        .iter()
        .map(|r| {
            (
                r.id.clone(),
                State::existing(r.id.clone(), r.attributes.clone()),
            )
        })
        .collect();

    let desired: Vec<Resource> = desired.into_iter().cloned().collect();
    let plan = create_plan(&desired, &recorded);
    assert!(plan.is_empty(), "expected empty plan, got {:?}", plan);
}

#[test]
fn fresh_stack_plans_one_create_per_resource() {
    let stack = Stack::from_config(config()).unwrap();
    let desired: Vec<Resource> = stack.topological_resources().into_iter().cloned().collect();

    let plan = create_plan(&desired, &HashMap::new());
    assert_eq!(plan.effects().len(), desired.len());
    assert_eq!(plan.summary().create, desired.len());
}

#[test]
fn cluster_depends_on_every_subnet() {
    let stack = Stack::from_config(config()).unwrap();
    let deps = stack.graph().dependencies_of(CLUSTER_BINDING);
    let targets: Vec<&str> = deps.iter().map(|d| d.target.as_str()).collect();
    assert!(targets.contains(&"subnet_0"));
    assert!(targets.contains(&"subnet_1"));
}
