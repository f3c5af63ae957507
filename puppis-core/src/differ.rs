//! Differ - Compare desired declarations with recorded state
//!
//! Compares the desired state of the stack with the state recorded after
//! the last convergence and produces the Effects required to close the
//! gap. A converged target diffs to an empty plan.

use std::collections::{HashMap, HashSet};

use crate::effect::Effect;
use crate::plan::Plan;
use crate::resource::{Resource, ResourceId, State, Value};

/// Result of diffing a single resource
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare one desired declaration against its recorded state
pub fn diff(desired: &Resource, current: &State) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = changed_attributes(&desired.attributes, &current.attributes);

    if changed.is_empty() {
        Diff::NoChange(desired.id.clone())
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Attributes whose desired value differs from the recorded one
fn changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
) -> Vec<String> {
    let mut changed: Vec<String> = desired
        .iter()
        .filter(|(key, desired_value)| current.get(*key) != Some(desired_value))
        .map(|(key, _)| key.clone())
        .collect();
    changed.sort();
    changed
}

/// Diff every desired resource against recorded state and produce a Plan.
///
/// `desired` must already be in dependency order; the Plan preserves it.
/// Recorded resources absent from the desired set become deletions,
/// appended after the creates and updates.
pub fn create_plan(desired: &[Resource], recorded: &HashMap<ResourceId, State>) -> Plan {
    let mut plan = Plan::new();

    for resource in desired {
        let current = recorded
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        match diff(resource, &current) {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update { id, from, to, .. } => plan.add(Effect::Update { id, from, to }),
            Diff::NoChange(_) => {}
        }
    }

    let declared: HashSet<&ResourceId> = desired.iter().map(|r| &r.id).collect();
    let mut orphaned: Vec<&ResourceId> = recorded
        .iter()
        .filter(|(id, state)| state.exists && !declared.contains(id))
        .map(|(id, _)| id)
        .collect();
    orphaned.sort_by(|a, b| (&a.resource_type, &a.name).cmp(&(&b.resource_type, &b.name)));
    for id in orphaned {
        plan.add(Effect::Delete(id.clone()));
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_create_when_not_exists() {
        let desired = Resource::new("ec2.vpc", "main");
        let current = State::not_found(ResourceId::new("ec2.vpc", "main"));

        let result = diff(&desired, &current);
        assert!(matches!(result, Diff::Create(_)));
        assert!(result.is_change());
    }

    #[test]
    fn diff_no_change_when_same() {
        let desired = Resource::new("ec2.vpc", "main")
            .with_attribute("cidr_block", Value::String("10.0.0.0/16".to_string()));

        let mut attrs = HashMap::new();
        attrs.insert(
            "cidr_block".to_string(),
            Value::String("10.0.0.0/16".to_string()),
        );
        let current = State::existing(ResourceId::new("ec2.vpc", "main"), attrs);

        let result = diff(&desired, &current);
        assert!(matches!(result, Diff::NoChange(_)));
    }

    #[test]
    fn diff_update_when_different() {
        let desired = Resource::new("eks.node_group", "nodes")
            .with_attribute("desired_size", Value::Int(4));

        let mut attrs = HashMap::new();
        attrs.insert("desired_size".to_string(), Value::Int(3));
        let current = State::existing(ResourceId::new("eks.node_group", "nodes"), attrs);

        match diff(&desired, &current) {
            Diff::Update {
                changed_attributes, ..
            } => {
                assert_eq!(changed_attributes, vec!["desired_size".to_string()]);
            }
            other => panic!("Expected Update, got {:?}", other),
        }
    }

    #[test]
    fn reference_values_compare_stably() {
        let desired = Resource::new("ec2.subnet", "subnet_0")
            .with_attribute("vpc_id", Value::reference("vpc", "vpc_id"));

        let mut attrs = HashMap::new();
        attrs.insert("vpc_id".to_string(), Value::reference("vpc", "vpc_id"));
        let current = State::existing(ResourceId::new("ec2.subnet", "subnet_0"), attrs);

        assert!(matches!(diff(&desired, &current), Diff::NoChange(_)));
    }

    #[test]
    fn create_plan_from_resources() {
        let resources = vec![
            Resource::new("ec2.vpc", "new-vpc"),
            Resource::new("eks.node_group", "nodes").with_attribute("desired_size", Value::Int(4)),
        ];

        let mut recorded = HashMap::new();
        let mut attrs = HashMap::new();
        attrs.insert("desired_size".to_string(), Value::Int(3));
        recorded.insert(
            ResourceId::new("eks.node_group", "nodes"),
            State::existing(ResourceId::new("eks.node_group", "nodes"), attrs),
        );

        let plan = create_plan(&resources, &recorded);

        assert_eq!(plan.effects().len(), 2);
        assert!(matches!(plan.effects()[0], Effect::Create(_)));
        assert!(matches!(plan.effects()[1], Effect::Update { .. }));
    }

    #[test]
    fn orphaned_state_becomes_delete() {
        let resources = vec![Resource::new("ec2.vpc", "vpc")];

        let mut recorded = HashMap::new();
        recorded.insert(
            ResourceId::new("ec2.vpc", "vpc"),
            State::existing(ResourceId::new("ec2.vpc", "vpc"), HashMap::new()),
        );
        recorded.insert(
            ResourceId::new("ec2.subnet", "old"),
            State::existing(ResourceId::new("ec2.subnet", "old"), HashMap::new()),
        );

        let plan = create_plan(&resources, &recorded);
        assert_eq!(plan.summary().delete, 1);
        assert_eq!(plan.summary().create, 0);
    }

    #[test]
    fn converged_state_plans_nothing() {
        let resources = vec![
            Resource::new("ec2.vpc", "vpc")
                .with_attribute("cidr_block", Value::String("10.0.0.0/16".to_string())),
        ];

        let mut recorded = HashMap::new();
        let mut attrs = HashMap::new();
        attrs.insert(
            "cidr_block".to_string(),
            Value::String("10.0.0.0/16".to_string()),
        );
        recorded.insert(
            ResourceId::new("ec2.vpc", "vpc"),
            State::existing(ResourceId::new("ec2.vpc", "vpc"), attrs),
        );

        let plan = create_plan(&resources, &recorded);
        assert!(plan.is_empty());
    }
}
