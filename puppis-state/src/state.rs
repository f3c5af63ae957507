//! State file structures for persisting converged infrastructure state

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use puppis_core::resource::{ResourceId, State, Value, ValueError};

/// The main state file structure that persists to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Monotonically increasing number for each state modification
    pub serial: u64,
    /// Unique identifier for this state lineage (prevents accidental overwrites)
    pub lineage: String,
    /// Version of Puppis that last modified this state
    pub puppis_version: String,
    /// All recorded resources and their converged state
    pub resources: Vec<RecordedResource>,
}

impl StateFile {
    /// Current state file format version
    pub const CURRENT_VERSION: u32 = 1;

    /// Create a new empty state file
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage: uuid::Uuid::new_v4().to_string(),
            puppis_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    /// Increment serial and update the recorded tool version
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.puppis_version = env!("CARGO_PKG_VERSION").to_string();
    }

    /// Find a resource by type and name
    pub fn find_resource(&self, resource_type: &str, name: &str) -> Option<&RecordedResource> {
        self.resources
            .iter()
            .find(|r| r.resource_type == resource_type && r.name == name)
    }

    fn find_resource_mut(
        &mut self,
        resource_type: &str,
        name: &str,
    ) -> Option<&mut RecordedResource> {
        self.resources
            .iter_mut()
            .find(|r| r.resource_type == resource_type && r.name == name)
    }

    /// Add or update a resource in the state
    pub fn upsert_resource(&mut self, resource: RecordedResource) {
        if let Some(existing) = self.find_resource_mut(&resource.resource_type, &resource.name) {
            *existing = resource;
        } else {
            self.resources.push(resource);
        }
    }

    /// Remove a resource from the state
    pub fn remove_resource(&mut self, resource_type: &str, name: &str) -> Option<RecordedResource> {
        self.resources
            .iter()
            .position(|r| r.resource_type == resource_type && r.name == name)
            .map(|pos| self.resources.remove(pos))
    }

    /// View the recorded resources as core `State` values keyed by id,
    /// ready to diff against desired declarations. Fails if an attribute
    /// holds a value the core model cannot represent, such as a
    /// non-integer number from a hand-edited file.
    pub fn as_states(&self) -> Result<HashMap<ResourceId, State>, ValueError> {
        self.resources
            .iter()
            .map(|r| {
                let id = ResourceId::new(r.resource_type.clone(), r.name.clone());
                let attributes = r
                    .attributes
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), Value::from_json(v)?)))
                    .collect::<Result<HashMap<_, _>, ValueError>>()?;
                let mut state = State::existing(id.clone(), attributes);
                state.identifier = r.identifier.clone();
                Ok((id, state))
            })
            .collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Converged state of a single recorded resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedResource {
    /// Resource type (e.g., "ec2.vpc", "eks.cluster")
    pub resource_type: String,
    /// Resource name
    pub name: String,
    /// Engine-assigned identifier
    pub identifier: Option<String>,
    /// All attributes of the resource as JSON values
    pub attributes: HashMap<String, serde_json::Value>,
    /// Whether display output must redact this resource's attributes
    #[serde(default)]
    pub sensitive: bool,
}

impl RecordedResource {
    /// Create a new recorded resource
    pub fn new(resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            identifier: None,
            attributes: HashMap::new(),
            sensitive: false,
        }
    }

    /// Build from a converged core `State`
    pub fn from_state(state: &State, sensitive: bool) -> Self {
        Self {
            resource_type: state.id.resource_type.clone(),
            name: state.id.name.clone(),
            identifier: state.identifier.clone(),
            attributes: state
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
            sensitive,
        }
    }

    /// Set an attribute value
    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}
