//! Effect - A single pending operation against infrastructure
//!
//! Effects are values. Nothing happens when one is constructed; an
//! Interpreter hands them to a Provider to make them real.

use crate::resource::{Resource, ResourceId, State};

/// An operation to be executed by a provider
#[derive(Debug, Clone)]
pub enum Effect {
    /// Fetch current state
    Read(ResourceId),
    /// Create a resource that does not exist yet
    Create(Resource),
    /// Update an existing resource to match the desired declaration
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
    },
    /// Delete a resource no longer declared
    Delete(ResourceId),
}

impl Effect {
    /// Whether executing this effect changes infrastructure
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Effect::Read(_))
    }

    /// The resource this effect targets
    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Read(id) | Effect::Delete(id) => id,
            Effect::Create(resource) => &resource.id,
            Effect::Update { id, .. } => id,
        }
    }
}
