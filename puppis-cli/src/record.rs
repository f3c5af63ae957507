//! Recording provider backed by the state file
//!
//! Puppis ships no cloud provider; applying a plan records each
//! resource's converged attributes in the state file and assigns an
//! identifier, leaving the actual reconciliation to an external engine
//! consuming the exported document. A second apply over the same record
//! diffs to nothing.

use std::collections::HashMap;
use std::sync::Mutex;

use puppis_core::provider::{BoxFuture, Provider, ProviderError, ProviderResult};
use puppis_core::resource::{Resource, ResourceId, State};
use puppis_state::{RecordedResource, StateFile};

pub struct RecordingProvider {
    state: Mutex<StateFile>,
    /// Resource ids whose recorded attributes must be redacted in output
    sensitive: HashMap<ResourceId, bool>,
}

impl RecordingProvider {
    pub fn new(state: StateFile, sensitive: HashMap<ResourceId, bool>) -> Self {
        Self {
            state: Mutex::new(state),
            sensitive,
        }
    }

    /// Take back the state file after applying a plan
    pub fn into_state_file(self) -> StateFile {
        self.state.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn is_sensitive(&self, id: &ResourceId) -> bool {
        self.sensitive.get(id).copied().unwrap_or(false)
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut StateFile) -> T,
    ) -> ProviderResult<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| ProviderError::new("state file lock poisoned"))?;
        Ok(f(&mut state))
    }
}

/// Identifier in the style engines assign (e.g., "vpc-3f2a9c04b1d8")
fn assign_identifier(id: &ResourceId) -> String {
    let kind = id.resource_type.rsplit('.').next().unwrap_or("resource");
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", kind, &suffix[..12])
}

impl Provider for RecordingProvider {
    fn name(&self) -> &'static str {
        "record"
    }

    fn read(&self, id: &ResourceId) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let result = self
            .with_state(|state| state.as_states())
            .and_then(|states| {
                states.map_err(|e| ProviderError::new(e.to_string()).for_resource(id.clone()))
            })
            .map(|mut states| {
                states
                    .remove(&id)
                    .unwrap_or_else(|| State::not_found(id.clone()))
            });
        Box::pin(async move { result })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let state = State::existing(resource.id.clone(), resource.attributes.clone())
            .with_identifier(assign_identifier(&resource.id));
        let sensitive = self.is_sensitive(&resource.id);
        let result = self.with_state(|file| {
            file.upsert_resource(RecordedResource::from_state(&state, sensitive));
            state
        });
        Box::pin(async move { result })
    }

    fn update(&self, from: &State, to: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let mut state = State::existing(to.id.clone(), to.attributes.clone());
        state.identifier = from.identifier.clone();
        let sensitive = self.is_sensitive(&to.id);
        let result = self.with_state(|file| {
            file.upsert_resource(RecordedResource::from_state(&state, sensitive));
            state
        });
        Box::pin(async move { result })
    }

    fn delete(&self, id: &ResourceId) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let result = self.with_state(|file| {
            file.remove_resource(&id.resource_type, &id.name);
        });
        Box::pin(async move { result })
    }
}
