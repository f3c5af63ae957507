//! Access-token secret for the GitOps controller
//!
//! One opaque secret in the controller's namespace, keyed by a fixed
//! field name. A missing token degrades to an empty string; the field is
//! always present, never omitted.

use std::collections::HashMap;

use puppis_core::resource::{Resource, Value};

use crate::cluster::CLUSTER_BINDING;
use crate::config::StackConfig;
use crate::gitops::GITOPS_BINDING;

/// Name of the secret object
pub const SECRET_NAME: &str = "gitops-access-token";
/// Fixed payload field name
pub const TOKEN_FIELD: &str = "token";
/// Binding of the secret declaration
pub const SECRET_BINDING: &str = "access_token_secret";

/// The declared secret
#[derive(Debug)]
pub struct TokenSecret {
    pub resources: Vec<Resource>,
}

/// Declare the secret in the controller's namespace.
pub fn declare(config: &StackConfig) -> TokenSecret {
    let mut data = HashMap::new();
    data.insert(
        TOKEN_FIELD.to_string(),
        Value::String(config.access_token.clone()),
    );

    let secret = Resource::new("k8s.secret", SECRET_NAME)
        .with_binding(SECRET_BINDING)
        .with_sensitive(true)
        .with_attribute("namespace", Value::reference(GITOPS_BINDING, "namespace"))
        .with_attribute("secret_type", Value::String("Opaque".to_string()))
        .with_attribute("string_data", Value::Map(data))
        .with_attribute(
            "kubeconfig",
            Value::reference(CLUSTER_BINDING, "kubeconfig"),
        );

    TokenSecret {
        resources: vec![secret],
    }
}
