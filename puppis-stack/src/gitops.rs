//! GitOps controller installation
//!
//! Declares the controller's initial manifest, applied through the
//! cluster's generated credential bundle. The manifest is read verbatim;
//! its internal schema belongs to the controller, not to Puppis.

use puppis_core::resource::{Resource, Value};

use crate::cluster::CLUSTER_BINDING;
use crate::config::{ConfigError, StackConfig};

/// Namespace the controller is installed into
pub const CONTROLLER_NAMESPACE: &str = "flux-system";
/// Binding of the install declaration
pub const GITOPS_BINDING: &str = "gitops";

/// Bundled controller install manifest, used when no override is configured
const DEFAULT_MANIFEST: &str = include_str!("../assets/gitops-install.yaml");

/// The declared controller install
#[derive(Debug)]
pub struct GitOpsInstall {
    pub resources: Vec<Resource>,
}

/// Declare the controller install.
///
/// Reads the override manifest when one is configured; otherwise the
/// bundled asset is used. Either way the content is passed through
/// untouched.
pub fn declare(config: &StackConfig) -> Result<GitOpsInstall, ConfigError> {
    let manifest = match &config.gitops_manifest_path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| ConfigError::ManifestRead {
            path: path.display().to_string(),
            message: e.to_string(),
        })?,
        None => DEFAULT_MANIFEST.to_string(),
    };

    let install = Resource::new("k8s.manifest_install", GITOPS_BINDING)
        .with_attribute("manifest", Value::String(manifest))
        .with_attribute(
            "namespace",
            Value::String(CONTROLLER_NAMESPACE.to_string()),
        )
        .with_attribute(
            "kubeconfig",
            Value::reference(CLUSTER_BINDING, "kubeconfig"),
        );

    Ok(GitOpsInstall {
        resources: vec![install],
    })
}
