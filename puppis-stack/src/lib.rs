//! Puppis Stack
//!
//! The built-in desired-state declaration: a managed Kubernetes cluster,
//! its network topology, identity bindings, a GitOps controller install,
//! and the secret wired into that controller. Each component is a typed
//! builder over `puppis_core::resource`; the assembled stack is a
//! validated DAG handed to an external reconciliation engine.

pub mod cluster;
pub mod config;
pub mod gitops;
pub mod identity;
pub mod network;
pub mod schemas;
pub mod secret;
pub mod stack;

pub use config::{ConfigError, StackConfig};
pub use stack::{Output, Stack, StackError};
