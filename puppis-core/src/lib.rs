//! Puppis Core
//!
//! Core library for a declarative infrastructure tool: typed resource
//! declarations, a dependency graph over their cross-references, and the
//! diff/plan/apply pipeline consumed by an execution provider.

pub mod differ;
pub mod effect;
pub mod graph;
pub mod interpreter;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod schema;
