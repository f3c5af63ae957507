//! Puppis State Management
//!
//! Persists the converged state of the built-in stack so a later plan can
//! diff against it. Remote backends belong to the external reconciliation
//! engine; the local JSON backend here is enough to make re-planning an
//! already-converged stack a no-op.
//!
//! - **StateFile**: all recorded resources plus lineage/serial metadata
//! - **StateBackend**: storage trait (local file today)
//! - **LockInfo**: lock metadata guarding concurrent plan/apply runs

pub mod backend;
pub mod backends;
pub mod lock;
pub mod state;

pub use backend::{BackendConfig, BackendError, BackendResult, StateBackend};
pub use backends::create_backend;
pub use lock::LockInfo;
pub use state::{RecordedResource, StateFile};
