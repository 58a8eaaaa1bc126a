//! Task lifecycle and reputation engine.
//!
//! - [`controller`]: the state machine behind every task operation
//! - [`roster`]: applicant roster and single-assignee rules
//! - [`reputation`]: role-scoped rating recomputation

pub mod controller;
pub mod error;
pub mod reputation;
pub mod roster;

pub use controller::TaskLifecycle;
pub use error::LifecycleError;
