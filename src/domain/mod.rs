//! Domain layer - flow-engine-facing model
//!
//! The flow engine, its session state and its event model are external
//! collaborators; this layer holds the adapter's view of them: the channel
//! a call runs over, the session snapshot a script is rendered from, and
//! the normalized resume/status values handed back after a wait completes.

pub mod channel;
pub mod resume;
pub mod session;
pub mod shared;

// Re-export commonly used types
pub use shared::{AdapterError, Result};
