//! Ephemeral correlation state bridging out-of-order provider callbacks

pub mod coordinator;
pub mod store;

pub use coordinator::{LegCoordinator, Preprocessed};
pub use store::{CorrelationKey, CorrelationStore, MemoryStore};
