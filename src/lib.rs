//! Switchboard - call-control adapter for the Vonage voice API
//!
//! Translates a flow session's pending wait and newly produced events into
//! NCCO call-control scripts, authenticates the provider's asynchronous
//! webhooks, and reconciles call legs whose lifecycle is split across
//! multiple out-of-order HTTP callbacks.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::AdapterError;
pub use domain::shared::result::Result;
pub use interface::client::Client;
