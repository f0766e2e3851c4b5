//! Webhook and API authentication

pub mod signer;

pub use signer::Signer;
