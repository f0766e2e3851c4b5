//! HTTP plumbing - inbound request view and outbound transport

pub mod request;
pub mod transport;

pub use request::WebhookRequest;
pub use transport::{ProviderTransport, Trace, Transport};
