//! Channel and addressing value objects

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Provider-assigned call leg identifier
///
/// Opaque to the adapter; the provider owns the call, we only hold a
/// reference and transient correlation state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallId(String);

impl CallId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// URN identifying a call participant, e.g. `tel:+15551234567`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Urn(String);

impl Urn {
    /// Build a telephone URN, normalizing to a `+`-prefixed number
    pub fn tel(number: &str) -> Self {
        let number = number.trim_start_matches('+');
        Self(format!("tel:+{number}"))
    }

    /// The path portion of the URN (the `+`-prefixed number for tel urns)
    pub fn path(&self) -> &str {
        match self.0.split_once(':') {
            Some((_, path)) => path,
            None => &self.0,
        }
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A configured voice channel
///
/// Channel rows live in the orchestrator's relational store; the adapter
/// consumes only the address and the per-channel config map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    address: String,
    config: HashMap<String, String>,
}

impl Channel {
    pub fn new(address: impl Into<String>, config: HashMap<String, String>) -> Self {
        Self {
            address: address.into(),
            config,
        }
    }

    /// The channel's own phone number, `+`-prefixed
    pub fn address(&self) -> &str {
        &self.address
    }

    /// A per-channel config value, if set
    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tel_urn_normalizes_prefix() {
        assert_eq!(Urn::tel("15551234567").path(), "+15551234567");
        assert_eq!(Urn::tel("+15551234567").path(), "+15551234567");
    }

    #[test]
    fn test_channel_config_lookup() {
        let channel = Channel::new(
            "+15559876543",
            HashMap::from([("app_id".to_string(), "abc".to_string())]),
        );
        assert_eq!(channel.config_value("app_id"), Some("abc"));
        assert_eq!(channel.config_value("private_key"), None);
    }
}
