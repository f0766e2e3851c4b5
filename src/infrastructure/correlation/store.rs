//! Correlation store capability and typed keys
//!
//! The store is the only shared mutable resource in the adapter. Every
//! entry carries an explicit TTL so calls that never complete cannot leak
//! state; absence of an entry is a normal condition on polling paths.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::domain::channel::CallId;
use crate::domain::shared::Result;

/// A namespaced correlation key
///
/// Built through the typed constructors only, so transfer, dial-status and
/// recording entries can never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    /// Keyed by the transferred leg's call id; holds the original call's
    /// id and resumption URL while the transfer is outstanding
    pub fn transfer(leg: &CallId) -> Self {
        Self(format!("transfer:{leg}"))
    }

    /// Keyed by the original call's id; holds the normalized dial outcome
    /// between the leg's final status callback and its completion callback
    pub fn dial_status(call: &CallId) -> Self {
        Self(format!("dial-status:{call}"))
    }

    /// Keyed by the correlation uuid minted when a record wait is
    /// rendered; holds the recording URL once it arrives
    pub fn recording(uuid: &Uuid) -> Self {
        Self(format!("recording:{uuid}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Injected store capability: atomic per-key get/set-with-TTL/delete
#[async_trait]
pub trait CorrelationStore: Send + Sync {
    /// The live value for a key, or `None` if absent or expired
    async fn get(&self, key: &CorrelationKey) -> Result<Option<String>>;

    /// Idempotent overwrite; re-setting the same value refreshes the TTL
    async fn set_with_ttl(&self, key: &CorrelationKey, value: &str, ttl: Duration) -> Result<()>;

    async fn delete(&self, key: &CorrelationKey) -> Result<()>;
}

/// In-process store with TTL expiry
///
/// The single-process default and the test double; a zero TTL expires an
/// entry immediately, which is how tests exercise expiry.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CorrelationStore for MemoryStore {
    async fn get(&self, key: &CorrelationKey) -> Result<Option<String>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key.as_str()) {
            Some((value, deadline)) if Instant::now() < *deadline => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key.as_str());
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(&self, key: &CorrelationKey, value: &str, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.as_str().to_string(), (value.to_string(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &CorrelationKey) -> Result<()> {
        self.entries.lock().unwrap().remove(key.as_str());
        Ok(())
    }
}
