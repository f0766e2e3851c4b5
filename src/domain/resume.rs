//! Normalized resume and status values fed back into the flow engine

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::session::Attachment;
use super::shared::AdapterError;

/// Outcome of a dialed/transferred call leg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DialStatus {
    Answered,
    Busy,
    NoAnswer,
    Failed,
}

impl DialStatus {
    /// Map a provider leg status to a dial outcome. Only recognized final
    /// states map; anything else is not worth storing.
    pub fn from_provider_status(status: &str) -> Option<Self> {
        match status {
            "answered" => Some(DialStatus::Answered),
            "busy" => Some(DialStatus::Busy),
            "timeout" | "rejected" => Some(DialStatus::NoAnswer),
            "cancelled" | "canceled" | "failed" => Some(DialStatus::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DialStatus::Answered => "answered",
            DialStatus::Busy => "busy",
            DialStatus::NoAnswer => "no_answer",
            DialStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for DialStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DialStatus {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "answered" => Ok(DialStatus::Answered),
            "busy" => Ok(DialStatus::Busy),
            "no_answer" => Ok(DialStatus::NoAnswer),
            "failed" => Ok(DialStatus::Failed),
            other => Err(AdapterError::Malformed(format!(
                "unknown dial status: {other}"
            ))),
        }
    }
}

/// The resume value for a completed (or timed out) wait
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resume {
    /// No input; timeouts and no-op resumptions
    Empty,
    /// Gathered DTMF digits
    Digits(String),
    /// A captured recording, as an audio attachment
    Attachment(Attachment),
    /// A transferred leg's outcome with its duration in seconds
    Dial { status: DialStatus, duration: u64 },
}

/// Connection status of the call itself, derived from status webhooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// Call placed, not yet answered
    Wired,
    /// Call answered and under script control
    InProgress,
    /// Call ended normally
    Completed,
    /// Call ended without connecting
    Errored,
    /// Status could not be interpreted
    Failed,
}
