//! Session snapshot consumed when rendering a call-control script
//!
//! The flow engine owns session state; the adapter sees an immutable
//! snapshot per script-build call: the session's status, what it is
//! blocked on (if anything), and the events its last sprint produced.

use serde::{Deserialize, Serialize};

use super::channel::Urn;

/// What a session is blocked on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingWait {
    /// Waiting for DTMF digits, optionally capped at a digit count
    Digits { max_digits: Option<u32> },
    /// Waiting for an audio recording of the caller
    Recording,
    /// Waiting for a transferred call leg to complete
    Dial {
        destination: Urn,
        timeout_secs: Option<u64>,
    },
}

/// Session lifecycle status as reported by the flow engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Active,
    Completed,
    Failed,
}

/// A media attachment on a spoken message, `content_type` + URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    content_type: String,
    url: String,
}

impl Attachment {
    pub fn audio(url: impl Into<String>) -> Self {
        Self {
            content_type: "audio".to_string(),
            url: url.into(),
        }
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// A message the session wants spoken/played on the call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpokenMessage {
    text: String,
    attachments: Vec<Attachment>,
}

impl SpokenMessage {
    pub fn new(text: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            text: text.into(),
            attachments,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}

/// An event produced by the session during its last sprint
///
/// The engine emits more event kinds than the adapter consumes; only the
/// ones that render into call-control actions appear here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    MessageSpoken(SpokenMessage),
}

/// The events produced by one engine step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprint {
    events: Vec<SessionEvent>,
}

impl Sprint {
    pub fn new(events: Vec<SessionEvent>) -> Self {
        Self { events }
    }

    /// Events in engine-emitted order
    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }
}

/// Immutable session snapshot for one script-build call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    status: SessionStatus,
    wait: Option<PendingWait>,
    sprint: Option<Sprint>,
}

impl Session {
    pub fn new(status: SessionStatus, wait: Option<PendingWait>, sprint: Option<Sprint>) -> Self {
        Self {
            status,
            wait,
            sprint,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn wait(&self) -> Option<&PendingWait> {
        self.wait.as_ref()
    }

    pub fn sprint(&self) -> Option<&Sprint> {
        self.sprint.as_ref()
    }
}
