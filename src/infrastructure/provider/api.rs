//! Provider call API request and webhook bodies

use serde::{Deserialize, Serialize};

use super::ncco::Action;

/// Application-level failure status on an otherwise successful response
pub const CALL_STATUS_FAILED: &str = "failed";

/// A phone endpoint on a call-creation request
#[derive(Debug, Clone, Serialize)]
pub struct Phone {
    #[serde(rename = "type")]
    pub kind: String,
    pub number: String,
}

impl Phone {
    /// A phone endpoint; the provider wants numbers without the leading `+`
    pub fn number(number: &str) -> Self {
        Self {
            kind: "phone".to_string(),
            number: number.trim_start_matches('+').to_string(),
        }
    }
}

/// Body of a call-creation request
#[derive(Debug, Clone, Default, Serialize)]
pub struct CallRequest {
    pub to: Vec<Phone>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Phone>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub answer_url: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub answer_method: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub event_url: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub event_method: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ncco: Vec<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ringing_timer: Option<u64>,
}

/// Response to a call-creation request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallResponse {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub direction: String,
    #[serde(default)]
    pub conversation_uuid: String,
}

/// Redirect an in-flight call to a new NCCO source
#[derive(Debug, Clone, Serialize)]
pub struct TransferRequest {
    pub action: String,
    pub destination: TransferDestination,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransferDestination {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: Vec<String>,
}

impl TransferRequest {
    pub fn to_ncco(url: &str) -> Self {
        Self {
            action: "transfer".to_string(),
            destination: TransferDestination {
                kind: "ncco".to_string(),
                url: vec![url.to_string()],
            },
        }
    }
}

/// Status webhook body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusEvent {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

/// Input (DTMF) webhook body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputEvent {
    #[serde(default)]
    pub dtmf: String,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub conversation_uuid: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Asynchronous recording-delivery webhook body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordingEvent {
    #[serde(default)]
    pub recording_url: String,
}

/// Call-handling webhook body, used to identify the call and participant
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallEvent {
    #[serde(default)]
    pub uuid: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub direction: String,
}
