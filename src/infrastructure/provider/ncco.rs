//! NCCO call-control script actions
//!
//! A script is a JSON array of these actions; array order is the playback
//! and execution order on the live call.

use serde::Serialize;

/// Seconds a digit-gather input waits for the caller
pub const GATHER_TIMEOUT_SECS: u64 = 30;

/// Digit cap when the wait gives no hint
pub const DEFAULT_MAX_DIGITS: u32 = 20;

/// Seconds a recording may run before the provider cuts it off
pub const RECORD_TIMEOUT_SECS: u64 = 600;

/// Seconds of silence that end a recording
pub const RECORD_END_ON_SILENCE_SECS: u64 = 5;

/// Timeout of the short input that polls for an asynchronous recording
pub const POLL_INPUT_TIMEOUT_SECS: u64 = 1;

/// One call-control action
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    /// Speak `text` to the caller
    #[serde(rename_all = "camelCase")]
    Talk {
        text: String,
        barge_in: bool,
        #[serde(rename = "_error", skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    /// Play hosted audio
    #[serde(rename_all = "camelCase")]
    Stream { stream_url: Vec<String> },

    /// Gather DTMF digits and POST them to the event URL
    #[serde(rename_all = "camelCase")]
    Input {
        #[serde(skip_serializing_if = "Option::is_none")]
        max_digits: Option<u32>,
        submit_on_hash: bool,
        time_out: u64,
        event_url: Vec<String>,
        event_method: String,
    },

    /// Record the caller; the recording URL arrives on a later callback
    #[serde(rename_all = "camelCase")]
    Record {
        end_on_key: String,
        time_out: u64,
        end_on_silence: u64,
        event_url: Vec<String>,
        event_method: String,
    },

    /// Join this call into a named conversation
    Conversation { name: String },
}

impl Action {
    /// The 1-second input used to poll until an asynchronous recording
    /// callback has landed
    pub fn poll_input(event_url: String) -> Self {
        Action::Input {
            max_digits: None,
            submit_on_hash: true,
            time_out: POLL_INPUT_TIMEOUT_SECS,
            event_url: vec![event_url],
            event_method: super::EVENT_METHOD.to_string(),
        }
    }
}
