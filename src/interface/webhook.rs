//! Webhook interpretation - inbound requests to normalized resume/status values

use tracing::{error, info};

use crate::domain::resume::{ConnectionStatus, DialStatus, Resume};
use crate::domain::session::Attachment;
use crate::domain::shared::{AdapterError, Result};
use crate::infrastructure::http::request::WebhookRequest;
use crate::infrastructure::provider::api::{InputEvent, StatusEvent};

/// The resume value carried by an inbound resumption request, dispatched
/// on its `wait_type` marker
pub fn resume_for_request(request: &WebhookRequest) -> Result<Resume> {
    // this could be empty, in which case we resume with no input at all
    if request.query_param("empty").as_deref() == Some("true") {
        return Ok(Resume::Empty);
    }

    match request.query_param("wait_type").as_deref() {
        Some("gather") => {
            let input: InputEvent = request.json()?;
            if input.timed_out {
                return Ok(Resume::Empty);
            }
            Ok(Resume::Digits(input.dtmf))
        }

        Some("record") => {
            // populated by the leg coordinator once the asynchronous
            // recording callback has landed; empty means not ready yet
            match request.query_param("recording_url") {
                Some(url) if !url.is_empty() => {
                    info!(recording_url = %url, "input found recording");
                    Ok(Resume::Attachment(Attachment::audio(url)))
                }
                _ => Ok(Resume::Empty),
            }
        }

        Some("dial") => {
            let status = request
                .query_param("dial_status")
                .filter(|status| !status.is_empty())
                .ok_or_else(|| {
                    AdapterError::Malformed("unable to find dial_status in query url".to_string())
                })?;
            let status: DialStatus = status.parse()?;

            let duration = match request.query_param("dial_duration") {
                Some(raw) if !raw.is_empty() => raw.parse::<u64>().map_err(|_| {
                    AdapterError::Malformed("non-integer duration in query url".to_string())
                })?,
                _ => 0,
            };

            info!(%status, duration, "input found dial status and duration");
            Ok(Resume::Dial { status, duration })
        }

        other => Err(AdapterError::Malformed(format!(
            "unknown wait_type: {}",
            other.unwrap_or("")
        ))),
    }
}

/// The connection status (and duration, when known) carried by an inbound
/// status request. Interpretation failures degrade to errored/failed
/// rather than propagating: a status webhook always gets an answer.
pub fn status_for_request(request: &WebhookRequest) -> (ConnectionStatus, u64) {
    // a resume means the call is in progress, no need to look at the body
    if request.query_param("action").as_deref() == Some("resume") {
        return (ConnectionStatus::InProgress, 0);
    }

    let status: StatusEvent = match request.json() {
        Ok(status) => status,
        Err(err) => {
            error!(error = %err, "error parsing status request body");
            return (ConnectionStatus::Errored, 0);
        }
    };

    // transfer status callbacks have no status, safe to ignore them
    if status.status.is_empty() {
        return (ConnectionStatus::InProgress, 0);
    }

    match status.status.as_str() {
        "started" | "ringing" => (ConnectionStatus::Wired, 0),

        "answered" => (ConnectionStatus::InProgress, 0),

        "completed" => {
            let duration = status.duration.parse().unwrap_or(0);
            (ConnectionStatus::Completed, duration)
        }

        "rejected" | "busy" | "unanswered" | "timeout" | "failed" | "machine" => {
            (ConnectionStatus::Errored, 0)
        }

        other => {
            error!(status = other, "unknown call status in status callback");
            (ConnectionStatus::Failed, 0)
        }
    }
}
