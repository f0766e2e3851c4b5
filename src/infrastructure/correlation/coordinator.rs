//! Leg coordination across out-of-order provider callbacks
//!
//! A transfer splits one logical dial across two provider calls whose
//! lifecycle arrives on separate webhooks; a recording is acknowledged
//! synchronously but delivered on a later callback. Both are stitched
//! together through short-lived store entries: presence of an entry is the
//! coordination signal, never sequence numbers.

use bytes::Bytes;
use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::channel::CallId;
use crate::domain::resume::DialStatus;
use crate::domain::shared::{AdapterError, Result};
use crate::infrastructure::auth::Signer;
use crate::infrastructure::http::request::WebhookRequest;
use crate::infrastructure::http::transport::Transport;
use crate::infrastructure::provider::api::{RecordingEvent, StatusEvent, TransferRequest};
use crate::infrastructure::provider::ncco::Action;
use crate::infrastructure::provider::ack_body;
use crate::infrastructure::correlation::store::{CorrelationKey, CorrelationStore};

/// How long a transfer may stay outstanding before its entry expires
const TRANSFER_TTL: Duration = Duration::from_secs(3600);

/// Covers the gap between a leg's final status callback and its
/// completion callback
const DIAL_STATUS_TTL: Duration = Duration::from_secs(300);

/// How long a delivered recording URL waits to be picked up by polling
const RECORDING_TTL: Duration = Duration::from_secs(300);

/// Value of a transfer entry: where to resume the original call
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TransferEntry {
    call_id: String,
    resume_url: String,
}

/// What a resume-preprocessing pass decided; `Reply` short-circuits the
/// request with the given body instead of resuming the flow engine
pub enum Preprocessed {
    Continue,
    Reply(Bytes),
}

/// Coordinates transferred call legs and asynchronous recording delivery
#[derive(Clone)]
pub struct LegCoordinator {
    store: Arc<dyn CorrelationStore>,
    transport: Arc<dyn Transport>,
    signer: Arc<Signer>,
    call_url: String,
}

impl LegCoordinator {
    pub fn new(
        store: Arc<dyn CorrelationStore>,
        transport: Arc<dyn Transport>,
        signer: Arc<Signer>,
        call_url: String,
    ) -> Self {
        Self {
            store,
            transport,
            signer,
            call_url,
        }
    }

    /// Arm the transfer state machine for a newly created leg: while the
    /// transfer is outstanding, status callbacks for `leg` steer the
    /// original call identified by `call_id`.
    pub async fn register_transfer(
        &self,
        leg: &CallId,
        call_id: &CallId,
        resume_url: &str,
    ) -> Result<()> {
        let key = CorrelationKey::transfer(leg);
        let entry = TransferEntry {
            call_id: call_id.to_string(),
            resume_url: resume_url.to_string(),
        };
        let value = serde_json::to_string(&entry)?;
        self.store.set_with_ttl(&key, &value, TRANSFER_TTL).await?;
        debug!(%key, %value, "saved transfer entry for new leg");
        Ok(())
    }

    /// Status-webhook preprocessing: decide whether this callback belongs
    /// to a tracked transfer leg and act on it.
    ///
    /// Returns `None` when the callback needs no adapter-level action and
    /// the flow engine should see it normally; `Some(body)` acknowledges
    /// and consumes it.
    pub async fn preprocess_status(&self, request: &WebhookRequest) -> Result<Option<Bytes>> {
        if request.body().is_empty() {
            return Ok(None);
        }

        let event: StatusEvent = request.json()?;

        // mid-conversation transfer notifications carry no actionable state
        if event.kind == "transfer" {
            return Ok(Some(ack_body("ignoring conversation callback")));
        }

        // without both uuid and status this is just notification of the
        // conversation being established
        if event.uuid.is_empty() || event.status.is_empty() {
            return Ok(None);
        }

        let leg = CallId::new(event.uuid);
        let key = CorrelationKey::transfer(&leg);
        let raw = match self.store.get(&key).await? {
            Some(raw) => raw,
            None => return Ok(None),
        };
        debug!(%key, value = %raw, status = %event.status, "status callback for tracked leg");
        let entry: TransferEntry = serde_json::from_str(&raw)?;
        let call_id = CallId::new(entry.call_id);

        if event.status == "completed" {
            return self
                .complete_transfer(&call_id, &entry.resume_url, &event.duration)
                .await
                .map(Some);
        }

        // the leg isn't over yet; stash the normalized outcome so the
        // completion callback can resume with it
        match DialStatus::from_provider_status(&event.status) {
            Some(status) => {
                let status_key = CorrelationKey::dial_status(&call_id);
                self.store
                    .set_with_ttl(&status_key, status.as_str(), DIAL_STATUS_TTL)
                    .await?;
                debug!(key = %status_key, %status, %call_id, "saved intermediary dial status");
                Ok(Some(ack_body(&format!(
                    "updated status for call: {call_id} to: {status}"
                ))))
            }
            None => Ok(Some(ack_body("ignoring non final status for transfer leg"))),
        }
    }

    /// The transferred leg completed: resume NCCO control of the original
    /// call at its stored resumption URL, tagged with the dial outcome.
    async fn complete_transfer(
        &self,
        call_id: &CallId,
        resume_url: &str,
        duration: &str,
    ) -> Result<Bytes> {
        let status_key = CorrelationKey::dial_status(call_id);
        let status = self.store.get(&status_key).await?.ok_or_else(|| {
            AdapterError::CorrelationMiss(format!("unable to find call status for: {call_id}"))
        })?;

        let resume_url = self
            .signer
            .signed_url(&format!("{resume_url}&dial_status={status}&dial_duration={duration}"))?;

        let body = serde_json::to_value(TransferRequest::to_ncco(&resume_url))?;
        let trace = self
            .transport
            .send_json(Method::PUT, &format!("{}/{call_id}", self.call_url), &body)
            .await?;
        if trace.status != StatusCode::NO_CONTENT {
            return Err(AdapterError::Upstream(format!(
                "error reconnecting flow for call: {call_id}, received {}",
                trace.status.as_u16()
            )));
        }

        Ok(ack_body(&format!(
            "reconnected call: {call_id} to flow with dial status: {status}"
        )))
    }

    /// Resume-webhook preprocessing for the recording correlation paths.
    ///
    /// `wait_type=recording_url` is the provider's asynchronous delivery:
    /// store the URL and acknowledge. `wait_type=record` is our own
    /// polling input firing: hand the URL to the resume if present, or
    /// re-render the poll if not. Anything else passes through.
    pub async fn preprocess_resume(&self, request: &mut WebhookRequest) -> Result<Preprocessed> {
        match request.query_param("wait_type").as_deref() {
            Some("record") => {
                let uuid = self.recording_uuid(request, "record")?;
                let key = CorrelationKey::recording(&uuid);
                match self.store.get(&key).await? {
                    Some(recording_url) => {
                        info!(%recording_url, "found recording URL");
                        self.store.delete(&key).await?;
                        request.append_query("recording_url", &recording_url);
                        Ok(Preprocessed::Continue)
                    }
                    None => {
                        // recording not delivered yet; have the provider
                        // call us again in a second
                        let input = Action::poll_input(request.external_url());
                        let body = serde_json::to_vec(&vec![input])?;
                        Ok(Preprocessed::Reply(Bytes::from(body)))
                    }
                }
            }

            Some("recording_url") => {
                let uuid = self.recording_uuid(request, "recording_url")?;
                let event: RecordingEvent = request.json()?;
                if event.recording_url.is_empty() {
                    return Err(AdapterError::Malformed(
                        "no recording_url found in request".to_string(),
                    ));
                }
                let key = CorrelationKey::recording(&uuid);
                self.store
                    .set_with_ttl(&key, &event.recording_url, RECORDING_TTL)
                    .await?;
                Ok(Preprocessed::Reply(ack_body(&format!(
                    "inserted recording url: {} for uuid: {uuid}",
                    event.recording_url
                ))))
            }

            _ => Ok(Preprocessed::Continue),
        }
    }

    fn recording_uuid(&self, request: &WebhookRequest, wait_type: &str) -> Result<Uuid> {
        let raw = request
            .query_param("recording_uuid")
            .filter(|uuid| !uuid.is_empty())
            .ok_or_else(|| {
                AdapterError::Malformed(format!("{wait_type} resume without recording_uuid"))
            })?;
        Uuid::parse_str(&raw)
            .map_err(|_| AdapterError::Malformed(format!("invalid recording_uuid: {raw}")))
    }
}
