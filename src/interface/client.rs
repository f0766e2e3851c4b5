//! Client facade - the adapter's public contract
//!
//! One client per channel; the orchestrator's plugin registry constructs
//! it through [`Client::from_channel`] when it sees this channel type.

use bytes::Bytes;
use http::{header::CONTENT_TYPE, Method, Response, StatusCode};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::domain::channel::{CallId, Channel, Urn};
use crate::domain::resume::{ConnectionStatus, Resume};
use crate::domain::session::Session;
use crate::domain::shared::{AdapterError, Result};
use crate::infrastructure::auth::Signer;
use crate::infrastructure::correlation::{CorrelationStore, LegCoordinator, Preprocessed};
use crate::infrastructure::http::request::WebhookRequest;
use crate::infrastructure::http::transport::{ProviderTransport, Trace, Transport};
use crate::infrastructure::provider::api::{CallEvent, CallRequest, CallResponse, Phone, CALL_STATUS_FAILED};
use crate::infrastructure::provider::ncco::Action;
use crate::infrastructure::provider::{ack_body, EVENT_METHOD};
use crate::interface::script::ScriptBuilder;
use crate::interface::webhook;

/// Channel type this adapter registers under
pub const CHANNEL_TYPE: &str = "VN";

/// Channel config key holding the provider application id
pub const APP_ID_CONFIG: &str = "app_id";

/// Channel config key holding the RSA private key PEM
pub const PRIVATE_KEY_CONFIG: &str = "private_key";

/// What gets said when a call cannot be continued
pub const ERROR_MESSAGE: &str = "An error has occurred, please try again later.";

/// A successfully requested call: the provider-assigned id plus the trace
/// of the creation request
#[derive(Debug, Clone)]
pub struct CallStart {
    pub call_id: CallId,
    pub trace: Trace,
}

/// The call-control adapter for one voice channel
pub struct Client {
    channel: Channel,
    signer: Arc<Signer>,
    transport: Arc<dyn Transport>,
    coordinator: LegCoordinator,
    script: ScriptBuilder,
    call_url: String,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("channel", &self.channel)
            .field("call_url", &self.call_url)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Construct a client from the channel's configuration; the registry
    /// hook. Requires `app_id` and `private_key` on the channel config.
    pub fn from_channel(
        channel: Channel,
        config: &Config,
        store: Arc<dyn CorrelationStore>,
    ) -> Result<Self> {
        let app_id = channel.config_value(APP_ID_CONFIG).unwrap_or_default();
        let private_key = channel.config_value(PRIVATE_KEY_CONFIG).unwrap_or_default();
        if app_id.is_empty() || private_key.is_empty() {
            return Err(AdapterError::Config(format!(
                "missing {APP_ID_CONFIG} or {PRIVATE_KEY_CONFIG} on channel config"
            )));
        }

        let signer = Arc::new(Signer::new(
            app_id,
            private_key,
            config.auth.enforce_signatures,
        )?);
        let transport: Arc<dyn Transport> = Arc::new(ProviderTransport::new(signer.clone()));
        Ok(Self::new(channel, config, signer, transport, store))
    }

    /// Construct with an injected transport; what tests use
    pub fn new(
        channel: Channel,
        config: &Config,
        signer: Arc<Signer>,
        transport: Arc<dyn Transport>,
        store: Arc<dyn CorrelationStore>,
    ) -> Self {
        let call_url = config.provider.call_url.clone();
        let coordinator = LegCoordinator::new(
            store,
            transport.clone(),
            signer.clone(),
            call_url.clone(),
        );
        let script = ScriptBuilder::new(
            signer.clone(),
            transport.clone(),
            coordinator.clone(),
            call_url.clone(),
        );
        Self {
            channel,
            signer,
            transport,
            coordinator,
            script,
            call_url,
        }
    }

    /// The provider call id carried by a call-handling webhook
    pub fn call_id_for_request(&self, request: &WebhookRequest) -> Result<CallId> {
        let event: CallEvent = request.json()?;
        if event.uuid.is_empty() {
            return Err(AdapterError::Malformed("no uuid set on call".to_string()));
        }
        Ok(CallId::new(event.uuid))
    }

    /// The participant URN carried by a call-handling webhook; inbound
    /// calls identify by `from`, outbound by `to`
    pub fn urn_for_request(&self, request: &WebhookRequest) -> Result<Urn> {
        let event: CallEvent = request.json()?;
        let number = match event.direction.as_str() {
            "outbound" => event.to,
            _ => event.from,
        };
        if number.is_empty() {
            return Err(AdapterError::Malformed("no urn found in body".to_string()));
        }
        Ok(Urn::tel(&number))
    }

    /// Request a new outgoing call, with callbacks pointed at the signed
    /// resume and status URLs
    pub async fn request_call(
        &self,
        number: &Urn,
        resume_url: &str,
        status_url: &str,
    ) -> Result<CallStart> {
        let request = CallRequest {
            to: vec![Phone::number(number.path())],
            from: Some(Phone::number(self.channel.address())),
            answer_url: vec![self.signer.signed_url(resume_url)?],
            answer_method: EVENT_METHOD.to_string(),
            event_url: vec![self.signer.signed_url(status_url)?],
            event_method: EVENT_METHOD.to_string(),
            ..Default::default()
        };

        let trace = self
            .transport
            .send_json(Method::POST, &self.call_url, &serde_json::to_value(&request)?)
            .await?;
        if trace.status != StatusCode::CREATED {
            return Err(AdapterError::Upstream(format!(
                "received non 201 status for call start: {}",
                trace.status.as_u16()
            )));
        }

        let response: CallResponse = serde_json::from_slice(&trace.response_body)
            .map_err(|_| AdapterError::Upstream("unable to read call uuid".to_string()))?;
        if response.uuid.is_empty() {
            return Err(AdapterError::Upstream("unable to read call uuid".to_string()));
        }
        // the provider can accept the request and still fail the call
        if response.status == CALL_STATUS_FAILED {
            return Err(AdapterError::Upstream(
                "call status returned as failed".to_string(),
            ));
        }

        debug!(
            uuid = %response.uuid,
            conversation_uuid = %response.conversation_uuid,
            status = trace.status.as_u16(),
            "requested call"
        );

        Ok(CallStart {
            call_id: CallId::new(response.uuid),
            trace,
        })
    }

    /// Ask the provider to hang up a call; success is strictly 204
    pub async fn hangup(&self, call_id: &CallId) -> Result<Trace> {
        let url = format!("{}/{call_id}", self.call_url);
        let body = serde_json::json!({ "action": "hangup" });
        let trace = self.transport.send_json(Method::PUT, &url, &body).await?;
        if trace.status != StatusCode::NO_CONTENT {
            return Err(AdapterError::Upstream(format!(
                "received non 204 status for call hangup: {}",
                trace.status.as_u16()
            )));
        }
        Ok(trace)
    }

    /// Authenticated download of a provider-hosted recording
    pub async fn download_media(&self, url: &str) -> Result<Trace> {
        self.transport.download_media(url).await
    }

    /// Status-webhook entry point for the leg coordinator; `None` means
    /// the callback needs no adapter-level action
    pub async fn preprocess_status(&self, request: &WebhookRequest) -> Result<Option<Bytes>> {
        self.coordinator.preprocess_status(request).await
    }

    /// Resume-webhook entry point for the recording correlation path
    pub async fn preprocess_resume(&self, request: &mut WebhookRequest) -> Result<Option<Bytes>> {
        match self.coordinator.preprocess_resume(request).await? {
            Preprocessed::Continue => Ok(None),
            Preprocessed::Reply(body) => Ok(Some(body)),
        }
    }

    pub fn resume_for_request(&self, request: &WebhookRequest) -> Result<Resume> {
        webhook::resume_for_request(request)
    }

    pub fn status_for_request(&self, request: &WebhookRequest) -> (ConnectionStatus, u64) {
        webhook::status_for_request(request)
    }

    pub fn validate_signature(&self, request: &WebhookRequest) -> Result<()> {
        self.signer.verify(request)
    }

    /// Render the session's next script as the webhook response. Any build
    /// failure degrades to the fixed error script so the live call always
    /// receives a valid body.
    pub async fn write_response(
        &self,
        session: &Session,
        call_id: &CallId,
        resume_url: &str,
    ) -> Result<Response<Bytes>> {
        let body = match self
            .script
            .build(&self.channel, call_id, session, resume_url)
            .await
        {
            Ok(script) => Bytes::from(script),
            Err(err) => {
                warn!(error = %err, "responding with error script");
                return Ok(self.error_response(&err));
            }
        };
        Ok(json_response(body))
    }

    /// The fixed error script: end the call gracefully instead of leaving
    /// it hanging on an empty body
    pub fn error_response(&self, err: &AdapterError) -> Response<Bytes> {
        let actions = vec![Action::Talk {
            text: ERROR_MESSAGE.to_string(),
            barge_in: false,
            error: Some(err.to_string()),
        }];
        let body = serde_json::to_vec(&actions).expect("serializing literal error script");
        json_response(Bytes::from(body))
    }

    /// An empty but valid acknowledgment response
    pub fn empty_response(&self, msg: &str) -> Response<Bytes> {
        json_response(ack_body(msg))
    }
}

fn json_response(body: Bytes) -> Response<Bytes> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .expect("building response from literal parts")
}
