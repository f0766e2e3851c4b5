//! Session-to-script translation
//!
//! Renders a session snapshot into the ordered action list the provider
//! executes next on the live call. Pure translation, except that honoring
//! a dial wait requires synchronously creating the transfer leg.

use http::{Method, StatusCode};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::domain::channel::{CallId, Channel};
use crate::domain::session::{PendingWait, Session, SessionEvent, SessionStatus};
use crate::domain::shared::{AdapterError, Result};
use crate::infrastructure::auth::Signer;
use crate::infrastructure::correlation::LegCoordinator;
use crate::infrastructure::http::transport::Transport;
use crate::infrastructure::provider::api::{CallRequest, CallResponse, Phone};
use crate::infrastructure::provider::ncco::{
    Action, DEFAULT_MAX_DIGITS, GATHER_TIMEOUT_SECS, POLL_INPUT_TIMEOUT_SECS,
    RECORD_END_ON_SILENCE_SECS, RECORD_TIMEOUT_SECS,
};
use crate::infrastructure::provider::EVENT_METHOD;

/// Builds call-control scripts for one channel's calls
#[derive(Clone)]
pub struct ScriptBuilder {
    signer: Arc<Signer>,
    transport: Arc<dyn Transport>,
    coordinator: LegCoordinator,
    call_url: String,
}

impl ScriptBuilder {
    pub fn new(
        signer: Arc<Signer>,
        transport: Arc<dyn Transport>,
        coordinator: LegCoordinator,
        call_url: String,
    ) -> Self {
        Self {
            signer,
            transport,
            coordinator,
            call_url,
        }
    }

    /// Render the next script for `session` on the call identified by
    /// `call_id`. Event-derived actions come first, wait actions last.
    pub async fn build(
        &self,
        channel: &Channel,
        call_id: &CallId,
        session: &Session,
        resume_url: &str,
    ) -> Result<String> {
        if session.status() == SessionStatus::Failed {
            return Err(AdapterError::SessionState(
                "cannot build a script for a failed session".to_string(),
            ));
        }
        let sprint = session.sprint().ok_or_else(|| {
            AdapterError::SessionState("cannot build a script for a session with no sprint".to_string())
        })?;

        let mut wait_actions = Vec::new();
        if let Some(wait) = session.wait() {
            match wait {
                PendingWait::Digits { max_digits } => {
                    let event_url = self
                        .signer
                        .signed_url(&format!("{resume_url}&wait_type=gather"))?;
                    wait_actions.push(Action::Input {
                        max_digits: Some(max_digits.unwrap_or(DEFAULT_MAX_DIGITS)),
                        submit_on_hash: true,
                        time_out: GATHER_TIMEOUT_SECS,
                        event_url: vec![event_url],
                        event_method: EVENT_METHOD.to_string(),
                    });
                }

                PendingWait::Recording => {
                    // the provider does not deliver recordings synchronously:
                    // it moves on in the script and calls the record action's
                    // event URL later, when the recording is ready. The
                    // record action stores under a correlation uuid, and a
                    // 1-second input keeps re-invoking us until the uuid has
                    // a recording behind it.
                    let recording_uuid = Uuid::new_v4();
                    let record_url = self.signer.signed_url(&format!(
                        "{resume_url}&wait_type=recording_url&recording_uuid={recording_uuid}"
                    ))?;
                    wait_actions.push(Action::Record {
                        end_on_key: "#".to_string(),
                        time_out: RECORD_TIMEOUT_SECS,
                        end_on_silence: RECORD_END_ON_SILENCE_SECS,
                        event_url: vec![record_url],
                        event_method: EVENT_METHOD.to_string(),
                    });

                    let poll_url = self.signer.signed_url(&format!(
                        "{resume_url}&wait_type=record&recording_uuid={recording_uuid}"
                    ))?;
                    wait_actions.push(Action::Input {
                        max_digits: None,
                        submit_on_hash: true,
                        time_out: POLL_INPUT_TIMEOUT_SECS,
                        event_url: vec![poll_url],
                        event_method: EVENT_METHOD.to_string(),
                    });
                }

                PendingWait::Dial {
                    destination,
                    timeout_secs,
                } => {
                    // a transfer is a second call joined to this one under a
                    // shared conversation name; we then track that leg's
                    // status callbacks and restart script control of the
                    // original call once it completes
                    let conversation = Uuid::new_v4().to_string();
                    wait_actions.push(Action::Conversation {
                        name: conversation.clone(),
                    });

                    let request = CallRequest {
                        to: vec![Phone::number(destination.path())],
                        from: Some(Phone::number(channel.address())),
                        ncco: vec![Action::Conversation { name: conversation }],
                        ringing_timer: *timeout_secs,
                        ..Default::default()
                    };
                    let trace = self
                        .transport
                        .send_json(Method::POST, &self.call_url, &serde_json::to_value(&request)?)
                        .await?;
                    debug!(status = trace.status.as_u16(), "initiated new call for transfer");
                    if trace.status != StatusCode::CREATED {
                        return Err(AdapterError::Upstream(format!(
                            "received non 201 status for call start: {}",
                            trace.status.as_u16()
                        )));
                    }

                    let response: CallResponse = serde_json::from_slice(&trace.response_body)
                        .map_err(|_| {
                            AdapterError::Upstream(
                                "unable to read call uuid from transfer response".to_string(),
                            )
                        })?;
                    if response.uuid.is_empty() {
                        return Err(AdapterError::Upstream(
                            "unable to read call uuid from transfer response".to_string(),
                        ));
                    }

                    let event_url = format!("{resume_url}&wait_type=dial");
                    self.coordinator
                        .register_transfer(&CallId::new(response.uuid), call_id, &event_url)
                        .await?;
                }
            }
        }

        // barge-in only makes sense when digits are being gathered next
        let is_wait_input = matches!(wait_actions.first(), Some(Action::Input { .. }));

        let mut actions = Vec::new();
        for event in sprint.events() {
            match event {
                SessionEvent::MessageSpoken(msg) => {
                    if msg.attachments().is_empty() {
                        actions.push(Action::Talk {
                            text: msg.text().to_string(),
                            barge_in: is_wait_input,
                            error: None,
                        });
                    } else {
                        for attachment in msg.attachments() {
                            actions.push(Action::Stream {
                                stream_url: vec![attachment.url().to_string()],
                            });
                        }
                    }
                }
            }
        }

        actions.extend(wait_actions);

        Ok(serde_json::to_string(&actions)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::channel::Urn;
    use crate::domain::session::{Attachment, SpokenMessage, Sprint};
    use crate::infrastructure::correlation::{CorrelationKey, CorrelationStore, MemoryStore};
    use crate::infrastructure::http::transport::{MockTransport, Trace};
    use bytes::Bytes;
    use std::collections::HashMap;

    const TEST_KEY: &str = include_str!("../../tests/fixtures/rsa_private_key.pem");
    const CALL_URL: &str = "https://api.nexmo.com/v1/calls";
    const RESUME_URL: &str = "https://ivr.example.com/c/1234/handle?action=resume";

    fn builder(store: Arc<MemoryStore>, transport: MockTransport) -> ScriptBuilder {
        let signer = Arc::new(Signer::new("app-id-123", TEST_KEY, true).unwrap());
        let transport: Arc<dyn Transport> = Arc::new(transport);
        let coordinator = LegCoordinator::new(
            store,
            transport.clone(),
            signer.clone(),
            CALL_URL.to_string(),
        );
        ScriptBuilder::new(signer, transport, coordinator, CALL_URL.to_string())
    }

    fn channel() -> Channel {
        Channel::new("+15559876543", HashMap::new())
    }

    fn session(wait: Option<PendingWait>, events: Vec<SessionEvent>) -> Session {
        Session::new(SessionStatus::Active, wait, Some(Sprint::new(events)))
    }

    fn spoken(text: &str) -> SessionEvent {
        SessionEvent::MessageSpoken(SpokenMessage::new(text, vec![]))
    }

    async fn render(builder: &ScriptBuilder, session: &Session) -> serde_json::Value {
        let script = builder
            .build(&channel(), &CallId::new("call-1"), session, RESUME_URL)
            .await
            .unwrap();
        serde_json::from_str(&script).unwrap()
    }

    #[tokio::test]
    async fn test_message_only_script() {
        let builder = builder(Arc::new(MemoryStore::new()), MockTransport::new());
        let session = session(None, vec![spoken("hello world")]);

        let script = builder
            .build(&channel(), &CallId::new("call-1"), &session, RESUME_URL)
            .await
            .unwrap();
        assert_eq!(
            script,
            r#"[{"action":"talk","text":"hello world","bargeIn":false}]"#
        );
    }

    #[tokio::test]
    async fn test_attachments_render_as_streams_in_order() {
        let builder = builder(Arc::new(MemoryStore::new()), MockTransport::new());
        let msg = SpokenMessage::new(
            "ignored",
            vec![
                Attachment::audio("https://media.example.com/a.mp3"),
                Attachment::audio("https://media.example.com/b.mp3"),
            ],
        );
        let session = session(None, vec![SessionEvent::MessageSpoken(msg)]);

        let value = render(&builder, &session).await;
        assert_eq!(value[0]["action"], "stream");
        assert_eq!(value[0]["streamUrl"][0], "https://media.example.com/a.mp3");
        assert_eq!(value[1]["streamUrl"][0], "https://media.example.com/b.mp3");
    }

    #[tokio::test]
    async fn test_gather_wait_with_hint() {
        let builder = builder(Arc::new(MemoryStore::new()), MockTransport::new());
        let session = session(
            Some(PendingWait::Digits {
                max_digits: Some(4),
            }),
            vec![spoken("enter your pin")],
        );

        let value = render(&builder, &session).await;
        assert_eq!(value[0]["action"], "talk");
        assert_eq!(value[0]["bargeIn"], true);
        assert_eq!(value[1]["action"], "input");
        assert_eq!(value[1]["maxDigits"], 4);
        assert_eq!(value[1]["timeOut"], 30);
        assert_eq!(value[1]["submitOnHash"], true);
        let event_url = value[1]["eventUrl"][0].as_str().unwrap();
        assert!(event_url.contains("wait_type=gather"));
        assert!(event_url.contains("sig="));
    }

    #[tokio::test]
    async fn test_gather_wait_defaults_to_twenty_digits() {
        let builder = builder(Arc::new(MemoryStore::new()), MockTransport::new());
        let session = session(Some(PendingWait::Digits { max_digits: None }), vec![]);

        let value = render(&builder, &session).await;
        assert_eq!(value[0]["maxDigits"], 20);
    }

    #[tokio::test]
    async fn test_record_wait_renders_record_then_poll_input() {
        let builder = builder(Arc::new(MemoryStore::new()), MockTransport::new());
        let session = session(Some(PendingWait::Recording), vec![spoken("after the beep")]);

        let value = render(&builder, &session).await;
        // record is first of the wait actions, so the talk may not barge in
        assert_eq!(value[0]["action"], "talk");
        assert_eq!(value[0]["bargeIn"], false);
        assert_eq!(value[1]["action"], "record");
        assert_eq!(value[1]["endOnKey"], "#");
        assert_eq!(value[1]["timeOut"], 600);
        assert_eq!(value[1]["endOnSilence"], 5);
        assert_eq!(value[2]["action"], "input");
        assert_eq!(value[2]["timeOut"], 1);

        let record_url = value[1]["eventUrl"][0].as_str().unwrap();
        let poll_url = value[2]["eventUrl"][0].as_str().unwrap();
        assert!(record_url.contains("wait_type=recording_url"));
        assert!(poll_url.contains("wait_type=record&"));

        let uuid_of = |url: &str| {
            url.split("recording_uuid=")
                .nth(1)
                .unwrap()
                .split('&')
                .next()
                .unwrap()
                .to_string()
        };
        assert_eq!(uuid_of(record_url), uuid_of(poll_url));
    }

    #[tokio::test]
    async fn test_dial_wait_creates_transfer_leg() {
        let store = Arc::new(MemoryStore::new());
        let mut transport = MockTransport::new();
        transport
            .expect_send_json()
            .withf(|method, url, body| {
                *method == Method::POST
                    && url == CALL_URL
                    && body["to"][0]["number"] == "15551234567"
                    && body["from"]["number"] == "15559876543"
                    && body["ncco"][0]["action"] == "conversation"
                    && body["ringing_timer"] == 30
                    && body.get("answer_url").is_none()
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(Trace {
                    method: Method::POST,
                    url: CALL_URL.to_string(),
                    request_body: String::new(),
                    status: StatusCode::CREATED,
                    response_body: Bytes::from_static(
                        br#"{"uuid":"leg-9","status":"started","direction":"outbound","conversation_uuid":"CON-1"}"#,
                    ),
                })
            });

        let builder = builder(store.clone(), transport);
        let session = session(
            Some(PendingWait::Dial {
                destination: Urn::tel("+15551234567"),
                timeout_secs: Some(30),
            }),
            vec![],
        );

        let value = render(&builder, &session).await;
        assert_eq!(value[0]["action"], "conversation");

        let entry = store
            .get(&CorrelationKey::transfer(&CallId::new("leg-9")))
            .await
            .unwrap()
            .expect("transfer entry stored");
        assert!(entry.contains("call-1"));
        assert!(entry.contains("wait_type=dial"));
    }

    #[tokio::test]
    async fn test_dial_wait_aborts_on_failed_creation() {
        let mut transport = MockTransport::new();
        transport.expect_send_json().returning(|_, _, _| {
            Ok(Trace {
                method: Method::POST,
                url: CALL_URL.to_string(),
                request_body: String::new(),
                status: StatusCode::UNAUTHORIZED,
                response_body: Bytes::new(),
            })
        });

        let builder = builder(Arc::new(MemoryStore::new()), transport);
        let session = session(
            Some(PendingWait::Dial {
                destination: Urn::tel("+15551234567"),
                timeout_secs: None,
            }),
            vec![],
        );

        let err = builder
            .build(&channel(), &CallId::new("call-1"), &session, RESUME_URL)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_failed_session_is_refused() {
        let builder = builder(Arc::new(MemoryStore::new()), MockTransport::new());
        let session = Session::new(SessionStatus::Failed, None, Some(Sprint::default()));

        let err = builder
            .build(&channel(), &CallId::new("call-1"), &session, RESUME_URL)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::SessionState(_)));
    }

    #[tokio::test]
    async fn test_sprintless_session_is_refused() {
        let builder = builder(Arc::new(MemoryStore::new()), MockTransport::new());
        let session = Session::new(SessionStatus::Active, None, None);

        let err = builder
            .build(&channel(), &CallId::new("call-1"), &session, RESUME_URL)
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::SessionState(_)));
    }
}
