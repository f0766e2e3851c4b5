//! Traced HTTP transport for outbound provider API calls

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, StatusCode};
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::domain::shared::Result;
use crate::infrastructure::auth::Signer;

/// Full request/response record of one provider API call, kept for
/// logging and status-code inspection by callers
#[derive(Debug, Clone)]
pub struct Trace {
    pub method: Method,
    pub url: String,
    pub request_body: String,
    pub status: StatusCode,
    pub response_body: Bytes,
}

/// Outbound HTTP seam to the provider API
///
/// Never retries; retry policy, if any, belongs to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// JSON-marshal `body` and send it with a freshly minted bearer token,
    /// returning the full trace regardless of status code
    async fn send_json(&self, method: Method, url: &str, body: &Value) -> Result<Trace>;

    /// Authenticated GET for provider-hosted media such as recordings
    async fn download_media(&self, url: &str) -> Result<Trace>;
}

/// Production transport backed by reqwest
pub struct ProviderTransport {
    http: reqwest::Client,
    signer: Arc<Signer>,
}

impl ProviderTransport {
    pub fn new(signer: Arc<Signer>) -> Self {
        Self {
            http: reqwest::Client::new(),
            signer,
        }
    }

    pub fn with_client(http: reqwest::Client, signer: Arc<Signer>) -> Self {
        Self { http, signer }
    }
}

#[async_trait]
impl Transport for ProviderTransport {
    async fn send_json(&self, method: Method, url: &str, body: &Value) -> Result<Trace> {
        let token = self.signer.make_token()?;
        let request_body = body.to_string();

        let response = self
            .http
            .request(method.clone(), url)
            .bearer_auth(token)
            .header(ACCEPT, "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let response_body = response.bytes().await?;
        debug!(%method, url, status = status.as_u16(), "provider api call");

        Ok(Trace {
            method,
            url: url.to_string(),
            request_body,
            status,
            response_body,
        })
    }

    async fn download_media(&self, url: &str) -> Result<Trace> {
        let token = self.signer.make_token()?;

        let response = self.http.get(url).bearer_auth(token).send().await?;

        let status = response.status();
        let response_body = response.bytes().await?;
        debug!(url, status = status.as_u16(), "media download");

        Ok(Trace {
            method: Method::GET,
            url: url.to_string(),
            request_body: String::new(),
            status,
            response_body,
        })
    }
}
