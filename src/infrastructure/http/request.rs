//! Inbound webhook request view
//!
//! The HTTP server that routes provider callbacks lives outside this crate;
//! entry points receive this owned view of a request instead. Body bytes are
//! captured up front, so reads cannot fail mid-handling - parse failures are
//! the error path.

use bytes::Bytes;
use http::{HeaderMap, Method};
use serde::de::DeserializeOwned;
use url::{Position, Url};

use crate::domain::shared::{AdapterError, Result};

/// Header a reverse proxy sets to the externally visible path + query
pub const FORWARDED_PATH_HEADER: &str = "x-forwarded-path";

/// An inbound provider webhook, as seen by the adapter's entry points
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
}

impl WebhookRequest {
    pub fn new(method: Method, url: Url, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// Build from `http` request parts plus the already-read body.
    ///
    /// Relative request targets are resolved against the `Host` header;
    /// external transport is always https.
    pub fn from_parts(parts: &http::request::Parts, body: Bytes) -> Result<Self> {
        let url = if parts.uri.scheme().is_some() {
            Url::parse(&parts.uri.to_string())?
        } else {
            let host = parts
                .headers
                .get(http::header::HOST)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| AdapterError::Malformed("request without a host".to_string()))?;
            Url::parse(&format!("https://{}{}", host, parts.uri))?
        };

        Ok(Self {
            method: parts.method.clone(),
            url,
            headers: parts.headers.clone(),
            body,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The request path, e.g. `/ivr/c/1234/handle`
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Host (and explicit port, if any) the request was addressed to
    pub fn host(&self) -> &str {
        &self.url[Position::BeforeHost..Position::AfterPort]
    }

    /// Path plus query string, as sent on the request line
    pub fn request_uri(&self) -> &str {
        &self.url[Position::BeforePath..Position::AfterQuery]
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// First value of a query parameter, percent-decoded
    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// Append a query parameter; used to thread correlation results into
    /// the request before the interpreter reads it
    pub fn append_query(&mut self, name: &str, value: &str) {
        self.url.query_pairs_mut().append_pair(name, value);
    }

    /// The externally visible URL for this request, honoring a reverse
    /// proxy's path override
    pub fn external_url(&self) -> String {
        match self.header(FORWARDED_PATH_HEADER) {
            Some(path) => format!("https://{}{}", self.host(), path),
            None => format!("https://{}{}", self.host(), self.request_uri()),
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Parse the body as JSON; any failure is a malformed-input error
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|err| AdapterError::Malformed(format!("invalid json body: {err}")))
    }
}
