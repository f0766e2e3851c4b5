//! Request signing and webhook signature verification
//!
//! Outbound callback URLs carry an HMAC signature in a `sig` query
//! parameter; inbound webhooks on the call-handling endpoint are checked
//! against it. Outbound API calls authenticate with a short-lived RS256
//! token minted fresh per request.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::Serialize;
use sha1::Sha1;
use std::collections::BTreeMap;
use url::{Position, Url};

use crate::domain::shared::{AdapterError, Result};
use crate::infrastructure::http::request::WebhookRequest;

type HmacSha1 = Hmac<Sha1>;

/// Endpoint suffix that gets signature-checked. Other callback endpoints
/// carry no signature we could verify; a documented limitation.
const VERIFIED_PATH_SUFFIX: &str = "handle";

#[derive(Debug, Serialize)]
struct TokenClaims {
    application_id: String,
    jti: String,
    iat: i64,
}

/// Signs callback URLs and outbound API requests for one channel
pub struct Signer {
    app_id: String,
    encoding_key: EncodingKey,
    enforce_signatures: bool,
}

impl Signer {
    /// Build a signer from the channel's application id and RSA private
    /// key PEM. `enforce_signatures` exists for test harnesses only and
    /// must stay on in production paths.
    pub fn new(app_id: &str, private_key_pem: &str, enforce_signatures: bool) -> Result<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())?;
        Ok(Self {
            app_id: app_id.to_string(),
            encoding_key,
            enforce_signatures,
        })
    }

    /// Calculate the signature for a URL.
    ///
    /// The digest input is `scheme://host[:port]` + path followed by the
    /// query parameters sorted by key, each key immediately followed by the
    /// concatenation of its values. The `sig` parameter itself is excluded,
    /// so signing an already-signed URL is stable.
    pub fn sign(&self, raw_url: &str) -> Result<String> {
        let url = Url::parse(raw_url)?;

        let mut buffer = String::new();
        buffer.push_str(url.scheme());
        buffer.push_str("://");
        buffer.push_str(&url[Position::BeforeHost..Position::AfterPort]);
        buffer.push_str(url.path());

        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in url.query_pairs() {
            if key == "sig" {
                continue;
            }
            params.entry(key.into_owned()).or_default().push(value.into_owned());
        }
        for (key, values) in &params {
            buffer.push_str(key);
            for value in values {
                buffer.push_str(value);
            }
        }

        let mut mac = HmacSha1::new_from_slice(self.app_id.as_bytes())
            .map_err(|err| AdapterError::Signature(format!("unusable signing key: {err}")))?;
        mac.update(buffer.as_bytes());

        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Append a freshly calculated signature to a URL as its `sig`
    /// query parameter
    pub fn signed_url(&self, url: &str) -> Result<String> {
        let sig = self.sign(url)?;
        let sig: String = url::form_urlencoded::byte_serialize(sig.as_bytes()).collect();
        let separator = if url.contains('?') { '&' } else { '?' };
        Ok(format!("{url}{separator}sig={sig}"))
    }

    /// Verify the `sig` parameter on an inbound webhook.
    ///
    /// Only the call-handling endpoint is checked. Fails closed: a missing,
    /// empty or mismatched signature is a verification failure.
    pub fn verify(&self, request: &WebhookRequest) -> Result<()> {
        if !self.enforce_signatures {
            return Ok(());
        }

        if !request.path().ends_with(VERIFIED_PATH_SUFFIX) {
            return Ok(());
        }

        let actual = request.query_param("sig").unwrap_or_default();
        if actual.is_empty() {
            return Err(AdapterError::Signature("missing request sig".to_string()));
        }

        let url = request.external_url();
        let expected = self.sign(&url)?;
        if expected != actual {
            return Err(AdapterError::Signature(format!(
                "mismatch in signatures for url: {url}"
            )));
        }
        Ok(())
    }

    /// Mint a fresh bearer token for one outbound API call. Tokens are
    /// never cached or reused.
    pub fn make_token(&self) -> Result<String> {
        let claims = TokenClaims {
            application_id: self.app_id.clone(),
            jti: rand::random::<u64>().to_string(),
            iat: Utc::now().timestamp(),
        };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, Method};

    const TEST_KEY: &str = include_str!("../../../tests/fixtures/rsa_private_key.pem");

    fn signer() -> Signer {
        Signer::new("app-id-123", TEST_KEY, true).unwrap()
    }

    fn request_for(url: &str) -> WebhookRequest {
        WebhookRequest::new(
            Method::POST,
            Url::parse(url).unwrap(),
            HeaderMap::new(),
            Bytes::new(),
        )
    }

    #[test]
    fn test_sign_is_order_independent() {
        let signer = signer();
        let a = signer
            .sign("https://ivr.example.com/c/1/handle?b=2&a=1&a=3")
            .unwrap();
        let b = signer
            .sign("https://ivr.example.com/c/1/handle?a=1&a=3&b=2")
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sign_excludes_sig_param() {
        let signer = signer();
        let unsigned = signer
            .sign("https://ivr.example.com/c/1/handle?a=1")
            .unwrap();
        let signed = signer
            .sign("https://ivr.example.com/c/1/handle?a=1&sig=whatever")
            .unwrap();
        assert_eq!(unsigned, signed);
    }

    #[test]
    fn test_sign_is_keyed() {
        let a = signer()
            .sign("https://ivr.example.com/c/1/handle?a=1")
            .unwrap();
        let b = Signer::new("other-app", TEST_KEY, true)
            .unwrap()
            .sign("https://ivr.example.com/c/1/handle?a=1")
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_verify_round_trip() {
        let signer = signer();
        let url = "https://ivr.example.com/c/1/handle?wait_type=gather".to_string();
        let sig = signer.sign(&url).unwrap();

        let mut req = request_for(&url);
        req.append_query("sig", &sig);
        assert!(signer.verify(&req).is_ok());
    }

    #[test]
    fn test_verify_rejects_tampered_query() {
        let signer = signer();
        let url = "https://ivr.example.com/c/1/handle?wait_type=gather".to_string();
        let sig = signer.sign(&url).unwrap();

        let mut req =
            request_for("https://ivr.example.com/c/1/handle?wait_type=record");
        req.append_query("sig", &sig);
        assert!(matches!(
            signer.verify(&req),
            Err(AdapterError::Signature(_))
        ));
    }

    #[test]
    fn test_verify_rejects_missing_sig() {
        let signer = signer();
        let req = request_for("https://ivr.example.com/c/1/handle?wait_type=gather");
        assert!(matches!(
            signer.verify(&req),
            Err(AdapterError::Signature(_))
        ));
    }

    #[test]
    fn test_verify_skips_other_endpoints() {
        let signer = signer();
        let req = request_for("https://ivr.example.com/c/1/status");
        assert!(signer.verify(&req).is_ok());
    }

    #[test]
    fn test_verify_skips_when_not_enforced() {
        let signer = Signer::new("app-id-123", TEST_KEY, false).unwrap();
        let req = request_for("https://ivr.example.com/c/1/handle?wait_type=gather");
        assert!(signer.verify(&req).is_ok());
    }

    #[test]
    fn test_verify_honors_forwarded_path() {
        let signer = signer();
        let external = "https://ivr.example.com/proxied/handle?wait_type=gather".to_string();
        let sig = signer.sign(&external).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            crate::infrastructure::http::request::FORWARDED_PATH_HEADER,
            format!(
                "/proxied/handle?wait_type=gather&sig={}",
                url::form_urlencoded::byte_serialize(sig.as_bytes()).collect::<String>()
            )
            .parse()
            .unwrap(),
        );
        let req = WebhookRequest::new(
            Method::POST,
            Url::parse(&format!(
                "https://ivr.example.com/internal/handle?wait_type=gather&sig={}",
                url::form_urlencoded::byte_serialize(sig.as_bytes()).collect::<String>()
            ))
            .unwrap(),
            headers,
            Bytes::new(),
        );
        assert!(signer.verify(&req).is_ok());
    }

    #[test]
    fn test_signed_url_round_trips_through_verify() {
        let signer = signer();
        let url = signer
            .signed_url("https://ivr.example.com/c/1/handle?wait_type=dial&dial_status=answered")
            .unwrap();
        assert!(url.contains("&sig="));
        assert!(signer.verify(&request_for(&url)).is_ok());
    }

    #[test]
    fn test_signed_url_without_query_uses_question_mark() {
        let signer = signer();
        let url = signer
            .signed_url("https://ivr.example.com/c/1/status")
            .unwrap();
        assert!(url.contains("/status?sig="));
    }

    #[test]
    fn test_make_token_has_three_segments() {
        let token = signer().make_token().unwrap();
        assert_eq!(token.split('.').count(), 3);
    }
}
