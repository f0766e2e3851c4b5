//! Provider wire formats - NCCO call-control actions and API bodies

pub mod api;
pub mod ncco;

use bytes::Bytes;
use std::collections::BTreeMap;

/// Method used on every callback the provider makes to us
pub const EVENT_METHOD: &str = "POST";

/// Serialize the `{"_message": ...}` acknowledgment body.
///
/// Cannot fail for a literal string map; a failure here is a programming
/// defect, not a runtime condition.
pub fn ack_body(msg: &str) -> Bytes {
    let body = BTreeMap::from([("_message", msg)]);
    Bytes::from(serde_json::to_vec(&body).expect("serializing literal ack body"))
}
