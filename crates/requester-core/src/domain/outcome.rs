//! Outcome model: the normalized shape of an HTTP response.
//!
//! Whatever the upstream returns, the executor reduces it to
//! `{status, headers, data}` so consumers of the output channel only ever see
//! one shape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Normalized HTTP result carried by a Completed envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOutput {
    pub status: u16,

    /// One value per header name.
    pub headers: BTreeMap<String, String>,

    /// Parsed JSON body, or the raw body text when it is not JSON.
    pub data: serde_json::Value,
}

impl RequestOutput {
    pub fn new(status: u16, headers: BTreeMap<String, String>, body: String) -> Self {
        Self {
            status,
            headers,
            data: parse_body(body),
        }
    }
}

/// Flatten raw header pairs into one value per name.
///
/// Pairs are applied in the order the transport yields them, so for a
/// multi-valued header the last value wins.
pub fn flatten_headers<I, K, V>(pairs: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut headers = BTreeMap::new();
    for (name, value) in pairs {
        headers.insert(name.into(), value.into());
    }
    headers
}

/// Best-effort JSON decode; any parse failure yields the text unchanged.
pub fn parse_body(body: String) -> serde_json::Value {
    match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(_) => serde_json::Value::String(body),
    }
}
