//! Task description: the single message consumed from the input channel.
//!
//! Wire shape: `{"inputs": {"url": string, "method"?: string, "headers"?: object, "body"?: any}}`

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use super::errors::ValidationError;

pub const DEFAULT_METHOD: &str = "GET";

/// Methods whose case is normalized; anything else is sent as written.
const NORMALIZED_METHODS: [&str; 6] = ["DELETE", "GET", "HEAD", "OPTIONS", "POST", "PUT"];

/// The task as delivered by the external publisher.
///
/// A message without `inputs` decodes to empty inputs, so it fails later with
/// the usual missing-URL error instead of a decode error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskDescription {
    #[serde(default)]
    pub inputs: RequestInputs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestInputs {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub method: Option<String>,

    #[serde(default, deserialize_with = "header_map")]
    pub headers: BTreeMap<String, String>,

    /// `null` is treated the same as an absent body.
    #[serde(default)]
    pub body: Option<serde_json::Value>,
}

impl TaskDescription {
    /// Decode one raw input-channel message.
    pub fn parse(message: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(message).map_err(|e| ValidationError::MalformedMessage(e.to_string()))
    }
}

impl RequestInputs {
    /// The target URL; absent or empty is a validation failure.
    pub fn url(&self) -> Result<&str, ValidationError> {
        match self.url.as_deref() {
            Some(url) if !url.is_empty() => Ok(url),
            _ => Err(ValidationError::MissingUrl),
        }
    }

    /// Upper-cased method, `GET` when absent or empty.
    pub fn method(&self) -> Result<String, ValidationError> {
        let method = match self.method.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => m,
            _ => return Ok(DEFAULT_METHOD.to_string()),
        };
        if !method.bytes().all(is_token_char) {
            return Err(ValidationError::InvalidMethod(method.to_string()));
        }
        let normalized = NORMALIZED_METHODS
            .iter()
            .find(|known| known.eq_ignore_ascii_case(method))
            .map_or_else(|| method.to_string(), |known| known.to_string());
        Ok(normalized)
    }

    /// JSON text of the body, if one should be sent.
    pub fn body_text(&self) -> Option<String> {
        self.body.as_ref().map(|body| body.to_string())
    }
}

/// RFC 9110 `tchar`.
fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

/// Header values may arrive as strings, numbers or booleans; they are all sent
/// as text. `null` drops the header.
fn header_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut headers = BTreeMap::new();
    for (name, value) in raw {
        let value = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => {
                return Err(D::Error::custom(format!(
                    "header '{name}' must be a string, number or boolean, got {other}"
                )));
            }
        };
        headers.insert(name, value);
    }
    Ok(headers)
}
