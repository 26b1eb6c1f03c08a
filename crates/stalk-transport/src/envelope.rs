//! Job payload format: a JSON object with a `body` string and a `headers` map.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;

/// Message headers as carried in the envelope.
pub type Headers = BTreeMap<String, Value>;

#[derive(Serialize)]
struct Outgoing<'a> {
    body: &'a str,
    headers: Value,
}

#[derive(Deserialize)]
struct Incoming {
    body: String,
    #[serde(default)]
    headers: Headers,
}

/// Serialize `body` and `headers` into job data. `headers` must serialize to
/// a JSON object.
pub(crate) fn encode<H: Serialize + ?Sized>(body: &str, headers: &H) -> Result<Vec<u8>, TransportError> {
    let headers = serde_json::to_value(headers).map_err(TransportError::Encode)?;
    if !headers.is_object() {
        return Err(TransportError::InvalidHeaders {
            kind: kind_of(&headers),
        });
    }
    serde_json::to_vec(&Outgoing { body, headers }).map_err(TransportError::Encode)
}

/// Parse job data back into body and headers.
pub(crate) fn decode(id: u64, data: &[u8]) -> Result<(String, Headers), TransportError> {
    let incoming: Incoming = serde_json::from_slice(data).map_err(|source| TransportError::Decode {
        id: id.to_string(),
        source,
    })?;
    Ok((incoming.body, incoming.headers))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    #[test]
    fn encodes_exactly_body_and_headers() {
        let mut headers = HashMap::new();
        headers.insert("type", "welcome");
        let data = encode("hello", &headers).unwrap();

        let value: Value = serde_json::from_slice(&data).unwrap();
        assert_eq!(value, json!({"body": "hello", "headers": {"type": "welcome"}}));
    }

    #[test]
    fn decode_reads_back_nested_headers() {
        let data = br#"{"body":"hi","headers":{"attempt":2,"trace":{"id":"abc"}}}"#;
        let (body, headers) = decode(7, data).unwrap();
        assert_eq!(body, "hi");
        assert_eq!(headers["attempt"], json!(2));
        assert_eq!(headers["trace"], json!({"id": "abc"}));
    }

    #[test]
    fn missing_headers_decode_as_empty() {
        let (body, headers) = decode(1, br#"{"body":"x"}"#).unwrap();
        assert_eq!(body, "x");
        assert!(headers.is_empty());
    }

    #[test]
    fn non_map_headers_are_rejected() {
        let err = encode("x", &vec![1, 2]).unwrap_err();
        assert!(matches!(err, TransportError::InvalidHeaders { kind: "an array" }));
        let err = encode("x", &()).unwrap_err();
        assert!(matches!(err, TransportError::InvalidHeaders { kind: "null" }));
    }

    #[test]
    fn unserializable_headers_fail_to_encode() {
        let mut headers = HashMap::new();
        headers.insert(vec![1u8], "tuple keys are not strings");
        let err = encode("x", &headers).unwrap_err();
        assert!(matches!(err, TransportError::Encode(_)));
    }

    #[test]
    fn invalid_payload_names_job() {
        let err = decode(42, b"not json").unwrap_err();
        match err {
            TransportError::Decode { id, .. } => assert_eq!(id, "42"),
            other => panic!("expected Decode, got {other:?}"),
        }
    }
}
