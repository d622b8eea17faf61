//! # EDDN Envelope and Frame Decoding
//!
//! Every frame published by the EDDN relay is a zlib-compressed UTF-8 JSON
//! document shaped like:
//!
//! ```text
//! { "$schemaRef": "...", "header": { ... }, "message": { "event": "Scan", ... } }
//! ```
//!
//! Only `message` (and its `event` discriminator) is consumed by name. The rest
//! of the envelope is carried untouched so it can be pretty-printed or archived
//! exactly as it arrived.

use flate2::read::ZlibDecoder;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::io::Read;
use thiserror::Error;

/// Failure at one of the decoding stages of a relay frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Failed to inflate frame: {0}")]
    Inflate(#[from] std::io::Error),

    #[error("Frame is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame top-level JSON value is not an object")]
    NotAnObject,
}

/// The outer decoded message: feed metadata plus one event payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    document: Map<String, Value>,
}

impl Envelope {
    /// Wraps an already parsed JSON value. Only objects are valid envelopes.
    pub fn from_value(value: Value) -> Result<Self, FrameError> {
        match value {
            Value::Object(document) => Ok(Self { document }),
            _ => Err(FrameError::NotAnObject),
        }
    }

    /// The nested `message` object. A missing or non-object `message` reads as
    /// an empty payload.
    pub fn payload(&self) -> EventPayload<'_> {
        EventPayload {
            fields: self.document.get("message").filter(|value| value.is_object()),
        }
    }

    /// Shortcut for `payload().event()`.
    pub fn event(&self) -> Option<&str> {
        self.payload().event()
    }

    /// Clone the whole document into a `serde_json::Value`.
    pub fn to_value(&self) -> Value {
        Value::Object(self.document.clone())
    }

    /// Pretty-printed with two-space indentation, keys in wire order.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.document)
    }
}

/// Inflate, UTF-8 decode and parse one relay frame.
pub fn decode_frame(frame: &[u8]) -> Result<Envelope, FrameError> {
    let mut inflated = Vec::with_capacity(frame.len() * 4);
    ZlibDecoder::new(frame).read_to_end(&mut inflated)?;

    let text = String::from_utf8(inflated)?;
    let value: Value = serde_json::from_str(&text)?;

    log::trace!("Decoded frame: {} bytes -> {} bytes", frame.len(), text.len());
    Envelope::from_value(value)
}

/// A borrowed view over the `message` object of an [`Envelope`].
#[derive(Debug, Clone, Copy)]
pub struct EventPayload<'a> {
    fields: Option<&'a Value>,
}

impl<'a> EventPayload<'a> {
    /// The `event` discriminator, if present and a string.
    pub fn event(&self) -> Option<&'a str> {
        self.get("event").and_then(Value::as_str)
    }

    /// Raw field lookup. JSON `null` is reported as absent.
    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.fields
            .and_then(|fields| fields.get(key))
            .filter(|value| !value.is_null())
    }

    /// Deserialize the payload into one of the typed event views in
    /// [`crate::eddn::events`].
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self.fields {
            Some(fields) => T::deserialize(fields),
            None => serde_json::from_value(Value::Object(Map::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use serde_json::json;
    use std::io::Write;

    fn compress(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn decodes_event_from_compressed_frame() {
        let doc = json!({
            "$schemaRef": "https://eddn.edcd.io/schemas/journal/1",
            "header": { "uploaderID": "abc", "softwareName": "EDMC" },
            "message": { "event": "FSSDiscoveryScan", "BodyCount": 12 }
        });
        let frame = compress(doc.to_string().as_bytes());

        let envelope = decode_frame(&frame).unwrap();
        assert_eq!(envelope.event(), Some("FSSDiscoveryScan"));
        assert_eq!(envelope.payload().get("BodyCount"), Some(&json!(12)));
        assert_eq!(envelope.to_value(), doc);
    }

    #[test]
    fn pretty_print_keeps_wire_order() {
        let raw = r#"{"$schemaRef":"s","header":{"b":1,"a":2},"message":{"event":"Scan"}}"#;
        let envelope = decode_frame(&compress(raw.as_bytes())).unwrap();
        let pretty = envelope.to_pretty_json().unwrap();

        let schema = pretty.find("$schemaRef").unwrap();
        let header = pretty.find("header").unwrap();
        let message = pretty.find("message").unwrap();
        assert!(schema < header && header < message);
        assert!(pretty.find("\"b\"").unwrap() < pretty.find("\"a\"").unwrap());
        assert!(pretty.contains("\n  \"header\""));
    }

    #[test]
    fn missing_message_reads_as_empty_payload() {
        let envelope = Envelope::from_value(json!({ "header": {} })).unwrap();
        assert_eq!(envelope.event(), None);
        assert!(envelope.payload().get("StarSystem").is_none());
    }

    #[test]
    fn null_fields_count_as_absent() {
        let envelope =
            Envelope::from_value(json!({ "message": { "event": "Scan", "StarType": null } }))
                .unwrap();
        assert!(envelope.payload().get("StarType").is_none());
    }

    #[test]
    fn rejects_uncompressed_frame() {
        let err = decode_frame(b"{\"message\":{}}").unwrap_err();
        assert!(matches!(err, FrameError::Inflate(_)));
    }

    #[test]
    fn rejects_invalid_utf8() {
        let err = decode_frame(&compress(&[0xff, 0xfe, 0xfd])).unwrap_err();
        assert!(matches!(err, FrameError::Utf8(_)));
    }

    #[test]
    fn rejects_invalid_json() {
        let err = decode_frame(&compress(b"{not json")).unwrap_err();
        assert!(matches!(err, FrameError::Json(_)));
    }

    #[test]
    fn rejects_non_object_document() {
        let err = decode_frame(&compress(b"[1, 2, 3]")).unwrap_err();
        assert!(matches!(err, FrameError::NotAnObject));
    }
}
