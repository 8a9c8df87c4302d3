//! The application-level event type.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::attribute::{json_kind, AttributeValue};
use super::data::Data;
use crate::codec::EncodeError;

/// CloudEvents specification version stamped on new events.
pub const SPEC_VERSION: &str = "1.0";

/// Content type marking a payload as an embedded protobuf message.
pub const CONTENT_TYPE_PROTOBUF: &str = "application/protobuf";

pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Content type used by [`Event::with_bitcode`].
pub const CONTENT_TYPE_BITCODE: &str = "application/x-bitcode";

/// A structured event.
///
/// `id`, `source`, `spec_version` and `event_type` are required; the codec
/// refuses to encode or decode an event where any of them is empty.
///
/// ## Example
///
/// ```
/// use eventbus_client::Event;
///
/// let event = Event::new("evt-1", "order-service", "OrderCreated")
///     .with_subject("orders/42")
///     .with_extension("retry", 3)
///     .with_text("application/json", r#"{"id":"42"}"#);
///
/// assert_eq!(event.extension("retry").and_then(|v| v.as_integer()), Some(3));
/// assert_eq!(event.data_str(), Some(r#"{"id":"42"}"#));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub id: String,
    /// URI-reference identifying the producer
    pub source: String,
    pub spec_version: String,
    /// Event type (e.g., "OrderCreated")
    pub event_type: String,
    pub data_content_type: Option<String>,
    pub data_schema: Option<String>,
    pub subject: Option<String>,
    pub time: Option<DateTime<Utc>>,
    /// Extension attributes keyed by name
    pub extensions: BTreeMap<String, AttributeValue>,
    pub data: Option<Data>,
}

impl Event {
    /// Create an event with the required attributes and no payload.
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            spec_version: SPEC_VERSION.to_string(),
            event_type: event_type.into(),
            data_content_type: None,
            data_schema: None,
            subject: None,
            time: None,
            extensions: BTreeMap::new(),
            data: None,
        }
    }

    pub fn with_spec_version(mut self, spec_version: impl Into<String>) -> Self {
        self.spec_version = spec_version.into();
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_data_schema(mut self, schema: impl Into<String>) -> Self {
        self.data_schema = Some(schema.into());
        self
    }

    pub fn with_data_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.data_content_type = Some(content_type.into());
        self
    }

    /// Add (or replace) an extension attribute.
    pub fn with_extension(
        mut self,
        name: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.extensions.insert(name.into(), value.into());
        self
    }

    /// Add an extension attribute from an untyped JSON value.
    ///
    /// Fails with [`EncodeError::UnsupportedAttributeType`] when the value has
    /// no attribute representation (null, floats, arrays, objects, integers
    /// wider than 32 bits).
    pub fn try_with_extension_json(
        mut self,
        name: impl Into<String>,
        value: &Value,
    ) -> Result<Self, EncodeError> {
        let name = name.into();
        match AttributeValue::from_json(value) {
            Some(attr) => {
                self.extensions.insert(name, attr);
                Ok(self)
            }
            None => Err(EncodeError::UnsupportedAttributeType {
                name,
                kind: json_kind(value),
            }),
        }
    }

    pub fn extension(&self, name: &str) -> Option<&AttributeValue> {
        self.extensions.get(name)
    }

    /// Set a binary payload with the given content type.
    pub fn with_binary(mut self, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.data_content_type = Some(content_type.into());
        self.data = Some(Data::Binary(bytes));
        self
    }

    /// Set a text payload with the given content type.
    pub fn with_text(mut self, content_type: impl Into<String>, text: impl Into<String>) -> Self {
        self.data_content_type = Some(content_type.into());
        self.data = Some(Data::Text(text.into()));
        self
    }

    /// Embed an encoded protobuf message.
    ///
    /// Sets the content type to `application/protobuf` and the data schema to
    /// the message's type URL.
    pub fn with_message(mut self, type_url: impl Into<String>, value: Vec<u8>) -> Self {
        let type_url = type_url.into();
        self.data_content_type = Some(CONTENT_TYPE_PROTOBUF.to_string());
        self.data_schema = Some(type_url.clone());
        self.data = Some(Data::Message { type_url, value });
        self
    }

    /// Serialize `payload` as JSON text.
    pub fn with_json<T: serde::Serialize>(self, payload: &T) -> Result<Self, serde_json::Error> {
        let text = serde_json::to_string(payload)?;
        Ok(self.with_text(CONTENT_TYPE_JSON, text))
    }

    /// Serialize `payload` with bitcode into a binary payload.
    pub fn with_bitcode<T: serde::Serialize>(self, payload: &T) -> Result<Self, bitcode::Error> {
        let bytes = bitcode::serialize(payload)?;
        Ok(self.with_binary(CONTENT_TYPE_BITCODE, bytes))
    }

    /// Deserialize the payload as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(self.data_bytes().unwrap_or_default())
    }

    /// Decode the payload from bitcode binary format.
    pub fn decode_bitcode<T: serde::de::DeserializeOwned>(&self) -> Result<T, bitcode::Error> {
        bitcode::deserialize(self.data_bytes().unwrap_or_default())
    }

    /// Raw payload bytes, if any.
    pub fn data_bytes(&self) -> Option<&[u8]> {
        self.data.as_ref().map(Data::as_bytes)
    }

    /// Get the payload as a string (if valid UTF-8).
    pub fn data_str(&self) -> Option<&str> {
        self.data_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }
}
