//! JSON structured mode.
//!
//! The HTTP push receiver accepts events in the CloudEvents JSON format, either
//! a single object or an array of objects. Each object is first turned into a
//! wire envelope so that it flows through the same [`decode`](super::decode)
//! path as protobuf deliveries.
//!
//! JSON cannot distinguish a URI, a URI-reference, bytes or a timestamp from a
//! plain string, so extensions arrive as booleans, integers or strings.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use super::{
    attribute_for, timestamp_to_wire, validate_extension_name, Attr, CloudEvent,
    CloudEventAttributeValue, DecodeError, EncodeError, EnvelopeData, ATTR_DATA_CONTENT_TYPE,
    ATTR_DATA_SCHEMA, ATTR_SUBJECT, ATTR_TIME,
};
use crate::event::{AttributeValue, Data, Event};

/// Convert one JSON-encoded event into a wire envelope.
pub fn envelope_from_json(value: &Value) -> Result<CloudEvent, DecodeError> {
    let object = value
        .as_object()
        .ok_or_else(|| DecodeError::InvalidJson("expected a JSON object".into()))?;

    let mut envelope = CloudEvent {
        id: string_field(object, "id")?,
        source: string_field(object, "source")?,
        spec_version: string_field(object, "specversion")?,
        event_type: string_field(object, "type")?,
        ..Default::default()
    };

    for (name, value) in object {
        match name.as_str() {
            "id" | "source" | "specversion" | "type" => {}
            "data" => {
                envelope.data = match value {
                    Value::Null => None,
                    Value::String(text) => Some(EnvelopeData::TextData(text.clone())),
                    other => Some(EnvelopeData::BinaryData(other.to_string().into_bytes())),
                };
            }
            "data_base64" => {
                let encoded = value.as_str().ok_or_else(|| {
                    DecodeError::InvalidJson("`data_base64` must be a string".into())
                })?;
                let bytes = STANDARD
                    .decode(encoded)
                    .map_err(|e| DecodeError::InvalidJson(format!("`data_base64`: {}", e)))?;
                envelope.data = Some(EnvelopeData::BinaryData(bytes));
            }
            ATTR_TIME => {
                let text = value.as_str().ok_or_else(|| DecodeError::AttributeTypeMismatch {
                    name: name.clone(),
                    expected: "timestamp",
                })?;
                let time = DateTime::parse_from_rfc3339(text).map_err(|_| {
                    DecodeError::InvalidTimestamp { name: name.clone() }
                })?;
                envelope.attributes.insert(
                    name.clone(),
                    CloudEventAttributeValue::new(Attr::CeTimestamp(timestamp_to_wire(
                        &time.with_timezone(&Utc),
                    ))),
                );
            }
            _ => {
                let attr = AttributeValue::from_json(value).ok_or_else(|| {
                    DecodeError::UnsupportedAttributeType { name: name.clone() }
                })?;
                envelope.attributes.insert(name.clone(), attribute_for(&attr));
            }
        }
    }

    Ok(envelope)
}

/// Convert a request body holding one event or an array of events.
///
/// Results are per element so that one malformed event does not reject the
/// rest of the batch.
pub fn envelopes_from_json(body: &Value) -> Vec<Result<CloudEvent, DecodeError>> {
    match body {
        Value::Array(items) => items.iter().map(envelope_from_json).collect(),
        single => vec![envelope_from_json(single)],
    }
}

/// Render an event in the JSON structured format.
///
/// An embedded protobuf message is written as `data_base64`; when the event
/// has no data schema the message's type URL is written as `dataschema`.
pub fn event_to_json(event: &Event) -> Result<Value, EncodeError> {
    let mut object = Map::new();
    object.insert("id".into(), Value::String(event.id.clone()));
    object.insert("source".into(), Value::String(event.source.clone()));
    object.insert("specversion".into(), Value::String(event.spec_version.clone()));
    object.insert("type".into(), Value::String(event.event_type.clone()));
    if let Some(content_type) = &event.data_content_type {
        object.insert(ATTR_DATA_CONTENT_TYPE.into(), Value::String(content_type.clone()));
    }
    let schema = match (&event.data_schema, &event.data) {
        (Some(schema), _) => Some(schema),
        (None, Some(Data::Message { type_url, .. })) => Some(type_url),
        _ => None,
    };
    if let Some(schema) = schema {
        object.insert(ATTR_DATA_SCHEMA.into(), Value::String(schema.clone()));
    }
    if let Some(subject) = &event.subject {
        object.insert(ATTR_SUBJECT.into(), Value::String(subject.clone()));
    }
    if let Some(time) = &event.time {
        object.insert(
            ATTR_TIME.into(),
            Value::String(time.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        );
    }

    for (name, value) in &event.extensions {
        validate_extension_name(name)?;
        let json = match value {
            AttributeValue::Boolean(b) => Value::Bool(*b),
            AttributeValue::Integer(i) => Value::from(*i),
            other => Value::String(other.to_string()),
        };
        object.insert(name.clone(), json);
    }

    match &event.data {
        Some(Data::Text(text)) => {
            object.insert("data".into(), Value::String(text.clone()));
        }
        Some(data) => {
            object.insert(
                "data_base64".into(),
                Value::String(STANDARD.encode(data.as_bytes())),
            );
        }
        None => {}
    }

    Ok(Value::Object(object))
}

fn string_field(object: &Map<String, Value>, name: &str) -> Result<String, DecodeError> {
    match object.get(name) {
        None => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(DecodeError::InvalidJson(format!("`{}` must be a string", name))),
    }
}
