//! Envelope codec - pure conversion between [`Event`] and [`CloudEvent`].
//!
//! ```text
//! Event ──encode──▶ CloudEvent { id, source, spec_version, event_type,
//!                                attributes: name → CloudEventAttributeValue,
//!                                data: binary | text | proto }
//!       ◀─decode──
//! ```
//!
//! Optional context attributes travel in the attribute map under their
//! CloudEvents names (`datacontenttype`, `dataschema`, `subject`, `time`) and
//! are demultiplexed back into their dedicated fields on decode. Every other
//! attribute name is an extension.
//!
//! Payloads whose content type is `application/protobuf` travel as an embedded
//! `google.protobuf.Any` keyed by the data schema and always decode to
//! [`Data::Message`]. Binary payloads are assigned byte for byte; nothing is
//! re-encoded.

mod envelope;
mod error;
pub mod json;

pub use envelope::{
    Attr, CloudEvent, CloudEventAttributeValue, CloudEventBatch, Envelope, EnvelopeData,
};
pub use error::{DecodeError, EncodeError};

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use prost_types::{Any, Timestamp};
use url::Url;

use crate::event::{AttributeValue, Data, Event, UriRef, CONTENT_TYPE_PROTOBUF};

pub const ATTR_DATA_CONTENT_TYPE: &str = "datacontenttype";
pub const ATTR_DATA_SCHEMA: &str = "dataschema";
pub const ATTR_SUBJECT: &str = "subject";
pub const ATTR_TIME: &str = "time";

/// Names that may not be used for extensions.
const RESERVED_NAMES: &[&str] = &[
    "id",
    "source",
    "specversion",
    "type",
    "data",
    "data_base64",
    ATTR_DATA_CONTENT_TYPE,
    ATTR_DATA_SCHEMA,
    ATTR_SUBJECT,
    ATTR_TIME,
];

/// Encode an event into its wire envelope.
pub fn encode(event: &Event) -> Result<CloudEvent, EncodeError> {
    require_encoded("id", &event.id)?;
    require_encoded("source", &event.source)?;
    require_encoded("specversion", &event.spec_version)?;
    require_encoded("type", &event.event_type)?;

    let mut attributes = HashMap::with_capacity(event.extensions.len() + 4);
    if let Some(content_type) = &event.data_content_type {
        attributes.insert(
            ATTR_DATA_CONTENT_TYPE.to_string(),
            CloudEventAttributeValue::new(Attr::CeString(content_type.clone())),
        );
    }
    if let Some(schema) = &event.data_schema {
        attributes.insert(
            ATTR_DATA_SCHEMA.to_string(),
            CloudEventAttributeValue::new(Attr::CeString(schema.clone())),
        );
    }
    if let Some(subject) = &event.subject {
        attributes.insert(
            ATTR_SUBJECT.to_string(),
            CloudEventAttributeValue::new(Attr::CeString(subject.clone())),
        );
    }
    if let Some(time) = &event.time {
        attributes.insert(
            ATTR_TIME.to_string(),
            CloudEventAttributeValue::new(Attr::CeTimestamp(timestamp_to_wire(time))),
        );
    }

    for (name, value) in &event.extensions {
        validate_extension_name(name)?;
        attributes.insert(name.clone(), attribute_for(value));
    }

    Ok(CloudEvent {
        id: event.id.clone(),
        source: event.source.clone(),
        spec_version: event.spec_version.clone(),
        event_type: event.event_type.clone(),
        attributes,
        data: event.data.as_ref().map(|data| encode_data(event, data)),
    })
}

/// Encode several events, failing on the first one that cannot be encoded.
pub fn encode_batch(events: &[Event]) -> Result<CloudEventBatch, EncodeError> {
    let events = events.iter().map(encode).collect::<Result<Vec<_>, _>>()?;
    Ok(CloudEventBatch { events })
}

/// Decode a wire envelope into an event.
pub fn decode(envelope: CloudEvent) -> Result<Event, DecodeError> {
    require_decoded("id", &envelope.id)?;
    require_decoded("source", &envelope.source)?;
    require_decoded("specversion", &envelope.spec_version)?;
    require_decoded("type", &envelope.event_type)?;

    let mut event = Event {
        id: envelope.id,
        source: envelope.source,
        spec_version: envelope.spec_version,
        event_type: envelope.event_type,
        data_content_type: None,
        data_schema: None,
        subject: None,
        time: None,
        extensions: BTreeMap::new(),
        data: None,
    };

    for (name, attr) in envelope.attributes {
        let value = value_from(&name, attr)?;
        match name.as_str() {
            ATTR_DATA_CONTENT_TYPE => event.data_content_type = Some(expect_string(&name, value)?),
            ATTR_DATA_SCHEMA => event.data_schema = Some(expect_string(&name, value)?),
            ATTR_SUBJECT => event.subject = Some(expect_string(&name, value)?),
            ATTR_TIME => match value {
                AttributeValue::Timestamp(t) => event.time = Some(t),
                _ => {
                    return Err(DecodeError::AttributeTypeMismatch {
                        name,
                        expected: "timestamp",
                    })
                }
            },
            _ => {
                event.extensions.insert(name, value);
            }
        }
    }

    event.data = match envelope.data {
        Some(EnvelopeData::BinaryData(bytes)) => Some(Data::Binary(bytes)),
        Some(EnvelopeData::TextData(text)) => Some(Data::Text(text)),
        Some(EnvelopeData::ProtoData(any)) => {
            event
                .data_content_type
                .get_or_insert_with(|| CONTENT_TYPE_PROTOBUF.to_string());
            Some(Data::Message {
                type_url: any.type_url,
                value: any.value,
            })
        }
        None => None,
    };

    Ok(event)
}

/// Decode every envelope of a batch, keeping per-element results.
pub fn decode_batch(batch: CloudEventBatch) -> Vec<Result<Event, DecodeError>> {
    batch.events.into_iter().map(decode).collect()
}

fn encode_data(event: &Event, data: &Data) -> EnvelopeData {
    match data {
        Data::Message { type_url, value } => EnvelopeData::ProtoData(Any {
            type_url: type_url.clone(),
            value: value.clone(),
        }),
        other if event.data_content_type.as_deref() == Some(CONTENT_TYPE_PROTOBUF) => {
            EnvelopeData::ProtoData(Any {
                type_url: event.data_schema.clone().unwrap_or_default(),
                value: other.as_bytes().to_vec(),
            })
        }
        Data::Binary(bytes) => EnvelopeData::BinaryData(bytes.clone()),
        Data::Text(text) => EnvelopeData::TextData(text.clone()),
    }
}

pub(crate) fn attribute_for(value: &AttributeValue) -> CloudEventAttributeValue {
    let attr = match value {
        AttributeValue::Boolean(b) => Attr::CeBoolean(*b),
        AttributeValue::Integer(i) => Attr::CeInteger(*i),
        AttributeValue::String(s) => Attr::CeString(s.clone()),
        AttributeValue::Binary(b) => Attr::CeBytes(b.clone()),
        AttributeValue::Uri(u) => Attr::CeUri(u.as_str().to_string()),
        AttributeValue::UriRef(u) => Attr::CeUriRef(u.as_str().to_string()),
        AttributeValue::Timestamp(t) => Attr::CeTimestamp(timestamp_to_wire(t)),
    };
    CloudEventAttributeValue::new(attr)
}

fn value_from(name: &str, value: CloudEventAttributeValue) -> Result<AttributeValue, DecodeError> {
    let Some(attr) = value.attr else {
        return Err(DecodeError::UnsupportedAttributeType {
            name: name.to_string(),
        });
    };
    let value = match attr {
        Attr::CeBoolean(b) => AttributeValue::Boolean(b),
        Attr::CeInteger(i) => AttributeValue::Integer(i),
        Attr::CeString(s) => AttributeValue::String(s),
        Attr::CeBytes(b) => AttributeValue::Binary(b),
        Attr::CeUri(s) => match Url::parse(&s) {
            Ok(uri) => AttributeValue::Uri(uri),
            Err(source) => {
                return Err(DecodeError::InvalidUri {
                    name: name.to_string(),
                    value: s,
                    source,
                })
            }
        },
        Attr::CeUriRef(s) => match UriRef::parse(&s) {
            Ok(uri) => AttributeValue::UriRef(uri),
            Err(source) => {
                return Err(DecodeError::InvalidUri {
                    name: name.to_string(),
                    value: s,
                    source,
                })
            }
        },
        Attr::CeTimestamp(ts) => match timestamp_from_wire(ts) {
            Some(t) => AttributeValue::Timestamp(t),
            None => {
                return Err(DecodeError::InvalidTimestamp {
                    name: name.to_string(),
                })
            }
        },
    };
    Ok(value)
}

fn expect_string(name: &str, value: AttributeValue) -> Result<String, DecodeError> {
    match value {
        AttributeValue::String(s) => Ok(s),
        _ => Err(DecodeError::AttributeTypeMismatch {
            name: name.to_string(),
            expected: "string",
        }),
    }
}

pub(crate) fn timestamp_to_wire(time: &DateTime<Utc>) -> Timestamp {
    let mut ts = Timestamp {
        seconds: time.timestamp(),
        nanos: time.timestamp_subsec_nanos() as i32,
    };
    // Leap seconds report nanos >= 1e9.
    ts.normalize();
    ts
}

pub(crate) fn timestamp_from_wire(mut ts: Timestamp) -> Option<DateTime<Utc>> {
    ts.normalize();
    DateTime::from_timestamp(ts.seconds, u32::try_from(ts.nanos).ok()?)
}

pub(crate) fn validate_extension_name(name: &str) -> Result<(), EncodeError> {
    if RESERVED_NAMES.contains(&name) {
        return Err(EncodeError::ReservedAttributeName(name.to_string()));
    }
    let legal = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    if !legal {
        return Err(EncodeError::InvalidAttributeName(name.to_string()));
    }
    Ok(())
}

fn require_encoded(name: &'static str, value: &str) -> Result<(), EncodeError> {
    if value.is_empty() {
        return Err(EncodeError::MissingRequiredField(name));
    }
    Ok(())
}

fn require_decoded(name: &'static str, value: &str) -> Result<(), DecodeError> {
    if value.is_empty() {
        return Err(DecodeError::MissingRequiredField(name));
    }
    Ok(())
}
