//! Wire envelope (CloudEvents protobuf format).
//!
//! Message types are declared with prost derives directly; there is no
//! `.proto` file. Field tags follow the CloudEvents protobuf format.

use std::collections::HashMap;

/// A single event on the wire.
#[derive(Clone, PartialEq, prost::Message)]
pub struct CloudEvent {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub source: String,
    #[prost(string, tag = "3")]
    pub spec_version: String,
    #[prost(string, tag = "4")]
    pub event_type: String,
    #[prost(map = "string, message", tag = "5")]
    pub attributes: HashMap<String, CloudEventAttributeValue>,
    #[prost(oneof = "EnvelopeData", tags = "6, 7, 8")]
    pub data: Option<EnvelopeData>,
}

/// Payload variants of a [`CloudEvent`].
#[derive(Clone, PartialEq, prost::Oneof)]
pub enum EnvelopeData {
    #[prost(bytes, tag = "6")]
    BinaryData(Vec<u8>),
    #[prost(string, tag = "7")]
    TextData(String),
    #[prost(message, tag = "8")]
    ProtoData(prost_types::Any),
}

/// A tagged attribute value.
#[derive(Clone, PartialEq, prost::Message)]
pub struct CloudEventAttributeValue {
    #[prost(oneof = "Attr", tags = "1, 2, 3, 4, 5, 6, 7")]
    pub attr: Option<Attr>,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum Attr {
    #[prost(bool, tag = "1")]
    CeBoolean(bool),
    #[prost(int32, tag = "2")]
    CeInteger(i32),
    #[prost(string, tag = "3")]
    CeString(String),
    #[prost(bytes, tag = "4")]
    CeBytes(Vec<u8>),
    #[prost(string, tag = "5")]
    CeUri(String),
    #[prost(string, tag = "6")]
    CeUriRef(String),
    #[prost(message, tag = "7")]
    CeTimestamp(prost_types::Timestamp),
}

impl CloudEventAttributeValue {
    pub fn new(attr: Attr) -> Self {
        Self { attr: Some(attr) }
    }
}

/// An ordered list of envelopes, as carried by publish and delivery frames.
#[derive(Clone, PartialEq, prost::Message)]
pub struct CloudEventBatch {
    #[prost(message, repeated, tag = "1")]
    pub events: Vec<CloudEvent>,
}

/// Alias used where the wire type is discussed generically.
pub type Envelope = CloudEvent;
