//! Event payload variants.

/// The payload of an event. Exactly one representation is populated.
#[derive(Clone, Debug, PartialEq)]
pub enum Data {
    /// Opaque bytes, interpreted according to the event's content type.
    Binary(Vec<u8>),
    /// UTF-8 text (JSON documents are usually carried this way).
    Text(String),
    /// An embedded protobuf message identified by its type URL.
    Message { type_url: String, value: Vec<u8> },
}

impl Data {
    /// Raw payload bytes, whatever the representation.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Data::Binary(b) => b,
            Data::Text(s) => s.as_bytes(),
            Data::Message { value, .. } => value,
        }
    }

    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}
