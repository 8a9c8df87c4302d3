//! Codec error types.

use thiserror::Error;

/// An event could not be represented as a wire envelope.
///
/// Fatal to the publish call that triggered it; never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("required attribute `{0}` is empty")]
    MissingRequiredField(&'static str),

    #[error("attribute `{name}` has unsupported type {kind}")]
    UnsupportedAttributeType { name: String, kind: &'static str },

    #[error("extension name `{0}` is reserved for a context attribute")]
    ReservedAttributeName(String),

    #[error("extension name `{0}` must be non-empty lowercase ASCII letters and digits")]
    InvalidAttributeName(String),
}

/// A wire envelope could not be turned back into an event.
///
/// On the receive path this is per element: the element is logged and skipped.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("required attribute `{0}` is empty")]
    MissingRequiredField(&'static str),

    #[error("attribute `{name}` has no recognized value type")]
    UnsupportedAttributeType { name: String },

    #[error("attribute `{name}` is not a valid URI: {value}")]
    InvalidUri {
        name: String,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("attribute `{name}` must be a {expected}")]
    AttributeTypeMismatch { name: String, expected: &'static str },

    #[error("attribute `{name}` holds an out-of-range timestamp")]
    InvalidTimestamp { name: String },

    #[error("malformed JSON event: {0}")]
    InvalidJson(String),
}
