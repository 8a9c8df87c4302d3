//! Typed attribute values carried by an [`Event`](super::Event).

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use url::Url;

/// A URI-reference (absolute or relative) attribute value.
///
/// The original text is kept as-is so that it survives a round trip through
/// the wire envelope unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct UriRef(String);

impl UriRef {
    /// Parse and validate a URI-reference.
    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        match Url::parse(input) {
            Ok(_) => Ok(Self(input.to_string())),
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                // Relative references are validated by resolving them against a throwaway base.
                let base = Url::parse("http://uri-ref.invalid/")?;
                base.join(input)?;
                Ok(Self(input.to_string()))
            }
            Err(err) => Err(err),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UriRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The scalar types an event attribute may hold.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Boolean(bool),
    Integer(i32),
    String(String),
    Binary(Vec<u8>),
    Uri(Url),
    UriRef(UriRef),
    Timestamp(DateTime<Utc>),
}

impl AttributeValue {
    /// Short name of the variant, used in error messages and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Boolean(_) => "boolean",
            AttributeValue::Integer(_) => "integer",
            AttributeValue::String(_) => "string",
            AttributeValue::Binary(_) => "binary",
            AttributeValue::Uri(_) => "uri",
            AttributeValue::UriRef(_) => "uri-reference",
            AttributeValue::Timestamp(_) => "timestamp",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i32> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            AttributeValue::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            AttributeValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Convert an untyped JSON value.
    ///
    /// Only booleans, strings and integers that fit in 32 bits have an
    /// attribute representation; everything else yields `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(AttributeValue::Boolean(*b)),
            Value::String(s) => Some(AttributeValue::String(s.clone())),
            Value::Number(n) => n
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .map(AttributeValue::Integer),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Describe the type of a JSON value that has no attribute representation.
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer out of 32-bit range",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Canonical string form: bytes as base64, timestamps as RFC 3339.
impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Boolean(b) => write!(f, "{}", b),
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::String(s) => f.write_str(s),
            AttributeValue::Binary(b) => f.write_str(&STANDARD.encode(b)),
            AttributeValue::Uri(u) => f.write_str(u.as_str()),
            AttributeValue::UriRef(u) => f.write_str(u.as_str()),
            AttributeValue::Timestamp(t) => {
                f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        AttributeValue::Boolean(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        AttributeValue::Integer(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<Vec<u8>> for AttributeValue {
    fn from(value: Vec<u8>) -> Self {
        AttributeValue::Binary(value)
    }
}

impl From<&[u8]> for AttributeValue {
    fn from(value: &[u8]) -> Self {
        AttributeValue::Binary(value.to_vec())
    }
}

impl From<Url> for AttributeValue {
    fn from(value: Url) -> Self {
        AttributeValue::Uri(value)
    }
}

impl From<UriRef> for AttributeValue {
    fn from(value: UriRef) -> Self {
        AttributeValue::UriRef(value)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(value: DateTime<Utc>) -> Self {
        AttributeValue::Timestamp(value)
    }
}
