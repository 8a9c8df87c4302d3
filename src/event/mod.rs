//! Structured events: required context attributes, optional attributes,
//! extensions and payload.

mod attribute;
mod data;
mod event;

pub use attribute::{AttributeValue, UriRef};
pub use data::Data;
pub use event::{
    Event, CONTENT_TYPE_BITCODE, CONTENT_TYPE_JSON, CONTENT_TYPE_PROTOBUF, SPEC_VERSION,
};

pub(crate) use attribute::json_kind;
