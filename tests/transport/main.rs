//! Network transport integration tests.

mod support;

#[cfg(feature = "grpc")]
mod grpc_pull;
#[cfg(feature = "grpc")]
mod grpc_push;

#[cfg(feature = "http")]
mod http_push;
