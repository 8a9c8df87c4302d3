use thiserror::Error;

/// Invalid client, publisher or subscriber configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("endpoint is required for client")]
    MissingEndpoint,

    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("event bus name is required for publisher")]
    MissingEventbus,

    #[error("subscription id is required for subscriber")]
    MissingSubscriptionId,

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{field} must be at most {max}")]
    TooLarge { field: &'static str, max: usize },
}
