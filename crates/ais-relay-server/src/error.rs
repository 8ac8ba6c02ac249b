//! Error types for the relay server.
//!
//! [`ConfigError`] covers environment loading at startup; [`ProtocolError`]
//! covers inbound frames that are not JSON at all. Neither is ever sent to a
//! client: configuration errors abort startup and protocol errors are logged.

/// Errors that can occur while loading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable was set but could not be parsed.
    #[error("invalid {name}: {message}")]
    Invalid {
        /// The environment variable name.
        name: &'static str,
        /// What was wrong with the value.
        message: String,
    },

    /// A variable required by another setting is missing.
    #[error("missing {name}: {message}")]
    Missing {
        /// The environment variable name.
        name: &'static str,
        /// Why it is required.
        message: String,
    },
}

/// Errors that can occur while decoding an inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame is not valid JSON.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A binary frame did not contain UTF-8 text.
    #[error("binary frame is not UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),
}
