//! Error types for the `sane_html` crate.
//!
//! Construction of a [`Sanitizer`](crate::Sanitizer) is the only fallible
//! step. Sanitizing input never fails: hostile markup is dropped or unwrapped,
//! not reported.

/// All errors that can occur while compiling a sanitizer policy.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    /// The options dictionary could not be read, or contained an unknown key.
    #[error("Invalid options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    /// A tag name in `allowedTags` or `allowedAttributes` is not a valid
    /// element name.
    #[error("Invalid tag name: {0:?}")]
    InvalidTagName(String),

    /// An attribute name in `allowedAttributes` is not a valid attribute name.
    #[error("Invalid attribute name: {0:?}")]
    InvalidAttributeName(String),

    /// An entry in `allowedProtocols` is not a valid URI scheme.
    #[error("Invalid protocol: {0:?}")]
    InvalidProtocol(String),

    /// An entry in `allowedOrigins` does not describe a tuple origin.
    #[error("Invalid origin {origin:?}: {reason}")]
    InvalidOrigin {
        /// The origin string as supplied.
        origin: String,
        /// Why it was rejected.
        reason: String,
    },

    /// `allowedURIPattern` is not a valid regular expression.
    #[error("Invalid URI pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// `baseURL` is not an absolute URL that relative references can resolve
    /// against.
    #[error("Invalid base URL {url:?}: {reason}")]
    InvalidBaseUrl {
        /// The base URL as supplied.
        url: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// A type alias for `Result<T, ConfigurationError>`.
pub type Result<T> = std::result::Result<T, ConfigurationError>;
