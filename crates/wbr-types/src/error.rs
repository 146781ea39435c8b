use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("malformed cdx line ({reason}): {line}")]
    MalformedCdx { reason: String, line: String },

    #[error("invalid filter expression: {0}")]
    InvalidFilter(String),

    #[error("missing query parameter: {0}")]
    MissingParam(String),

    #[error("invalid value for query parameter {name}: {value}")]
    InvalidParam { name: String, value: String },
}

/// Convenience alias for type-level results.
pub type TypeResult<T> = Result<T, TypeError>;
