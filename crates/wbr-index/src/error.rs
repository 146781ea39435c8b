//! Error types for the index crate.

use wbr_types::TypeError;

/// Errors that can occur while querying a capture index.
///
/// The first four variants mirror the status a remote index answers with;
/// callers pick a fallback strategy per variant (for example, treat
/// `NotFound` as "try a live fetch" and `AccessDenied` as terminal).
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// No capture matched, after fuzzy fallback if it was enabled.
    #[error("no captures found for {0}")]
    NotFound(String),

    /// The index refused the query (HTTP 403).
    #[error("access denied by index: {0}")]
    AccessDenied(String),

    /// The index rejected the query as malformed (HTTP 400).
    #[error("bad index request: {0}")]
    BadRequest(String),

    /// Any other failure status from an index.
    #[error("index upstream failure ({status}): {message}")]
    Upstream { status: u16, message: String },

    /// The index could not be reached at all.
    #[error("index transport error: {0}")]
    Transport(String),

    /// A local index file could not be read.
    #[error("failed to read index file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The query or a returned record was invalid.
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl IndexError {
    /// Classify a non-success HTTP status from an index endpoint.
    pub fn from_status(status: u16, url: &str, body: &str) -> Self {
        let detail = if body.trim().is_empty() {
            url.to_string()
        } else {
            format!("{url}: {}", body.trim())
        };
        match status {
            404 => Self::NotFound(detail),
            403 => Self::AccessDenied(detail),
            400 => Self::BadRequest(detail),
            _ => Self::Upstream {
                status,
                message: detail,
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
