use thiserror::Error;
use wbr_index::IndexError;
use wbr_types::TypeError;
use wbr_warc::WarcError;

/// Errors raised while loading a record.
///
/// Loaders never recover locally; each failure kind is its own variant so
/// the caller can pick a fallback (for example, try a live fetch when the
/// archived copy is unavailable).
#[derive(Debug, Error)]
pub enum LoadError {
    /// No configured storage location holds the file.
    #[error("archive file not found: {filename} (tried {tried} locations)")]
    ArchiveNotFound { filename: String, tried: usize },

    /// The stored record is unreadable or malformed.
    #[error(transparent)]
    Warc(#[from] WarcError),

    /// A revisit's original payload could not be located.
    #[error("cannot resolve revisit of {uri} (digest {digest})")]
    RevisitNotResolved { uri: String, digest: String },

    /// The live fetch failed before a response was received.
    #[error("live fetch of {url} failed: {reason}")]
    LiveFetch { url: String, reason: String },

    /// The revisit lookup itself failed.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// The entry carried an invalid timestamp or date.
    #[error(transparent)]
    Type(#[from] TypeError),
}

pub type LoadResult<T> = Result<T, LoadError>;
