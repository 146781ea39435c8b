use wbr_types::CdxQuery;

use crate::error::{IndexError, IndexResult};

/// Raw lines produced by one source, plus failures that did not stop it.
///
/// A local source spanning several files reports an unreadable file here
/// and still returns the lines of the others.
#[derive(Debug, Default)]
pub struct SourceReply {
    pub lines: Vec<String>,
    pub errors: Vec<IndexError>,
}

impl SourceReply {
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self {
            lines,
            errors: Vec::new(),
        }
    }
}

/// A capture index that can be asked for raw index lines.
///
/// Implementations:
/// - [`LocalCdxSource`](crate::LocalCdxSource): sorted CDX files on disk
/// - [`RemoteCdxSource`](crate::RemoteCdxSource): a CDX HTTP endpoint
///
/// Sources never retry; a failing source returns its classified error.
pub trait IndexSource: Send + Sync {
    /// Tag attached to entries that do not already carry a source.
    fn name(&self) -> &str;

    fn query(&self, query: &CdxQuery) -> IndexResult<SourceReply>;
}
