use std::sync::Arc;

use wbr_types::{CdxEntry, CdxQuery};

use crate::engine::CaptureIndex;
use crate::error::{IndexError, IndexResult};
use crate::remote::RemoteCdxSource;
use crate::source::IndexSource;
use crate::transport::HttpTransport;

/// Capture index that hands the whole query to a remote endpoint.
///
/// Every option is forwarded, fuzzy matching included, and the endpoint's
/// answer is returned as is: one round trip, no local reordering or retry.
#[derive(Clone, Debug)]
pub struct RemoteCdxServer {
    source: RemoteCdxSource,
}

impl RemoteCdxServer {
    pub fn new(endpoint: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            source: RemoteCdxSource::new(endpoint, transport).delegated(),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.source.endpoint()
    }
}

impl CaptureIndex for RemoteCdxServer {
    fn load(&self, query: &CdxQuery) -> IndexResult<Vec<CdxEntry>> {
        let reply = self.source.query(query)?;

        let entries: Vec<CdxEntry> = reply
            .lines
            .iter()
            .filter_map(|line| match CdxEntry::parse(line) {
                Ok(entry) if entry.source.is_none() => Some(entry.with_source(self.source.name())),
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(endpoint = self.endpoint(), error = %e, "skipping malformed index line");
                    None
                }
            })
            .collect();

        if entries.is_empty() {
            return Err(IndexError::NotFound(query.url.clone()));
        }
        Ok(entries)
    }
}
