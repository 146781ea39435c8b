//! The capture index query engine.
//!
//! [`CdxServer`] federates one or more [`IndexSource`]s: it canonicalizes
//! the query, merges and filters what the sources return, orders the
//! result, and retries once with a broader query from the fuzzy rule set
//! when nothing matched.

use std::cmp::Reverse;
use std::path::PathBuf;
use std::sync::Arc;

use wbr_rules::FuzzyRuleSet;
use wbr_types::timestamp::timestamp_to_sec;
use wbr_types::{CdxEntry, CdxFilter, CdxQuery};

use crate::error::{IndexError, IndexResult};
use crate::local::LocalCdxSource;
use crate::remote::RemoteCdxSource;
use crate::source::IndexSource;
use crate::transport::HttpTransport;

/// Anything that answers capture lookups.
///
/// Implemented by [`CdxServer`] (local matching and fuzzy retry) and
/// [`RemoteCdxServer`](crate::RemoteCdxServer) (matching delegated to a
/// remote endpoint). Both report failures with the same [`IndexError`]
/// variants.
pub trait CaptureIndex: Send + Sync {
    /// Entries matching `query`, ordered. Never empty: an empty result is
    /// `IndexError::NotFound`.
    fn load(&self, query: &CdxQuery) -> IndexResult<Vec<CdxEntry>>;
}

/// Progress of one lookup. At most one fuzzy retry happens: the only way
/// into `FuzzyAttempted` is from `Initial`.
enum Lookup {
    Initial,
    FuzzyAttempted(CdxQuery),
    Resolved(Vec<CdxEntry>),
    Failed(IndexError),
}

/// Capture index engine over local and/or remote sources.
#[derive(Default)]
pub struct CdxServer {
    sources: Vec<Box<dyn IndexSource>>,
    rules: Option<Arc<FuzzyRuleSet>>,
}

impl std::fmt::Debug for CdxServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdxServer")
            .field(
                "sources",
                &self.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("rules", &self.rules.as_ref().map(|r| r.len()))
            .finish()
    }
}

impl CdxServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine over local CDX files or directories.
    pub fn local<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::new().with_source(LocalCdxSource::new(paths))
    }

    /// Engine over a remote endpoint, filtering and ordering locally.
    pub fn remote(endpoint: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self::new().with_source(RemoteCdxSource::new(endpoint, transport))
    }

    pub fn with_source(mut self, source: impl IndexSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn with_rules(mut self, rules: Arc<FuzzyRuleSet>) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Query every source once for `query`, without fuzzy retry.
    ///
    /// A source answering not-found contributes nothing; any other source
    /// failure aborts the lookup.
    pub fn query_sources(&self, query: &CdxQuery) -> IndexResult<Vec<CdxEntry>> {
        let key = query.url_key()?;
        let filters = CdxFilter::parse_all(&query.filters)?;
        let mut entries = Vec::new();

        for source in &self.sources {
            let reply = match source.query(query) {
                Ok(reply) => reply,
                Err(e) if e.is_not_found() => {
                    tracing::debug!(source = source.name(), key = %key.key, "source has no captures");
                    continue;
                }
                Err(e) => return Err(e),
            };

            for err in &reply.errors {
                tracing::warn!(source = source.name(), error = %err, "index source partially failed");
            }

            for line in &reply.lines {
                match CdxEntry::parse(line) {
                    Ok(entry) if entry.source.is_none() => entries.push(entry.with_source(source.name())),
                    Ok(entry) => entries.push(entry),
                    Err(e) => tracing::warn!(source = source.name(), error = %e, "skipping malformed index line"),
                }
            }
        }

        entries.retain(|e| key.matches(&e.urlkey) && filters.iter().all(|f| f.matches(e)));
        order_entries(&mut entries, query)?;
        Ok(entries)
    }

    /// The derived query to retry with, if fuzzy matching is enabled and a
    /// rule applies.
    fn fuzzy_query(&self, query: &CdxQuery) -> Option<CdxQuery> {
        if !query.allow_fuzzy {
            return None;
        }
        self.rules.as_ref()?.match_query(query)
    }
}

impl CaptureIndex for CdxServer {
    fn load(&self, query: &CdxQuery) -> IndexResult<Vec<CdxEntry>> {
        let not_found = || IndexError::NotFound(query.url.clone());
        let mut state = Lookup::Initial;

        loop {
            state = match state {
                Lookup::Initial => match self.query_sources(query) {
                    Ok(entries) if !entries.is_empty() => Lookup::Resolved(entries),
                    Ok(_) => match self.fuzzy_query(query) {
                        Some(derived) => Lookup::FuzzyAttempted(derived),
                        None => Lookup::Failed(not_found()),
                    },
                    Err(e) => Lookup::Failed(e),
                },
                Lookup::FuzzyAttempted(derived) => match self.query_sources(&derived) {
                    Ok(entries) if !entries.is_empty() => {
                        tracing::debug!(url = %query.url, fuzzy_url = %derived.url, hits = entries.len(), "fuzzy match");
                        Lookup::Resolved(entries)
                    }
                    Ok(_) => Lookup::Failed(not_found()),
                    Err(e) => Lookup::Failed(e),
                },
                Lookup::Resolved(entries) => return Ok(entries),
                Lookup::Failed(err) => return Err(err),
            };
        }
    }
}

/// Order entries for `query` and apply its limit.
///
/// With `closest`, entries are ordered by absolute distance from the target
/// time, ties keeping (key, timestamp) order. Otherwise entries are ordered
/// by (key, timestamp), descending when `reverse` is set.
pub fn order_entries(entries: &mut Vec<CdxEntry>, query: &CdxQuery) -> IndexResult<()> {
    entries.sort_by(|a, b| (&a.urlkey, &a.timestamp).cmp(&(&b.urlkey, &b.timestamp)));

    if let Some(closest) = &query.closest {
        let target = timestamp_to_sec(closest)?;
        entries.sort_by_cached_key(|e| {
            timestamp_to_sec(&e.timestamp)
                .map(|t| t.abs_diff(target))
                .unwrap_or(u64::MAX)
        });
    } else if query.reverse {
        entries.sort_by_key(|e| Reverse((e.urlkey.clone(), e.timestamp.clone())));
    }

    if let Some(limit) = query.limit {
        entries.truncate(limit);
    }
    Ok(())
}
