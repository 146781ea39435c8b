//! Record loading for the Wayback Resolver.
//!
//! Two loaders turn an index entry into a [`LoadedRecord`]:
//!
//! - [`RecordResolver`] reads the stored WARC record the entry points at,
//!   reconciling `revisit` records with their original payload.
//! - [`LiveLoader`] fetches the entry's `load_url` and presents the response
//!   as if it were a stored `response` record.
//!
//! Both add Memento headers (`Link`, `Memento-Datetime`) and the `WARC-Coll`
//! source tag to what they return, and both return `Ok(None)` for entries
//! they cannot handle so callers can chain them.

pub mod error;
pub mod http;
pub mod live;
pub mod memento;
pub mod path;
pub mod record;
pub mod resolver;

#[cfg(test)]
mod testutil;

pub use error::{LoadError, LoadResult};
pub use http::HttpFetcher;
pub use live::{
    HeaderRecorder, LiveFetch, LiveLoader, LiveRequest, LiveResponse, RequestContext, DEFAULT_TIMEOUT,
    SKIP_HEADERS,
};
pub use memento::{decorate, make_link};
pub use path::{PathResolver, PrefixPathResolver};
pub use record::LoadedRecord;
pub use resolver::RecordResolver;
