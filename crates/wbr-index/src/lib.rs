//! Capture index query engine for the Wayback Resolver.
//!
//! Two engines implement [`CaptureIndex`]:
//!
//! - [`CdxServer`] queries one or more [`IndexSource`]s, merges, filters
//!   and orders what they return, and retries once with a fuzzy rule when
//!   nothing matched.
//! - [`RemoteCdxServer`] forwards the whole query to a remote CDX endpoint.
//!
//! Both report the same [`IndexError`] variants for the same remote status,
//! so callers can choose a fallback (for example a live fetch on
//! `NotFound`) without knowing which engine they hold.

pub mod delegated;
pub mod engine;
pub mod error;
pub mod local;
pub mod remote;
pub mod source;
pub mod transport;

#[cfg(test)]
mod testutil;

pub use delegated::RemoteCdxServer;
pub use engine::{order_entries, CaptureIndex, CdxServer};
pub use error::{IndexError, IndexResult};
pub use local::LocalCdxSource;
pub use remote::RemoteCdxSource;
pub use source::{IndexSource, SourceReply};
pub use transport::{HttpTransport, ReqwestTransport, TransportReply};
