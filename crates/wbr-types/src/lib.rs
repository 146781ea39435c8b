//! Foundation types for the Wayback Resolver (WBR).
//!
//! This crate provides the capture-index record, query, and time types used
//! throughout WBR. Every other WBR crate depends on `wbr-types`.
//!
//! # Key Types
//!
//! - [`CdxEntry`]: One capture index record (11-field CDX line)
//! - [`CdxQuery`]: A capture lookup: URL, match type, ordering, limit, filters
//! - [`UrlKey`]: Canonical SURT key plus the match rule derived from a query
//! - [`CdxFilter`]: Field filter expression (`[!][=|~]field:value`)
//! - [`MatchType`] / [`OutputForm`]: Query enumerations

pub mod entry;
pub mod error;
pub mod filter;
pub mod query;
pub mod surt;
pub mod timestamp;

pub use entry::{CdxEntry, CDX_FIELDS};
pub use error::{TypeError, TypeResult};
pub use filter::CdxFilter;
pub use query::{CdxQuery, MatchType, OutputForm};
pub use surt::{canonicalize, UrlKey};
