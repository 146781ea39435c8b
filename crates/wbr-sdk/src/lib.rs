//! High-level SDK for the Wayback Resolver.
//!
//! Provides a unified API over capture lookup and record loading. This is
//! the main entry point for applications embedding WBR.

pub mod archive;
pub mod config;
pub mod error;

pub use archive::Archive;
pub use config::{ArchiveConfig, IndexConfig, LiveConfig, RulesConfig, StorageConfig};
pub use error::{SdkError, SdkResult};

// Re-export key types
pub use wbr_index::{CaptureIndex, IndexError};
pub use wbr_loader::{LoadError, LoadedRecord, RequestContext};
pub use wbr_rules::FuzzyRuleSet;
pub use wbr_types::{CdxEntry, CdxQuery, MatchType, OutputForm};
pub use wbr_warc::{BodyStream, RecordHeaders};
