//! WARC record access for the Wayback Resolver.
//!
//! - [`open_record`] seeks to a stored record, decompresses it when it is a
//!   gzip member, and parses its header block.
//! - [`BodyStream`] is the lazy, single-pass body handed to callers.
//! - [`append_record`] / [`write_record`] write records back out.

pub mod error;
pub mod headers;
pub mod record;
pub mod stream;
pub mod writer;

pub use error::{WarcError, WarcResult};
pub use headers::RecordHeaders;
pub use record::{open_record, read_header_block, read_record, WarcRecord};
pub use stream::{BodyStream, CHUNK_SIZE};
pub use writer::{append_record, encode_record, write_record};
