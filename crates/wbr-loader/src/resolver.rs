//! Stored-record loading with revisit resolution.

use std::sync::Arc;

use wbr_index::CaptureIndex;
use wbr_types::entry::REVISIT_MIMETYPE;
use wbr_types::timestamp::iso_date_to_timestamp;
use wbr_types::{CdxEntry, CdxQuery};
use wbr_warc::{open_record, WarcRecord};

use crate::error::{LoadError, LoadResult};
use crate::memento::decorate;
use crate::path::PathResolver;
use crate::record::LoadedRecord;

/// Loads the stored record an index entry points at.
///
/// A `revisit` record is reconciled with the payload record it refers to:
/// the payload is found with a second index lookup (same digest, nearest to
/// the referred-to date, revisits excluded), and the result carries the
/// payload's headers and body under the revisit's own URI and date. Only
/// one hop is followed.
pub struct RecordResolver {
    paths: Arc<dyn PathResolver>,
    index: Arc<dyn CaptureIndex>,
}

impl RecordResolver {
    pub fn new(paths: Arc<dyn PathResolver>, index: Arc<dyn CaptureIndex>) -> Self {
        Self { paths, index }
    }

    /// Load `entry`. `Ok(None)` when it has no filename or offset.
    pub fn resolve(&self, entry: &CdxEntry) -> LoadResult<Option<LoadedRecord>> {
        if !entry.has_location() {
            return Ok(None);
        }

        let record = self.open(entry)?;
        let (mut headers, body) = if record.is_revisit() {
            let payload = self.find_payload(entry, &record)?;
            merge_revisit(record, payload)
        } else {
            record.into_parts()
        };

        decorate(&mut headers, entry)?;
        Ok(Some(LoadedRecord::new(headers, body)))
    }

    /// Open the record for `entry` from the first location that has its file.
    fn open(&self, entry: &CdxEntry) -> LoadResult<WarcRecord> {
        let (Some(filename), Some(offset)) = (entry.filename(), entry.offset()) else {
            return Err(LoadError::ArchiveNotFound {
                filename: entry.filename.clone(),
                tried: 0,
            });
        };

        let candidates = self.paths.candidates(filename, entry);
        let tried = candidates.len();
        for path in candidates {
            if !path.is_file() {
                tracing::trace!(path = %path.display(), "archive not at location");
                continue;
            }
            return Ok(open_record(&path, offset, entry.length())?);
        }

        Err(LoadError::ArchiveNotFound {
            filename: filename.to_string(),
            tried,
        })
    }

    /// Locate and open the original payload of a revisit record.
    fn find_payload(&self, entry: &CdxEntry, revisit: &WarcRecord) -> LoadResult<WarcRecord> {
        let refers_uri = revisit
            .headers
            .get("WARC-Refers-To-Target-URI")
            .unwrap_or(&entry.original)
            .to_string();
        let closest = match revisit.headers.get("WARC-Refers-To-Date") {
            Some(date) => iso_date_to_timestamp(date)?,
            None => entry.timestamp.clone(),
        };
        let digest = entry
            .digest()
            .map(str::to_string)
            .or_else(|| payload_digest(revisit))
            .ok_or_else(|| LoadError::RevisitNotResolved {
                uri: refers_uri.clone(),
                digest: "-".to_string(),
            })?;

        let query = CdxQuery::new(refers_uri.clone())
            .with_closest(closest)
            .with_filter(format!("=digest:{digest}"))
            .with_filter(format!("!=mimetype:{REVISIT_MIMETYPE}"));

        let candidates = match self.index.load(&query) {
            Ok(candidates) => candidates,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        for candidate in &candidates {
            if candidate.filename == entry.filename && candidate.offset == entry.offset {
                tracing::debug!(uri = %refers_uri, "revisit lookup returned the revisit itself");
                continue;
            }
            if candidate.is_revisit() || !candidate.has_location() {
                continue;
            }
            match self.open(candidate) {
                Ok(record) if !record.is_revisit() => {
                    tracing::debug!(
                        uri = %refers_uri,
                        filename = %candidate.filename,
                        offset = %candidate.offset,
                        "resolved revisit payload"
                    );
                    return Ok(record);
                }
                Ok(_) => tracing::debug!(filename = %candidate.filename, "payload candidate is itself a revisit"),
                Err(e) => tracing::warn!(filename = %candidate.filename, error = %e, "payload candidate unreadable"),
            }
        }

        Err(LoadError::RevisitNotResolved {
            uri: refers_uri,
            digest,
        })
    }
}

/// Payload digest from the revisit's own headers, without its algorithm prefix.
fn payload_digest(revisit: &WarcRecord) -> Option<String> {
    let value = revisit.headers.get("WARC-Payload-Digest")?;
    let digest = value.split_once(':').map_or(value, |(_, d)| d);
    Some(digest.to_string())
}

/// Payload headers and body under the revisit's identity. The revisit's
/// own body is closed.
fn merge_revisit(revisit: WarcRecord, payload: WarcRecord) -> (wbr_warc::RecordHeaders, wbr_warc::BodyStream) {
    let (revisit_headers, mut revisit_body) = revisit.into_parts();
    revisit_body.close();

    let (mut headers, body) = payload.into_parts();
    let payload_uri = headers.get("WARC-Target-URI").map(str::to_string);
    let payload_date = headers.get("WARC-Date").map(str::to_string);

    for name in ["WARC-Target-URI", "WARC-Date"] {
        match revisit_headers.get(name) {
            Some(value) => headers.set(name, value),
            None => {
                headers.remove(name);
            }
        }
    }
    if let Some(uri) = payload_uri {
        headers.set("WARC-Refers-To-Target-URI", uri);
    }
    if let Some(date) = payload_date {
        headers.set("WARC-Refers-To-Date", date);
    }
    (headers, body)
}
