use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{WarcError, WarcResult};
use crate::headers::RecordHeaders;

const WARC_VERSION: &str = "WARC/1.0";

/// Serialize one record into bytes, as its own gzip member when `gzip`.
///
/// `Content-Length` is always set from `body`.
pub fn encode_record(headers: &RecordHeaders, body: &[u8], gzip: bool) -> WarcResult<Vec<u8>> {
    let mut headers = headers.clone();
    headers.set("Content-Length", body.len().to_string());

    let mut raw = Vec::with_capacity(body.len() + 512);
    write!(raw, "{WARC_VERSION}\r\n{headers}\r\n")?;
    raw.extend_from_slice(body);
    raw.extend_from_slice(b"\r\n\r\n");

    if !gzip {
        return Ok(raw);
    }
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw)?;
    Ok(encoder.finish()?)
}

/// Write one record to `out`, returning the number of bytes written.
pub fn write_record<W: Write>(
    out: &mut W,
    headers: &RecordHeaders,
    body: &[u8],
    gzip: bool,
) -> WarcResult<u64> {
    let encoded = encode_record(headers, body, gzip)?;
    out.write_all(&encoded)?;
    Ok(encoded.len() as u64)
}

/// Append one record to the file at `path`, creating it if needed.
///
/// Returns `(offset, length)` of the written record, the coordinates an
/// index line needs to find it again.
pub fn append_record(
    path: &Path,
    headers: &RecordHeaders,
    body: &[u8],
    gzip: bool,
) -> WarcResult<(u64, u64)> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| WarcError::Open {
            path: path.display().to_string(),
            source,
        })?;
    let offset = file.metadata()?.len();
    let length = write_record(&mut file, headers, body, gzip)?;
    file.flush()?;
    tracing::debug!(path = %path.display(), offset, length, "appended WARC record");
    Ok((offset, length))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_record_layout() {
        let headers: RecordHeaders = [("WARC-Type", "resource")].into_iter().collect();
        let bytes = encode_record(&headers, b"abc", false).unwrap();
        assert_eq!(
            bytes,
            b"WARC/1.0\r\nWARC-Type: resource\r\nContent-Length: 3\r\n\r\nabc\r\n\r\n"
        );
    }

    #[test]
    fn gzip_record_has_magic() {
        let bytes = encode_record(&RecordHeaders::new(), b"abc", true).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn stale_content_length_is_replaced() {
        let headers: RecordHeaders = [("Content-Length", "999")].into_iter().collect();
        let bytes = encode_record(&headers, b"ab", false).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Content-Length: 2\r\n"));
        assert!(!text.contains("999"));
    }

    #[test]
    fn append_reports_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.warc.gz");
        let (first_offset, first_len) = append_record(&path, &RecordHeaders::new(), b"a", true).unwrap();
        let (second_offset, _) = append_record(&path, &RecordHeaders::new(), b"b", true).unwrap();
        assert_eq!(first_offset, 0);
        assert_eq!(second_offset, first_len);
    }
}
