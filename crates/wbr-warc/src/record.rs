use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::{WarcError, WarcResult};
use crate::headers::RecordHeaders;
use crate::stream::BodyStream;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One WARC record: version line, header block, and a lazy body.
#[derive(Debug)]
pub struct WarcRecord {
    pub version: String,
    pub headers: RecordHeaders,
    pub body: BodyStream,
}

impl WarcRecord {
    pub fn record_type(&self) -> Option<&str> {
        self.headers.get("WARC-Type")
    }

    pub fn target_uri(&self) -> Option<&str> {
        self.headers.get("WARC-Target-URI")
    }

    pub fn date(&self) -> Option<&str> {
        self.headers.get("WARC-Date")
    }

    pub fn is_revisit(&self) -> bool {
        self.record_type() == Some("revisit")
    }

    pub fn into_parts(self) -> (RecordHeaders, BodyStream) {
        (self.headers, self.body)
    }
}

/// Open the record stored at `offset` in `path`.
///
/// When `length` is known, reads never go past `offset + length`. A record
/// starting with the gzip magic is decompressed as a single member.
pub fn open_record(path: &Path, offset: u64, length: Option<u64>) -> WarcResult<WarcRecord> {
    let mut file = File::open(path).map_err(|source| WarcError::Open {
        path: path.display().to_string(),
        source,
    })?;
    file.seek(SeekFrom::Start(offset))?;

    tracing::debug!(path = %path.display(), offset, ?length, "opening WARC record");
    match length {
        Some(length) => read_record(file.take(length), offset),
        None => read_record(file, offset),
    }
}

/// Parse a record from `reader`, which must be positioned at its start.
/// `offset` is only used in error messages.
pub fn read_record(reader: impl Read + Send + 'static, offset: u64) -> WarcResult<WarcRecord> {
    let mut raw = BufReader::new(reader);
    let gzipped = raw.fill_buf()?.starts_with(&GZIP_MAGIC);
    let mut reader: Box<dyn BufRead + Send> = if gzipped {
        Box::new(BufReader::new(GzDecoder::new(raw)))
    } else {
        Box::new(raw)
    };

    let version = read_version(&mut reader, offset)?;
    let headers = read_header_block(&mut reader)?;

    let content_length = headers
        .get("Content-Length")
        .ok_or_else(|| invalid(offset, "missing Content-Length"))?
        .parse::<u64>()
        .map_err(|_| invalid(offset, "non-numeric Content-Length"))?;

    Ok(WarcRecord {
        version,
        headers,
        body: BodyStream::new(reader.take(content_length)),
    })
}

fn read_version(reader: &mut dyn BufRead, offset: u64) -> WarcResult<String> {
    loop {
        let line = read_line(reader)?.ok_or_else(|| invalid(offset, "no record at offset"))?;
        if line.is_empty() {
            continue;
        }
        if line.starts_with("WARC/") {
            return Ok(line);
        }
        return Err(invalid(offset, &format!("expected WARC version line, got {line:?}")));
    }
}

/// Read `Name: value` lines up to the first blank line or end of input.
/// Lines starting with whitespace continue the previous value.
pub fn read_header_block(reader: &mut dyn BufRead) -> WarcResult<RecordHeaders> {
    let mut entries: Vec<(String, String)> = Vec::new();

    while let Some(line) = read_line(reader)? {
        if line.is_empty() {
            break;
        }
        if line.starts_with([' ', '\t']) {
            if let Some((_, value)) = entries.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        match RecordHeaders::parse_line(&line) {
            Some(entry) => entries.push(entry),
            None => tracing::debug!(%line, "skipping malformed header line"),
        }
    }

    Ok(entries.into_iter().collect())
}

fn read_line(reader: &mut dyn BufRead) -> WarcResult<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(&buf);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

fn invalid(offset: u64, reason: &str) -> WarcError {
    WarcError::InvalidRecord {
        offset,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::append_record;

    fn response_headers(uri: &str) -> RecordHeaders {
        [
            ("WARC-Type", "response"),
            ("WARC-Target-URI", uri),
            ("WARC-Date", "2014-01-27T17:12:00Z"),
            ("Content-Type", "application/http; msgtype=response"),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn reads_gzip_record_at_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.warc.gz");
        append_record(&path, &response_headers("http://a.example/"), b"first", true).unwrap();
        let (offset, length) =
            append_record(&path, &response_headers("http://b.example/"), b"HTTP/1.1 200 OK\r\n\r\nhello", true)
                .unwrap();
        assert!(offset > 0);

        let mut record = open_record(&path, offset, Some(length)).unwrap();
        assert_eq!(record.version, "WARC/1.0");
        assert_eq!(record.target_uri(), Some("http://b.example/"));
        assert_eq!(record.record_type(), Some("response"));
        assert_eq!(record.body.read_all().unwrap(), b"HTTP/1.1 200 OK\r\n\r\nhello");
    }

    #[test]
    fn reads_uncompressed_record_without_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.warc");
        append_record(&path, &response_headers("http://a.example/"), b"one", false).unwrap();
        let (offset, _) = append_record(&path, &response_headers("http://b.example/"), b"two", false).unwrap();

        let mut record = open_record(&path, offset, None).unwrap();
        assert_eq!(record.target_uri(), Some("http://b.example/"));
        assert_eq!(record.body.read_all().unwrap(), b"two");
    }

    #[test]
    fn continuation_lines_are_folded() {
        let raw = b"WARC/1.0\r\nWARC-Type: metadata\r\nX-Long: first\r\n  second\r\nContent-Length: 0\r\n\r\n";
        let record = read_record(std::io::Cursor::new(raw.to_vec()), 0).unwrap();
        assert_eq!(record.headers.get("x-long"), Some("first second"));
    }

    #[test]
    fn missing_content_length_is_invalid() {
        let raw = b"WARC/1.0\r\nWARC-Type: response\r\n\r\n";
        let err = read_record(std::io::Cursor::new(raw.to_vec()), 7).unwrap_err();
        assert!(matches!(err, WarcError::InvalidRecord { offset: 7, .. }));
    }

    #[test]
    fn garbage_at_offset_is_invalid() {
        let err = read_record(std::io::Cursor::new(b"HTTP/1.1 200 OK\r\n".to_vec()), 3).unwrap_err();
        assert!(matches!(err, WarcError::InvalidRecord { offset: 3, .. }));
    }

    #[test]
    fn offset_past_end_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("small.warc");
        append_record(&path, &response_headers("http://a.example/"), b"x", false).unwrap();
        assert!(matches!(
            open_record(&path, 1_000_000, None),
            Err(WarcError::InvalidRecord { .. })
        ));
    }

    #[test]
    fn missing_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            open_record(&dir.path().join("nope.warc.gz"), 0, None),
            Err(WarcError::Open { .. })
        ));
    }
}
