//! Archive fixtures for loader tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use wbr_index::{CaptureIndex, CdxServer};
use wbr_types::CdxEntry;
use wbr_warc::{append_record, RecordHeaders};

pub(crate) const PAYLOAD_BODY: &[u8] =
    b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\n\r\n<html>example</html>";

const DIGEST: &str = "B2LTWWPUOYAH7UIPQ7ZUPQ4VMBSVC36A";
const WARC_NAME: &str = "fixture.warc.gz";

/// A gzip WARC file holding a response, two revisits of it (same-URL and
/// URL-agnostic), an orphan revisit, and a revisit whose index points back
/// at itself, plus a sorted CDX index over all of them.
pub(crate) struct ArchiveFixture {
    dir: TempDir,
    lines: Vec<String>,
}

impl ArchiveFixture {
    pub(crate) fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let warc = dir.path().join(WARC_NAME);
        let mut lines = Vec::new();

        let (len, off) = append(&warc, &[
            ("WARC-Type", "response"),
            ("WARC-Target-URI", "http://example.com/"),
            ("WARC-Date", "2014-01-27T17:12:00Z"),
            ("WARC-Payload-Digest", "sha1:B2LTWWPUOYAH7UIPQ7ZUPQ4VMBSVC36A"),
            ("Content-Type", "application/http; msgtype=response"),
        ], PAYLOAD_BODY);
        lines.push(format!("com,example)/ 20140127171200 http://example.com/ text/html 200 {DIGEST} - - {len} {off} {WARC_NAME}"));

        let (len, off) = append(&warc, &[
            ("WARC-Type", "revisit"),
            ("WARC-Target-URI", "http://example.com/"),
            ("WARC-Date", "2014-01-27T17:12:51Z"),
            ("WARC-Payload-Digest", "sha1:B2LTWWPUOYAH7UIPQ7ZUPQ4VMBSVC36A"),
        ], b"HTTP/1.1 200 OK\r\n\r\n");
        lines.push(format!("com,example)/ 20140127171251 http://example.com/ warc/revisit - {DIGEST} - - {len} {off} {WARC_NAME}"));

        let (len, off) = append(&warc, &[
            ("WARC-Type", "revisit"),
            ("WARC-Target-URI", "http://test@example.com/"),
            ("WARC-Date", "2013-07-29T19:51:51Z"),
            ("WARC-Payload-Digest", "sha1:B2LTWWPUOYAH7UIPQ7ZUPQ4VMBSVC36A"),
            ("WARC-Refers-To-Target-URI", "http://example.com/"),
            ("WARC-Refers-To-Date", "2014-01-27T17:12:00Z"),
        ], b"HTTP/1.1 200 OK\r\n\r\n");
        lines.push(format!("com,example)/ 20130729195151 http://test@example.com/ warc/revisit - {DIGEST} - - {len} {off} {WARC_NAME}"));

        let (len, off) = append(&warc, &[
            ("WARC-Type", "revisit"),
            ("WARC-Target-URI", "http://example.org/"),
            ("WARC-Date", "2014-01-01T00:00:00Z"),
        ], b"");
        lines.push(format!("org,example)/ 20140101000000 http://example.org/ warc/revisit - ORPHANDIGEST - - {len} {off} {WARC_NAME}"));

        let (len, off) = append(&warc, &[
            ("WARC-Type", "revisit"),
            ("WARC-Target-URI", "http://example.net/"),
            ("WARC-Date", "2014-01-01T00:00:00Z"),
        ], b"");
        lines.push(format!("net,example)/ 20140101000000 http://example.net/ warc/revisit - LOOPDIGEST - - {len} {off} {WARC_NAME}"));
        lines.push(format!("net,example)/ 20140101000000 http://example.net/ text/html 200 LOOPDIGEST - - {len} {off} {WARC_NAME}"));

        lines.sort();
        std::fs::write(dir.path().join("index.cdx"), lines.join("\n") + "\n").unwrap();
        Self { dir, lines }
    }

    /// Storage prefix under which the WARC file is found.
    pub(crate) fn prefix(&self) -> String {
        format!("{}/", self.dir.path().display())
    }

    pub(crate) fn index_path(&self) -> PathBuf {
        self.dir.path().join("index.cdx")
    }

    pub(crate) fn index(&self) -> Arc<dyn CaptureIndex> {
        Arc::new(CdxServer::local([self.index_path()]))
    }

    /// The `com,example)/` entry captured at `timestamp`.
    pub(crate) fn entry(&self, timestamp: &str) -> CdxEntry {
        self.find(&format!("com,example)/ {timestamp} "))
    }

    pub(crate) fn orphan_entry(&self) -> CdxEntry {
        self.find("org,example)/ ")
    }

    pub(crate) fn self_loop_entry(&self) -> CdxEntry {
        self.lines
            .iter()
            .filter(|l| l.starts_with("net,example)/ "))
            .map(|l| CdxEntry::parse(l).unwrap())
            .find(CdxEntry::is_revisit)
            .unwrap()
            .with_source("local")
    }

    fn find(&self, prefix: &str) -> CdxEntry {
        let line = self.lines.iter().find(|l| l.starts_with(prefix)).unwrap();
        CdxEntry::parse(line).unwrap().with_source("local")
    }
}

fn append(path: &Path, headers: &[(&str, &str)], body: &[u8]) -> (u64, u64) {
    let headers: RecordHeaders = headers.iter().copied().collect();
    let (offset, length) = append_record(path, &headers, body, true).unwrap();
    (length, offset)
}
