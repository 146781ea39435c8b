//! Shared fixtures for index tests.

use std::sync::Mutex;

use tempfile::TempDir;
use url::Url;
use wbr_types::CdxQuery;

use crate::engine::{CaptureIndex, CdxServer};
use crate::error::{IndexError, IndexResult};
use crate::transport::{HttpTransport, TransportReply};

const DUPES_CDX: &str = " CDX N b a m s k r M S V g
com,example)/ 20140127171200 http://example.com text/html 200 B2LTWWPUOYAH7UIPQ7ZUPQ4VMBSVC36A - - 1046 334 dupes.warc.gz
com,example)/ 20140127171251 http://example.com warc/revisit - B2LTWWPUOYAH7UIPQ7ZUPQ4VMBSVC36A - - 553 11875 dupes.warc.gz
org,iana)/ 20140127171238 http://iana.org unk 302 3I42H3S6NNFQ2MSVX7XZKYAYSCX5QBYJ http://www.iana.org/ - 343 1858 dupes.warc.gz
";

const AGNOSTIC_CDX: &str = "com,example)/ 20130729195151 http://test@example.com/ warc/revisit - B2LTWWPUOYAH7UIPQ7ZUPQ4VMBSVC36A - - 591 355 example-url-agnostic-revisit.warc.gz
";

const EXAMPLE_CDX: &str = "com,example)/?example=1 20140103030321 http://example.com?example=1 text/html 200 B2LTWWPUOYAH7UIPQ7ZUPQ4VMBSVC36A - - 1043 333 example.warc.gz
com,example)/?example=1 20140103030341 http://example.com?example=1 warc/revisit - B2LTWWPUOYAH7UIPQ7ZUPQ4VMBSVC36A - - 553 1864 example.warc.gz
";

/// A temp directory holding three small sorted CDX files.
pub(crate) fn write_cdx_fixtures() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("dupes.cdx"), DUPES_CDX).unwrap();
    std::fs::write(dir.path().join("example-url-agnostic-revisit.cdx"), AGNOSTIC_CDX).unwrap();
    std::fs::write(dir.path().join("example.cdx"), EXAMPLE_CDX).unwrap();
    dir
}

/// Expected fields of the `dupes.warc.gz` response capture of example.com.
pub(crate) fn cdx_result() -> Vec<(&'static str, &'static str)> {
    vec![
        ("urlkey", "com,example)/"),
        ("timestamp", "20140127171200"),
        ("original", "http://example.com"),
        ("mimetype", "text/html"),
        ("statuscode", "200"),
        ("digest", "B2LTWWPUOYAH7UIPQ7ZUPQ4VMBSVC36A"),
        ("redirect", "-"),
        ("robotflags", "-"),
        ("length", "1046"),
        ("offset", "334"),
        ("filename", "dupes.warc.gz"),
    ]
}

/// Answers every request with a fixed status and an empty body.
pub(crate) struct StatusTransport(pub u16);

impl HttpTransport for StatusTransport {
    fn get(&self, _url: &str) -> IndexResult<TransportReply> {
        Ok(TransportReply {
            status: self.0,
            body: String::new(),
        })
    }
}

/// Serves requests from an in-process engine, the way a CDX endpoint
/// would, and records every requested URL.
pub(crate) struct LoopbackTransport {
    server: CdxServer,
    requests: Mutex<Vec<String>>,
}

impl LoopbackTransport {
    pub(crate) fn new(server: CdxServer) -> Self {
        Self {
            server,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl HttpTransport for LoopbackTransport {
    fn get(&self, url: &str) -> IndexResult<TransportReply> {
        self.requests.lock().unwrap().push(url.to_string());

        let parsed = Url::parse(url).map_err(|e| IndexError::Transport(e.to_string()))?;
        let reply = |status: u16, body: String| Ok(TransportReply { status, body });

        let query = match CdxQuery::from_params(parsed.query_pairs()) {
            Ok(query) => query,
            Err(e) => return reply(400, e.to_string()),
        };

        match self.server.load(&query) {
            Ok(entries) => {
                let body = entries
                    .iter()
                    .map(|e| e.render(query.output))
                    .collect::<Vec<_>>()
                    .join("\n");
                reply(200, body)
            }
            Err(IndexError::NotFound(msg)) => reply(404, msg),
            Err(IndexError::AccessDenied(msg)) => reply(403, msg),
            Err(e) => reply(400, e.to_string()),
        }
    }
}
