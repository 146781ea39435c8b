//! On-demand capture of a live URL.
//!
//! [`LiveLoader`] fetches an entry's `load_url` and presents the response
//! the same way a stored `response` record would look: synthesized WARC
//! metadata headers, and a body that starts with the recorded HTTP status
//! line and headers followed by the upstream body bytes.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use url::Url;
use uuid::Uuid;
use wbr_types::timestamp::{datetime_to_http_date, datetime_to_iso_date, timestamp_to_datetime};
use wbr_types::CdxEntry;
use wbr_warc::{BodyStream, RecordHeaders};

use crate::error::{LoadError, LoadResult};
use crate::memento::decorate;
use crate::record::LoadedRecord;

/// Response header prefixes never copied from upstream.
pub const SKIP_HEADERS: [&str; 4] = ["link", "memento-datetime", "content-location", "x-archive"];

/// Default live fetch timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The inbound request a live load is made on behalf of.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub method: String,
    pub headers: RecordHeaders,
    pub body: Option<Vec<u8>>,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            headers: RecordHeaders::new(),
            body: None,
        }
    }
}

impl RequestContext {
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.set(name, value);
        self
    }
}

/// An outbound live request. Redirects must not be followed.
#[derive(Clone, Debug)]
pub struct LiveRequest {
    pub url: String,
    pub method: String,
    pub headers: RecordHeaders,
    pub body: Option<Vec<u8>>,
    pub timeout: Duration,
}

/// An upstream response with its body still unread.
pub struct LiveResponse {
    /// Status line as received, without its line terminator.
    pub status_line: String,
    pub status: u16,
    /// Header lines as received, without line terminators.
    pub header_lines: Vec<String>,
    pub peer_ip: Option<String>,
    pub body: Box<dyn Read + Send>,
}

impl LiveResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.header_lines, name)
    }
}

/// Trimmed value of the first `name` header among raw header lines.
pub(crate) fn header_value<'a>(lines: &'a [String], name: &str) -> Option<&'a str> {
    lines
        .iter()
        .filter_map(|line| line.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case(name))
        .map(|(_, v)| v.trim())
}

/// Performs live HTTP requests.
pub trait LiveFetch: Send + Sync {
    fn fetch(&self, request: &LiveRequest) -> LoadResult<LiveResponse>;
}

/// Records the upstream status line and header lines byte for byte,
/// dropping headers whose lowercase name starts with a skip prefix.
#[derive(Debug, Default)]
pub struct HeaderRecorder {
    skip: Vec<String>,
    buf: Vec<u8>,
    skipped: Vec<String>,
    skipping: bool,
    target_ip: Option<String>,
}

impl HeaderRecorder {
    pub fn new<I, S>(skip: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            skip: skip.into_iter().map(|s| s.as_ref().to_ascii_lowercase()).collect(),
            ..Self::default()
        }
    }

    pub fn write_status_line(&mut self, line: &str) {
        self.push_line(line);
    }

    /// Record one header line. A folded continuation line follows the
    /// fate of the header it continues.
    pub fn write_header_line(&mut self, line: &str) {
        let continuation = line.starts_with([' ', '\t']);
        if !continuation {
            self.skipping = !self.accept_header(line);
        }
        if self.skipping {
            self.skipped.push(line.to_string());
        } else {
            self.push_line(line);
        }
    }

    pub fn accept_header(&self, line: &str) -> bool {
        let lower = line.to_ascii_lowercase();
        !self.skip.iter().any(|prefix| lower.starts_with(prefix.as_str()))
    }

    pub fn finish(&mut self, peer_ip: Option<String>) {
        self.buf.extend_from_slice(b"\r\n");
        self.target_ip = peer_ip;
    }

    pub fn header(&self) -> &[u8] {
        &self.buf
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn target_ip(&self) -> Option<&str> {
        self.target_ip.as_deref()
    }

    /// Record a whole response head.
    pub fn record(&mut self, response: &LiveResponse) {
        self.write_status_line(&response.status_line);
        for line in &response.header_lines {
            self.write_header_line(line);
        }
        self.finish(response.peer_ip.clone());
    }

    fn push_line(&mut self, line: &str) {
        self.buf.extend_from_slice(line.as_bytes());
        self.buf.extend_from_slice(b"\r\n");
    }
}

/// Loads entries that carry a `load_url` by fetching it live.
pub struct LiveLoader {
    fetcher: Arc<dyn LiveFetch>,
    timeout: Duration,
    skip_headers: Vec<String>,
}

impl LiveLoader {
    pub fn new(fetcher: Arc<dyn LiveFetch>) -> Self {
        Self {
            fetcher,
            timeout: DEFAULT_TIMEOUT,
            skip_headers: SKIP_HEADERS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_skip_headers(mut self, skip_headers: Vec<String>) -> Self {
        self.skip_headers = skip_headers;
        self
    }

    /// Build the outbound request for `entry`.
    pub fn build_request(&self, entry: &CdxEntry, load_url: &str, request: &RequestContext) -> LoadResult<LiveRequest> {
        let mut headers = request.headers.clone();

        if !entry.is_live {
            let dt = timestamp_to_datetime(&entry.timestamp)?;
            headers.set("Accept-Datetime", datetime_to_http_date(&dt));
        }

        if load_url != entry.original && headers.contains("Origin") {
            headers.set("Origin", origin_of(load_url)?);
        }

        Ok(LiveRequest {
            url: load_url.to_string(),
            method: request.method.clone(),
            headers,
            body: request.body.clone(),
            timeout: self.timeout,
        })
    }

    /// Fetch `entry` live. `Ok(None)` when it has no `load_url`.
    pub fn resolve(&self, entry: &CdxEntry, request: &RequestContext) -> LoadResult<Option<LoadedRecord>> {
        let Some(load_url) = entry.load_url.as_deref().filter(|u| !u.is_empty()) else {
            return Ok(None);
        };

        let dt = timestamp_to_datetime(&entry.timestamp)?;
        let outbound = self.build_request(entry, load_url, request)?;
        let response = self.fetcher.fetch(&outbound)?;

        let mut recorder = HeaderRecorder::new(&self.skip_headers);
        recorder.record(&response);
        tracing::debug!(
            url = load_url,
            status = response.status,
            skipped = recorder.skipped().len(),
            "live response"
        );

        let mut headers = RecordHeaders::new();
        headers.set("Content-Type", "application/http; msgtype=response");
        headers.set("WARC-Type", "response");
        headers.set("WARC-Record-ID", make_warc_id());
        headers.set("WARC-Target-URI", entry.original.clone());
        headers.set("WARC-Date", datetime_to_iso_date(&dt));
        if let Some(ip) = recorder.target_ip() {
            headers.set("WARC-IP-Address", ip);
        }

        let upstream_len = response
            .header("content-length")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|len| *len > 0);
        if let Some(len) = upstream_len {
            headers.set("Content-Length", (len + recorder.header().len() as u64).to_string());
        }

        decorate(&mut headers, entry)?;

        let body = BodyStream::new(response.body).with_header(recorder.header().to_vec());
        Ok(Some(LoadedRecord::new(headers, body)))
    }
}

/// `<urn:uuid:...>` with a fresh time-ordered UUID.
fn make_warc_id() -> String {
    format!("<urn:uuid:{}>", Uuid::now_v7())
}

/// `scheme://host[:port]` of `url`.
fn origin_of(url: &str) -> LoadResult<String> {
    let parsed = Url::parse(url).map_err(|e| LoadError::LiveFetch {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    let host = parsed.host_str().unwrap_or("");
    Ok(match parsed.port() {
        Some(port) => format!("{}://{host}:{port}", parsed.scheme()),
        None => format!("{}://{host}", parsed.scheme()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::Mutex;

    // -----------------------------------------------------------------------
    // Fake fetcher
    // -----------------------------------------------------------------------

    struct FakeFetcher {
        headers: Vec<(String, String)>,
        body: Vec<u8>,
        peer_ip: Option<String>,
        fail: bool,
        seen: Mutex<Vec<LiveRequest>>,
    }

    impl FakeFetcher {
        fn new(headers: &[(&str, &str)], body: &[u8]) -> Self {
            Self {
                headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                body: body.to_vec(),
                peer_ip: Some("93.184.216.34".into()),
                fail: false,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(&[], b"")
            }
        }

        fn last_request(&self) -> LiveRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl LiveFetch for FakeFetcher {
        fn fetch(&self, request: &LiveRequest) -> LoadResult<LiveResponse> {
            self.seen.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(LoadError::LiveFetch {
                    url: request.url.clone(),
                    reason: "timed out".into(),
                });
            }
            Ok(LiveResponse {
                status_line: "HTTP/1.1 200 OK".into(),
                status: 200,
                header_lines: self.headers.iter().map(|(k, v)| format!("{k}: {v}")).collect(),
                peer_ip: self.peer_ip.clone(),
                body: Box::new(Cursor::new(self.body.clone())),
            })
        }
    }

    fn live_entry(url: &str, load_url: &str) -> CdxEntry {
        let mut entry = CdxEntry::live(url, "20140127171200").unwrap();
        entry.is_live = false;
        entry.load_url = Some(load_url.to_string());
        entry
    }

    fn load(fetcher: &Arc<FakeFetcher>, entry: &CdxEntry, request: &RequestContext) -> LoadedRecord {
        LiveLoader::new(fetcher.clone())
            .resolve(entry, request)
            .unwrap()
            .unwrap()
    }

    // -----------------------------------------------------------------------
    // Outbound request
    // -----------------------------------------------------------------------

    #[test]
    fn adds_accept_datetime_for_archival_entries() {
        let fetcher = Arc::new(FakeFetcher::new(&[], b""));
        let entry = live_entry("http://example.com/", "http://example.com/");
        load(&fetcher, &entry, &RequestContext::default());
        assert_eq!(
            fetcher.last_request().headers.get("Accept-Datetime"),
            Some("Mon, 27 Jan 2014 17:12:00 GMT")
        );
    }

    #[test]
    fn live_marker_skips_accept_datetime() {
        let fetcher = Arc::new(FakeFetcher::new(&[], b""));
        let mut entry = live_entry("http://example.com/", "http://example.com/");
        entry.is_live = true;
        load(&fetcher, &entry, &RequestContext::default());
        assert!(!fetcher.last_request().headers.contains("Accept-Datetime"));
    }

    #[test]
    fn origin_rewritten_for_different_load_url() {
        let fetcher = Arc::new(FakeFetcher::new(&[], b""));
        let entry = live_entry("http://example.com/", "https://mirror.example.net:8443/page");
        let request = RequestContext::default().with_header("Origin", "http://wayback.local");
        load(&fetcher, &entry, &request);
        assert_eq!(
            fetcher.last_request().headers.get("Origin"),
            Some("https://mirror.example.net:8443")
        );
    }

    #[test]
    fn origin_kept_for_same_url_and_never_added() {
        let fetcher = Arc::new(FakeFetcher::new(&[], b""));
        let entry = live_entry("http://example.com/", "http://example.com/");
        let request = RequestContext::default().with_header("Origin", "http://wayback.local");
        load(&fetcher, &entry, &request);
        assert_eq!(fetcher.last_request().headers.get("Origin"), Some("http://wayback.local"));

        let other = live_entry("http://example.com/", "http://mirror.example.net/");
        load(&fetcher, &other, &RequestContext::default());
        assert!(!fetcher.last_request().headers.contains("Origin"));
    }

    #[test]
    fn request_method_and_body_are_forwarded() {
        let fetcher = Arc::new(FakeFetcher::new(&[], b""));
        let entry = live_entry("http://example.com/", "http://example.com/");
        let request = RequestContext {
            method: "POST".into(),
            body: Some(b"a=1".to_vec()),
            ..RequestContext::default()
        };
        load(&fetcher, &entry, &request);
        let sent = fetcher.last_request();
        assert_eq!(sent.method, "POST");
        assert_eq!(sent.body.as_deref(), Some(&b"a=1"[..]));
        assert_eq!(sent.timeout, DEFAULT_TIMEOUT);
    }

    // -----------------------------------------------------------------------
    // Synthesized record
    // -----------------------------------------------------------------------

    #[test]
    fn synthesizes_response_metadata() {
        let fetcher = Arc::new(FakeFetcher::new(
            &[("Content-Type", "text/html"), ("Content-Length", "5")],
            b"hello",
        ));
        let entry = live_entry("http://example.com/", "http://example.com/").with_source("live");
        let mut loaded = load(&fetcher, &entry, &RequestContext::default());

        let recorded = b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 5\r\n\r\n";
        let h = &loaded.headers;
        assert_eq!(h.get("Content-Type"), Some("application/http; msgtype=response"));
        assert_eq!(h.get("WARC-Type"), Some("response"));
        assert!(h.get("WARC-Record-ID").unwrap().starts_with("<urn:uuid:"));
        assert_eq!(h.get("WARC-Target-URI"), Some("http://example.com/"));
        assert_eq!(h.get("WARC-Date"), Some("2014-01-27T17:12:00Z"));
        assert_eq!(h.get("WARC-IP-Address"), Some("93.184.216.34"));
        assert_eq!(h.get("WARC-Coll"), Some("live"));
        assert_eq!(h.get("Memento-Datetime"), Some("Mon, 27 Jan 2014 17:12:00 GMT"));
        let expected_len = (5 + recorded.len()).to_string();
        assert_eq!(h.get("Content-Length"), Some(expected_len.as_str()));

        let first = loaded.body.next().unwrap().unwrap();
        assert_eq!(&first[..], &recorded[..]);
        assert_eq!(loaded.body.read_all().unwrap(), b"hello");
    }

    #[test]
    fn skip_headers_are_dropped_from_recording() {
        let fetcher = Arc::new(FakeFetcher::new(
            &[
                ("Link", "<http://x>; rel=\"memento\""),
                ("Memento-Datetime", "Mon, 27 Jan 2014 17:12:00 GMT"),
                ("Content-Location", "/x"),
                ("X-Archive-Orig-Server", "apache"),
                ("Server", "nginx"),
            ],
            b"",
        ));
        let entry = live_entry("http://example.com/", "http://example.com/");
        let mut loaded = load(&fetcher, &entry, &RequestContext::default());
        let recorded = loaded.body.next().unwrap().unwrap();
        assert_eq!(&recorded[..], b"HTTP/1.1 200 OK\r\nServer: nginx\r\n\r\n");
    }

    #[test]
    fn content_length_only_when_positive() {
        for value in [None, Some("0"), Some("abc"), Some("-3")] {
            let headers: Vec<(&str, &str)> = value.map(|v| ("Content-Length", v)).into_iter().collect();
            let fetcher = Arc::new(FakeFetcher::new(&headers, b""));
            let entry = live_entry("http://example.com/", "http://example.com/");
            let loaded = load(&fetcher, &entry, &RequestContext::default());
            assert!(!loaded.headers.contains("Content-Length"), "{value:?}");
        }
    }

    #[test]
    fn recorder_keeps_lines_verbatim_and_drops_folded_skips() {
        let mut recorder = HeaderRecorder::new(SKIP_HEADERS);
        recorder.write_status_line("HTTP/1.0 404 Nope");
        recorder.write_header_line("X-Custom-Header:A");
        recorder.write_header_line("Link: <http://x>;");
        recorder.write_header_line("  rel=\"memento\"");
        recorder.write_header_line("Server: nginx");
        recorder.write_header_line("\tversion/1");
        recorder.finish(None);
        assert_eq!(
            recorder.header(),
            b"HTTP/1.0 404 Nope\r\nX-Custom-Header:A\r\nServer: nginx\r\n\tversion/1\r\n\r\n"
        );
        assert_eq!(recorder.skipped(), ["Link: <http://x>;", "  rel=\"memento\""]);
    }

    #[test]
    fn missing_peer_ip_omits_header() {
        let mut fake = FakeFetcher::new(&[], b"");
        fake.peer_ip = None;
        let fetcher = Arc::new(fake);
        let entry = live_entry("http://example.com/", "http://example.com/");
        let loaded = load(&fetcher, &entry, &RequestContext::default());
        assert!(!loaded.headers.contains("WARC-IP-Address"));
    }

    #[test]
    fn no_load_url_is_none() {
        let loader = LiveLoader::new(Arc::new(FakeFetcher::new(&[], b"")));
        let mut entry = live_entry("http://example.com/", "");
        assert!(loader.resolve(&entry, &RequestContext::default()).unwrap().is_none());
        entry.load_url = None;
        assert!(loader.resolve(&entry, &RequestContext::default()).unwrap().is_none());
    }

    #[test]
    fn fetch_failure_is_live_fetch_error() {
        let loader = LiveLoader::new(Arc::new(FakeFetcher::failing()));
        let entry = live_entry("http://example.com/", "http://example.com/");
        let err = loader.resolve(&entry, &RequestContext::default()).unwrap_err();
        assert!(matches!(err, LoadError::LiveFetch { .. }));
    }
}
