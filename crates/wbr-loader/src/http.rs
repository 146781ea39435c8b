//! HTTP/1.1 client for live captures.
//!
//! The response head is read off the connection line by line and kept as
//! received, so the recorded status line and header names match what the
//! upstream server sent. Bodies are framed by `Content-Length`, chunked
//! transfer coding, or connection close, and are left undecoded otherwise.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::ServerName;
use url::{Host, Position, Url};

use crate::error::{LoadError, LoadResult};
use crate::live::{header_value, LiveFetch, LiveRequest, LiveResponse};

/// Request headers the client writes itself.
const CONNECTION_HEADERS: [&str; 4] = ["host", "connection", "content-length", "transfer-encoding"];

/// Upper bound on the size of a response head.
const MAX_HEAD_BYTES: usize = 64 * 1024;

trait Connection: Read + Write + Send {}

impl<T: Read + Write + Send> Connection for T {}

/// Response status line and header lines, without line terminators.
#[derive(Debug, PartialEq, Eq)]
struct ResponseHead {
    status_line: String,
    status: u16,
    header_lines: Vec<String>,
}

/// Fetches `http` and `https` URLs over a fresh connection per request.
/// Redirects are returned, never followed.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    tls: Arc<rustls::ClientConfig>,
}

impl HttpFetcher {
    pub fn new() -> LoadResult<Self> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let roots = rustls::RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        let config = rustls::ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| LoadError::LiveFetch {
                url: String::new(),
                reason: e.to_string(),
            })?
            .with_root_certificates(roots)
            .with_no_client_auth();
        Ok(Self { tls: Arc::new(config) })
    }

    fn connect(&self, url: &Url, timeout: Duration) -> io::Result<(Box<dyn Connection>, SocketAddr)> {
        let tls = match url.scheme() {
            "http" => false,
            "https" => true,
            other => return Err(invalid(format!("unsupported scheme {other}"))),
        };
        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => return Err(invalid("URL has no host")),
        };
        let port = url
            .port_or_known_default()
            .ok_or_else(|| invalid("URL has no port"))?;

        let tcp = connect_any((host.as_str(), port), timeout)?;
        tcp.set_read_timeout(Some(timeout))?;
        tcp.set_write_timeout(Some(timeout))?;
        let peer = tcp.peer_addr()?;

        if !tls {
            return Ok((Box::new(tcp), peer));
        }
        let name = ServerName::try_from(host).map_err(|e| invalid(e.to_string()))?;
        let conn = rustls::ClientConnection::new(self.tls.clone(), name).map_err(io::Error::other)?;
        Ok((Box::new(rustls::StreamOwned::new(conn, tcp)), peer))
    }
}

impl LiveFetch for HttpFetcher {
    fn fetch(&self, request: &LiveRequest) -> LoadResult<LiveResponse> {
        let fail = |e: io::Error| LoadError::LiveFetch {
            url: request.url.clone(),
            reason: e.to_string(),
        };

        let url = Url::parse(&request.url).map_err(|e| fail(invalid(e.to_string())))?;
        let (mut conn, peer) = self.connect(&url, request.timeout).map_err(fail)?;
        write_request(&mut conn, &url, request).map_err(fail)?;

        let mut reader = BufReader::new(conn);
        let head = read_head(&mut reader).map_err(fail)?;
        tracing::trace!(url = %request.url, status_line = %head.status_line, "response head");

        let body = body_reader(reader, &head, &request.method);
        Ok(LiveResponse {
            status_line: head.status_line,
            status: head.status,
            header_lines: head.header_lines,
            peer_ip: Some(peer.ip().to_string()),
            body,
        })
    }
}

fn connect_any(addr: impl ToSocketAddrs, timeout: Duration) -> io::Result<TcpStream> {
    let mut last = None;
    for addr in addr.to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last = Some(e),
        }
    }
    Err(last.unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, "host resolved to no address")))
}

fn write_request(out: &mut impl Write, url: &Url, request: &LiveRequest) -> io::Result<()> {
    let target = &url[Position::BeforePath..Position::AfterQuery];
    let mut head = format!("{} {target} HTTP/1.1\r\n", request.method);
    head.push_str(&format!("Host: {}\r\n", &url[Position::BeforeHost..Position::AfterPort]));
    for (name, value) in request.headers.iter() {
        if CONNECTION_HEADERS.iter().any(|h| name.eq_ignore_ascii_case(h)) {
            continue;
        }
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    if let Some(body) = &request.body {
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    head.push_str("Connection: close\r\n\r\n");

    out.write_all(head.as_bytes())?;
    if let Some(body) = &request.body {
        out.write_all(body)?;
    }
    out.flush()
}

/// Read a response head, passing over interim `1xx` responses.
fn read_head(reader: &mut impl BufRead) -> io::Result<ResponseHead> {
    loop {
        let status_line = read_line(reader)?;
        let status = parse_status(&status_line)?;

        let mut size = status_line.len();
        let mut header_lines = Vec::new();
        loop {
            let line = read_line(reader)?;
            if line.is_empty() {
                break;
            }
            size += line.len();
            if size > MAX_HEAD_BYTES {
                return Err(invalid("response head too large"));
            }
            header_lines.push(line);
        }

        if (100..200).contains(&status) && status != 101 {
            continue;
        }
        return Ok(ResponseHead {
            status_line,
            status,
            header_lines,
        });
    }
}

/// `HTTP/x.y <status> [reason]`.
fn parse_status(line: &str) -> io::Result<u16> {
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or("");
    if !version.starts_with("HTTP/") {
        return Err(invalid(format!("bad status line {line:?}")));
    }
    parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .filter(|code| (100..1000).contains(code))
        .ok_or_else(|| invalid(format!("bad status line {line:?}")))
}

/// One line without its terminator. End of input is an error.
fn read_line(reader: &mut impl BufRead) -> io::Result<String> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed mid-response"));
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn body_reader<R>(reader: R, head: &ResponseHead, method: &str) -> Box<dyn Read + Send>
where
    R: BufRead + Send + 'static,
{
    if method.eq_ignore_ascii_case("HEAD") || matches!(head.status, 204 | 304) {
        return Box::new(io::empty());
    }
    let chunked = header_value(&head.header_lines, "transfer-encoding")
        .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));
    if chunked {
        return Box::new(ChunkedReader::new(reader));
    }
    match header_value(&head.header_lines, "content-length").and_then(|v| v.parse::<u64>().ok()) {
        Some(len) => Box::new(reader.take(len)),
        None => Box::new(reader),
    }
}

/// Decodes a `Transfer-Encoding: chunked` body. Trailers are discarded.
struct ChunkedReader<R> {
    inner: R,
    remaining: u64,
    done: bool,
}

impl<R: BufRead> ChunkedReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner,
            remaining: 0,
            done: false,
        }
    }

    fn next_chunk(&mut self) -> io::Result<()> {
        let line = read_line(&mut self.inner)?;
        let size = line.split(';').next().unwrap_or("").trim();
        self.remaining =
            u64::from_str_radix(size, 16).map_err(|_| invalid(format!("bad chunk size {size:?}")))?;
        if self.remaining == 0 {
            while !read_line(&mut self.inner)?.is_empty() {}
            self.done = true;
        }
        Ok(())
    }
}

impl<R: BufRead> Read for ChunkedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.done && self.remaining == 0 {
            self.next_chunk()?;
        }
        if self.done {
            return Ok(0);
        }

        let max = self.remaining.min(buf.len() as u64) as usize;
        let n = self.inner.read(&mut buf[..max])?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "chunk cut short"));
        }
        self.remaining -= n as u64;
        if self.remaining == 0 {
            read_line(&mut self.inner)?;
        }
        Ok(n)
    }
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}
