use std::time::Duration;

use crate::error::{IndexError, IndexResult};

/// Status and body of an index endpoint response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportReply {
    pub status: u16,
    pub body: String,
}

/// Blocking HTTP GET used by remote index sources.
///
/// Implementations return every response, whatever its status; status
/// classification happens in the source. Only failures to get a response
/// at all are errors (`IndexError::Transport`).
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str) -> IndexResult<TransportReply>;
}

/// `reqwest`-backed transport.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> IndexResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str) -> IndexResult<TransportReply> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| IndexError::Transport(format!("{url}: {e}")))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| IndexError::Transport(format!("{url}: {e}")))?;
        tracing::debug!(%url, status, bytes = body.len(), "index response");
        Ok(TransportReply { status, body })
    }
}
