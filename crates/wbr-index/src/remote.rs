use std::sync::Arc;

use url::Url;
use wbr_types::CdxQuery;

use crate::error::{IndexError, IndexResult};
use crate::source::{IndexSource, SourceReply};
use crate::transport::HttpTransport;

/// A CDX HTTP endpoint.
///
/// In the default mode only `url` and `matchType` are sent and all
/// ordering, filtering and fuzzy retry stay local. In delegated mode every
/// query option, including `allowFuzzy`, is forwarded and the endpoint is
/// trusted to return a finished result.
#[derive(Clone)]
pub struct RemoteCdxSource {
    name: String,
    endpoint: String,
    transport: Arc<dyn HttpTransport>,
    delegate: bool,
}

impl std::fmt::Debug for RemoteCdxSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCdxSource")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("delegate", &self.delegate)
            .finish()
    }
}

impl RemoteCdxSource {
    pub fn new(endpoint: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        let endpoint = endpoint.into();
        Self {
            name: host_tag(&endpoint),
            endpoint,
            transport,
            delegate: false,
        }
    }

    /// Forward every query option to the endpoint.
    pub fn delegated(mut self) -> Self {
        self.delegate = true;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Full request URL for `query`.
    pub fn request_url(&self, query: &CdxQuery) -> IndexResult<String> {
        let params = if self.delegate {
            query.to_params(true)
        } else {
            CdxQuery::new(query.url.clone())
                .with_match_type(query.match_type)
                .to_params(false)
        };
        let url = Url::parse_with_params(&self.endpoint, &params)
            .map_err(|e| IndexError::BadRequest(format!("{}: {e}", self.endpoint)))?;
        Ok(url.into())
    }
}

impl IndexSource for RemoteCdxSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self, query: &CdxQuery) -> IndexResult<SourceReply> {
        let url = self.request_url(query)?;
        let reply = self.transport.get(&url)?;

        if !(200..300).contains(&reply.status) {
            tracing::debug!(%url, status = reply.status, "index endpoint refused query");
            return Err(IndexError::from_status(reply.status, &url, &reply.body));
        }

        let lines = reply
            .body
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect();
        Ok(SourceReply::from_lines(lines))
    }
}

/// Default source tag: the endpoint's host, or the endpoint itself when it
/// has none.
fn host_tag(endpoint: &str) -> String {
    Url::parse(endpoint)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .unwrap_or_else(|| endpoint.to_string())
}
