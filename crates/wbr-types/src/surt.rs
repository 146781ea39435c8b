//! SURT canonicalization: the sort/match key form of a URL.
//!
//! `http://www.Example.com:8080/Path?b=2&a=1#frag` becomes
//! `com,example:8080)/path?a=1&b=2`. Index records are sorted by this key,
//! so every lookup canonicalizes before touching an index.

use url::{Host, Url};

use crate::error::{TypeError, TypeResult};
use crate::query::MatchType;

/// Canonicalize a URL into its SURT index key.
///
/// Scheme-less input is treated as `http://`. The scheme, userinfo,
/// fragment, default port and any leading `www`/`wwwN.` label are dropped;
/// host labels are reversed; query arguments are sorted; the result is
/// lowercased.
pub fn canonicalize(url: &str) -> TypeResult<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(TypeError::InvalidUrl(url.to_string()));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed.trim_start_matches("//"))
    };

    let parsed = Url::parse(&with_scheme).map_err(|e| TypeError::InvalidUrl(format!("{url}: {e}")))?;

    let host = match parsed.host() {
        Some(Host::Domain(domain)) => surt_host(domain),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => format!("[{addr}]"),
        None => return Ok(with_scheme.to_lowercase()),
    };

    let mut key = host;
    if let Some(port) = parsed.port() {
        key.push(':');
        key.push_str(&port.to_string());
    }
    key.push(')');

    let path = parsed.path();
    key.push_str(if path.is_empty() { "/" } else { path });

    if let Some(query) = parsed.query() {
        let mut args: Vec<&str> = query.split('&').filter(|a| !a.is_empty()).collect();
        if !args.is_empty() {
            args.sort_unstable();
            key.push('?');
            key.push_str(&args.join("&"));
        }
    }

    Ok(key.to_lowercase())
}

/// Reverse a domain name into SURT order, dropping a leading `www` label.
fn surt_host(domain: &str) -> String {
    let domain = domain.trim_end_matches('.').to_lowercase();
    let stripped = strip_www(&domain);
    stripped.split('.').rev().collect::<Vec<_>>().join(",")
}

fn strip_www(domain: &str) -> &str {
    if let Some(rest) = domain.strip_prefix("www") {
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
        if let Some(tail) = rest.strip_prefix('.') {
            if tail.contains('.') {
                return tail;
            }
        }
    }
    domain
}

/// The host portion of a SURT key, including the closing `)`.
pub fn host_part(key: &str) -> &str {
    match key.find(')') {
        Some(idx) => &key[..=idx],
        None => key,
    }
}

/// A canonical key together with the match rule it is compared under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlKey {
    /// Canonical SURT key of the requested URL.
    pub key: String,
    /// How index keys are compared against `key`.
    pub match_type: MatchType,
}

impl UrlKey {
    /// Canonicalize `url` and pair it with `match_type`.
    pub fn new(url: &str, match_type: MatchType) -> TypeResult<Self> {
        Ok(Self {
            key: canonicalize(url)?,
            match_type,
        })
    }

    /// Smallest index key that can match; sorted sources seek here.
    pub fn start_key(&self) -> &str {
        match self.match_type {
            MatchType::Exact | MatchType::Prefix => &self.key,
            MatchType::Host => host_part(&self.key),
            MatchType::Domain => host_part(&self.key).trim_end_matches(')'),
        }
    }

    /// Whether an index record key satisfies this lookup.
    pub fn matches(&self, urlkey: &str) -> bool {
        match self.match_type {
            MatchType::Exact => urlkey == self.key,
            MatchType::Prefix => urlkey.starts_with(&self.key),
            MatchType::Host => urlkey.starts_with(host_part(&self.key)),
            MatchType::Domain => {
                let domain = self.start_key();
                urlkey
                    .strip_prefix(domain)
                    .map(|rest| rest.starts_with(')') || rest.starts_with(',') || rest.starts_with(':'))
                    .unwrap_or(false)
            }
        }
    }
}
