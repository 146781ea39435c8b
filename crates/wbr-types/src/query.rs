//! Capture lookup queries and their wire parameter encoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::surt::UrlKey;

/// How index keys are compared against the canonical query key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Only records for exactly this URL.
    #[default]
    Exact,
    /// Records whose key starts with this URL's key.
    Prefix,
    /// Every record on the same host.
    Host,
    /// Every record on the host and its subdomains.
    Domain,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Prefix => "prefix",
            Self::Host => "host",
            Self::Domain => "domain",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exact" => Ok(Self::Exact),
            "prefix" => Ok(Self::Prefix),
            "host" => Ok(Self::Host),
            "domain" => Ok(Self::Domain),
            other => Err(TypeError::InvalidParam {
                name: "matchType".into(),
                value: other.into(),
            }),
        }
    }
}

/// Requested shape of query results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputForm {
    /// Structured entries.
    #[default]
    CdxObject,
    /// Space-separated 11-field CDX lines.
    Text,
    /// One JSON object per line.
    Json,
}

impl OutputForm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CdxObject => "cdxobject",
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for OutputForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputForm {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cdxobject" => Ok(Self::CdxObject),
            "text" | "cdx" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(TypeError::InvalidParam {
                name: "output".into(),
                value: other.into(),
            }),
        }
    }
}

/// A capture lookup.
///
/// Built with chained setters:
///
/// ```
/// use wbr_types::{CdxQuery, MatchType};
///
/// let q = CdxQuery::new("http://example.com/")
///     .with_limit(2)
///     .with_match_type(MatchType::Prefix)
///     .fuzzy();
/// assert_eq!(q.limit, Some(2));
/// assert!(q.allow_fuzzy);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdxQuery {
    /// The requested URL, as given by the caller.
    pub url: String,
    /// Key comparison rule.
    pub match_type: MatchType,
    /// Maximum number of entries to return.
    pub limit: Option<usize>,
    /// Target timestamp; results are ordered by distance from it.
    pub closest: Option<String>,
    /// Sort descending by (key, timestamp).
    pub reverse: bool,
    /// Retry with a broader query when nothing matches.
    pub allow_fuzzy: bool,
    /// Result shape.
    pub output: OutputForm,
    /// Field filters applied to every candidate (`[!][=|~]field:value`).
    pub filters: Vec<String>,
}

impl CdxQuery {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_closest(mut self, timestamp: impl Into<String>) -> Self {
        self.closest = Some(timestamp.into());
        self
    }

    pub fn reversed(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn with_match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    pub fn fuzzy(mut self) -> Self {
        self.allow_fuzzy = true;
        self
    }

    pub fn with_output(mut self, output: OutputForm) -> Self {
        self.output = output;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    /// Canonical key for this query.
    ///
    /// URL shorthands override `match_type`: `*.example.com` selects a
    /// domain match and a trailing `*` selects a prefix match.
    pub fn url_key(&self) -> TypeResult<UrlKey> {
        let url = self.url.trim();
        if let Some(domain) = url.strip_prefix("*.") {
            return UrlKey::new(domain, MatchType::Domain);
        }
        if let Some(prefix) = url.strip_suffix('*') {
            return UrlKey::new(prefix, MatchType::Prefix);
        }
        UrlKey::new(url, self.match_type)
    }

    /// Encode as remote query parameters.
    ///
    /// `allowFuzzy` is only emitted when `forward_fuzzy` is set, so that a
    /// remote source queried for raw lines never performs its own fallback.
    pub fn to_params(&self, forward_fuzzy: bool) -> Vec<(String, String)> {
        let mut params = vec![("url".to_string(), self.url.clone())];
        if self.match_type != MatchType::Exact {
            params.push(("matchType".into(), self.match_type.to_string()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".into(), limit.to_string()));
        }
        if let Some(closest) = &self.closest {
            params.push(("closest".into(), closest.clone()));
        }
        if self.reverse {
            params.push(("reverse".into(), "true".into()));
        }
        if self.output != OutputForm::CdxObject {
            params.push(("output".into(), self.output.to_string()));
        }
        for filter in &self.filters {
            params.push(("filter".into(), filter.clone()));
        }
        if forward_fuzzy && self.allow_fuzzy {
            params.push(("allowFuzzy".into(), "true".into()));
        }
        params
    }

    /// Decode remote query parameters. Unknown parameters are ignored.
    pub fn from_params<I, K, V>(pairs: I) -> TypeResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = Self::default();
        let mut has_url = false;

        for (name, value) in pairs {
            let (name, value) = (name.as_ref(), value.as_ref());
            match name {
                "url" => {
                    query.url = value.to_string();
                    has_url = true;
                }
                "matchType" => query.match_type = value.parse()?,
                "limit" => {
                    let limit = value.parse::<usize>().map_err(|_| TypeError::InvalidParam {
                        name: name.into(),
                        value: value.into(),
                    })?;
                    query.limit = Some(limit);
                }
                "closest" => query.closest = Some(value.to_string()),
                "reverse" => query.reverse = parse_flag(name, value)?,
                "allowFuzzy" => query.allow_fuzzy = parse_flag(name, value)?,
                "output" => query.output = value.parse()?,
                "filter" => query.filters.push(value.to_string()),
                _ => {}
            }
        }

        if !has_url || query.url.trim().is_empty() {
            return Err(TypeError::MissingParam("url".into()));
        }
        Ok(query)
    }
}

fn parse_flag(name: &str, value: &str) -> TypeResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(TypeError::InvalidParam {
            name: name.into(),
            value: value.into(),
        }),
    }
}
