use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use wbr_index::{
    CaptureIndex, CdxServer, HttpTransport, IndexError, LocalCdxSource, RemoteCdxServer,
    RemoteCdxSource, ReqwestTransport,
};
use wbr_loader::{
    HttpFetcher, LiveFetch, LiveLoader, LoadError, LoadedRecord, PrefixPathResolver, RecordResolver,
    RequestContext,
};
use wbr_rules::FuzzyRuleSet;
use wbr_types::timestamp::datetime_to_timestamp;
use wbr_types::{CdxEntry, CdxQuery};

use crate::config::{is_remote, ArchiveConfig};
use crate::error::{SdkError, SdkResult};

/// High-level archive API: capture lookup plus record loading, with an
/// optional live fallback.
pub struct Archive {
    config: ArchiveConfig,
    rules: Arc<FuzzyRuleSet>,
    index: Arc<dyn CaptureIndex>,
    resolver: RecordResolver,
    live: Option<LiveLoader>,
}

impl Archive {
    /// Build an archive from its configuration.
    pub fn open(config: ArchiveConfig) -> SdkResult<Self> {
        config.validate()?;

        let rules = Arc::new(match &config.rules.file {
            Some(path) => FuzzyRuleSet::load(path)?,
            None => FuzzyRuleSet::default_rules()?,
        });

        let index = build_index(&config, rules.clone())?;
        let resolver = RecordResolver::new(
            Arc::new(PrefixPathResolver::new(config.archive.paths.clone())),
            index.clone(),
        );

        let mut archive = Self {
            config,
            rules,
            index,
            resolver,
            live: None,
        };
        if archive.config.live.enabled {
            archive = archive.with_live_fetcher(Arc::new(HttpFetcher::new()?));
        }

        tracing::info!(
            sources = archive.config.index.sources.len(),
            live = archive.live.is_some(),
            "archive opened"
        );
        Ok(archive)
    }

    /// Read the config file at `path` and open the archive it describes.
    pub fn from_config_file(path: &Path) -> SdkResult<Self> {
        Self::open(ArchiveConfig::load(path)?)
    }

    /// Enable live loading through `fetcher`.
    pub fn with_live_fetcher(mut self, fetcher: Arc<dyn LiveFetch>) -> Self {
        self.live = Some(
            LiveLoader::new(fetcher)
                .with_timeout(self.config.live.timeout())
                .with_skip_headers(self.config.live.skip_headers.clone()),
        );
        self
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    pub fn rules(&self) -> &FuzzyRuleSet {
        &self.rules
    }

    pub fn live_enabled(&self) -> bool {
        self.live.is_some()
    }

    /// Run a capture query.
    pub fn query(&self, query: &CdxQuery) -> SdkResult<Vec<CdxEntry>> {
        Ok(self.index.load(query)?)
    }

    /// Load one entry: the stored record when it has one, otherwise (or
    /// when the stored copy is missing) a live capture of its `load_url`.
    pub fn load(&self, entry: &CdxEntry, request: &RequestContext) -> SdkResult<LoadedRecord> {
        let archived = match self.resolver.resolve(entry) {
            Ok(Some(record)) => return Ok(record),
            Ok(None) => None,
            Err(e @ (LoadError::ArchiveNotFound { .. } | LoadError::Warc(_))) => Some(e),
            Err(e) => return Err(e.into()),
        };

        if let (Some(live), Some(_)) = (&self.live, &entry.load_url) {
            if let Some(err) = &archived {
                tracing::warn!(url = %entry.original, error = %err, "stored record unavailable, loading live");
            }
            if let Some(record) = live.resolve(entry, request)? {
                return Ok(record);
            }
        }

        match archived {
            Some(err) => Err(err.into()),
            None => Err(SdkError::NotLoadable(entry.original.clone())),
        }
    }

    /// Find the capture of `url` closest to `closest` (latest first when
    /// absent) and load it. With live loading enabled, a URL with no
    /// captures is fetched live instead.
    pub fn lookup(
        &self,
        url: &str,
        closest: Option<&str>,
        request: &RequestContext,
    ) -> SdkResult<(CdxEntry, LoadedRecord)> {
        let mut query = CdxQuery::new(url).with_limit(1);
        query = match closest {
            Some(ts) => query.with_closest(ts),
            None => query.reversed(),
        };
        if self.config.rules.fuzzy {
            query = query.fuzzy();
        }

        match self.query(&query) {
            Ok(entries) => {
                let entry = entries
                    .into_iter()
                    .next()
                    .ok_or_else(|| IndexError::NotFound(url.to_string()))?;
                let record = self.load(&entry, request)?;
                Ok((entry, record))
            }
            Err(e) if e.is_not_found() && self.live.is_some() => {
                tracing::debug!(url, "no captures, falling back to live");
                self.live_capture(url, request)
            }
            Err(e) => Err(e),
        }
    }

    /// Capture `url` live now.
    pub fn live_capture(&self, url: &str, request: &RequestContext) -> SdkResult<(CdxEntry, LoadedRecord)> {
        let live = self
            .live
            .as_ref()
            .ok_or_else(|| SdkError::Config("live loading is disabled".into()))?;
        let entry = CdxEntry::live(url, datetime_to_timestamp(&Utc::now()))?.with_source("live");
        let record = live
            .resolve(&entry, request)?
            .ok_or_else(|| SdkError::NotLoadable(url.to_string()))?;
        Ok((entry, record))
    }
}

fn build_index(config: &ArchiveConfig, rules: Arc<FuzzyRuleSet>) -> SdkResult<Arc<dyn CaptureIndex>> {
    let sources = &config.index.sources;
    let timeout = Duration::from_secs(config.index.timeout_secs);
    let transport = || -> SdkResult<Arc<dyn HttpTransport>> { Ok(Arc::new(ReqwestTransport::new(timeout)?)) };

    if config.index.remote_filtering {
        let endpoint = sources
            .first()
            .ok_or_else(|| SdkError::Config("index.remote_filtering needs a source".into()))?;
        return Ok(Arc::new(RemoteCdxServer::new(endpoint.clone(), transport()?)));
    }

    let mut server = CdxServer::new().with_rules(rules);
    for source in sources {
        if is_remote(source) {
            server = server.with_source(RemoteCdxSource::new(source.clone(), transport()?));
        } else {
            server = server.with_source(LocalCdxSource::new([source]).with_name(source_name(source)));
        }
    }
    Ok(Arc::new(server))
}

/// Source tag for a local index path: its file stem (`dupes` for
/// `/data/dupes.cdx`).
fn source_name(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}
