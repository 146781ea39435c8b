use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wbr_loader::SKIP_HEADERS;

use crate::error::{SdkError, SdkResult};

/// Contents of a `wbr.toml` file. Every section is optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub index: IndexConfig,
    pub archive: StorageConfig,
    pub rules: RulesConfig,
    pub live: LiveConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Local CDX files or directories, or `http(s)://` CDX endpoints.
    pub sources: Vec<String>,
    /// Let a single remote endpoint do matching, ordering and fuzzy retry.
    pub remote_filtering: bool,
    pub timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            remote_filtering: false,
            timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Prefixes joined with WARC filenames; `{source}` expands to the
    /// entry's source tag.
    pub paths: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Rule file replacing the bundled defaults.
    pub file: Option<PathBuf>,
    /// Whether lookups made through the archive allow fuzzy retry.
    pub fuzzy: bool,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            file: None,
            fuzzy: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub enabled: bool,
    pub timeout_secs: u64,
    /// Lowercase response header prefixes dropped from live captures.
    pub skip_headers: Vec<String>,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout_secs: 30,
            skip_headers: SKIP_HEADERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl LiveConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ArchiveConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> SdkResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| SdkError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), sources = config.index.sources.len(), "loaded config");
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SdkResult<()> {
        if self.index.sources.iter().any(|s| s.trim().is_empty()) {
            return Err(SdkError::Config("index.sources contains an empty entry".into()));
        }
        if self.index.remote_filtering {
            match self.index.sources.as_slice() {
                [only] if is_remote(only) => {}
                _ => {
                    return Err(SdkError::Config(
                        "index.remote_filtering needs exactly one http(s) source".into(),
                    ))
                }
            }
        }
        if self.index.timeout_secs == 0 {
            return Err(SdkError::Config("index.timeout_secs must be positive".into()));
        }
        if self.live.timeout_secs == 0 {
            return Err(SdkError::Config("live.timeout_secs must be positive".into()));
        }
        Ok(())
    }
}

/// Whether an index source names an HTTP endpoint rather than a local path.
pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}
