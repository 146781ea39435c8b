use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("rule error: {0}")]
    Rules(#[from] wbr_rules::RuleError),

    #[error(transparent)]
    Index(#[from] wbr_index::IndexError),

    #[error(transparent)]
    Load(#[from] wbr_loader::LoadError),

    #[error(transparent)]
    Type(#[from] wbr_types::TypeError),

    #[error("entry for {0} has neither a stored location nor a live URL")]
    NotLoadable(String),
}

impl SdkError {
    /// Whether this is an index not-found, the one failure a live fallback
    /// may answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Index(e) if e.is_not_found())
    }
}

pub type SdkResult<T> = Result<T, SdkError>;
