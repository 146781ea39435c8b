use thiserror::Error;

#[derive(Debug, Error)]
pub enum WarcError {
    #[error("cannot open WARC file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid WARC record at offset {offset}: {reason}")]
    InvalidRecord { offset: u64, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type WarcResult<T> = Result<T, WarcError>;
