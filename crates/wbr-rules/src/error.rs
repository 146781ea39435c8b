//! Error types for the rules crate.

/// Errors that can occur while loading a rule file.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// The rule file could not be read.
    #[error("failed to read rule file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The rule file is not valid TOML or has the wrong shape.
    #[error("failed to parse rules: {0}")]
    Parse(#[from] toml::de::Error),

    /// A rule's `match` pattern is not a valid regex.
    #[error("rule '{rule}' has an invalid match pattern: {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    /// A rule's filter template does not produce a valid filter.
    #[error("rule '{rule}' has an invalid filter template '{template}'")]
    InvalidFilter { rule: String, template: String },
}

/// Convenience alias for rule results.
pub type RuleResult<T> = Result<T, RuleError>;
