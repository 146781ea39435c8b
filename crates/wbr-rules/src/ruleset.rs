use std::path::Path;

use serde::Deserialize;
use wbr_types::CdxQuery;

use crate::error::{RuleError, RuleResult};
use crate::rule::{FuzzyRule, RuleSpec};

const DEFAULT_RULES: &str = include_str!("default_rules.toml");

#[derive(Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<RuleSpec>,
}

/// An ordered, immutable collection of fuzzy lookup rules.
///
/// Loaded once and shared (typically behind an `Arc`); lookups never
/// mutate, so concurrent readers need no locking.
#[derive(Clone, Debug, Default)]
pub struct FuzzyRuleSet {
    rules: Vec<FuzzyRule>,
}

impl FuzzyRuleSet {
    /// Build from already-parsed rule tables, preserving their order.
    pub fn from_specs(specs: Vec<RuleSpec>) -> RuleResult<Self> {
        let rules = specs
            .into_iter()
            .map(FuzzyRule::compile)
            .collect::<RuleResult<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Parse a TOML rule document.
    pub fn from_toml_str(content: &str) -> RuleResult<Self> {
        let file: RuleFile = toml::from_str(content)?;
        Self::from_specs(file.rules)
    }

    /// Load a TOML rule file from disk.
    pub fn load(path: &Path) -> RuleResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let set = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), rules = set.len(), "loaded fuzzy rules");
        Ok(set)
    }

    /// The rules bundled with the crate.
    pub fn default_rules() -> RuleResult<Self> {
        Self::from_toml_str(DEFAULT_RULES)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rules(&self) -> &[FuzzyRule] {
        &self.rules
    }

    /// Propose a broader query for one that found nothing.
    ///
    /// Only the first rule whose prefix covers the canonical key is
    /// consulted. `None` when no rule applies, when that rule's pattern
    /// does not match, or when the derived query would be no broader than
    /// the original.
    pub fn match_query(&self, query: &CdxQuery) -> Option<CdxQuery> {
        let original = query.url_key().ok()?;
        let rule = self.rules.iter().find(|r| r.applies_to(&original.key))?;

        let Some(derived) = rule.derive(query, &original.key) else {
            tracing::debug!(rule = rule.name(), key = %original.key, "fuzzy rule pattern did not match");
            return None;
        };

        match derived.url_key() {
            Ok(key) if key != original => {
                tracing::debug!(
                    rule = rule.name(),
                    from = %original.key,
                    to = %key.key,
                    match_type = %key.match_type,
                    "derived fuzzy query"
                );
                Some(derived)
            }
            _ => None,
        }
    }
}
