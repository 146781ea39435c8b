use regex::Regex;
use serde::{Deserialize, Serialize};
use wbr_types::{CdxFilter, CdxQuery, MatchType};

use crate::error::{RuleError, RuleResult};

// ---------------------------------------------------------------------------
// Rule file shape
// ---------------------------------------------------------------------------

/// One `[[rules]]` table as written in a rule file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Human-readable rule name, used in logs.
    #[serde(default)]
    pub name: String,
    /// Canonical-key prefixes this rule applies to. `""` matches every key.
    pub url_prefix: Vec<String>,
    /// Regex searched in the canonical key; its capture groups feed `filters`.
    #[serde(rename = "match", default = "default_pattern")]
    pub pattern: String,
    /// Filter templates; `{N}` is replaced with capture group N.
    #[serde(default)]
    pub filters: Vec<String>,
    /// The requested URL is cut right after the first occurrence of this.
    #[serde(default = "default_replace")]
    pub replace: String,
}

fn default_pattern() -> String {
    "()".to_string()
}

fn default_replace() -> String {
    "?".to_string()
}

// ---------------------------------------------------------------------------
// Compiled rule
// ---------------------------------------------------------------------------

/// A compiled fuzzy lookup rule.
#[derive(Clone, Debug)]
pub struct FuzzyRule {
    name: String,
    url_prefix: Vec<String>,
    regex: Regex,
    filters: Vec<String>,
    replace: String,
}

impl FuzzyRule {
    /// Compile a rule, validating its pattern and filter templates.
    pub fn compile(spec: RuleSpec) -> RuleResult<Self> {
        let regex = Regex::new(&spec.pattern).map_err(|source| RuleError::InvalidPattern {
            rule: spec.name.clone(),
            source,
        })?;

        let probe: Vec<&str> = vec!["x"; regex.captures_len()];
        for template in &spec.filters {
            if CdxFilter::parse(&fill_template(template, &probe)).is_err() {
                return Err(RuleError::InvalidFilter {
                    rule: spec.name.clone(),
                    template: template.clone(),
                });
            }
        }

        Ok(Self {
            name: spec.name,
            url_prefix: spec.url_prefix,
            regex,
            filters: spec.filters,
            replace: spec.replace,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this rule's prefix condition covers `urlkey`.
    pub fn applies_to(&self, urlkey: &str) -> bool {
        self.url_prefix.iter().any(|p| urlkey.starts_with(p.as_str()))
    }

    /// Derive the broader query for `query`, whose canonical key is `urlkey`.
    ///
    /// Returns `None` when the rule's pattern does not match the key. The
    /// derived query is a prefix match on the URL cut after `replace`, with
    /// the rule's filters appended and fuzzy matching switched off.
    pub fn derive(&self, query: &CdxQuery, urlkey: &str) -> Option<CdxQuery> {
        let caps = self.regex.captures(urlkey)?;
        let groups: Vec<&str> = caps
            .iter()
            .skip(1)
            .map(|m| m.map(|m| m.as_str()).unwrap_or(""))
            .collect();

        let url = match query.url.find(self.replace.as_str()) {
            Some(idx) if !self.replace.is_empty() => &query.url[..idx + self.replace.len()],
            _ => query.url.as_str(),
        };

        let mut derived = query.clone();
        derived.url = url.to_string();
        derived.match_type = MatchType::Prefix;
        derived.allow_fuzzy = false;
        derived
            .filters
            .extend(self.filters.iter().map(|t| fill_template(t, &groups)));
        Some(derived)
    }
}

/// Substitute `{N}` placeholders with the matching group (empty if absent).
fn fill_template(template: &str, groups: &[&str]) -> String {
    let mut out = template.to_string();
    for (idx, group) in groups.iter().enumerate() {
        out = out.replace(&format!("{{{idx}}}"), group);
    }
    out
}
