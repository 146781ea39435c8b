//! Field filters over index records.
//!
//! Syntax: `[!][=|~]field:value`
//!
//! - `=field:value`: field equals value
//! - `~field:value`: field contains value
//! - `field:regex`: regex search on the field
//! - a leading `!` inverts the result

use regex::Regex;

use crate::entry::CdxEntry;
use crate::error::{TypeError, TypeResult};

#[derive(Clone, Debug)]
enum Matcher {
    Exact(String),
    Contains(String),
    Pattern(Regex),
}

/// A parsed filter expression.
#[derive(Clone, Debug)]
pub struct CdxFilter {
    field: String,
    matcher: Matcher,
    invert: bool,
}

impl CdxFilter {
    pub fn parse(expr: &str) -> TypeResult<Self> {
        let (invert, rest) = match expr.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, expr),
        };

        let (field, value) = rest
            .split_once(':')
            .ok_or_else(|| TypeError::InvalidFilter(expr.to_string()))?;

        let (field, matcher) = if let Some(field) = field.strip_prefix('=') {
            (field, Matcher::Exact(value.to_string()))
        } else if let Some(field) = field.strip_prefix('~') {
            (field, Matcher::Contains(value.to_string()))
        } else {
            let regex = Regex::new(value)
                .map_err(|e| TypeError::InvalidFilter(format!("{expr}: {e}")))?;
            (field, Matcher::Pattern(regex))
        };

        if field.is_empty() {
            return Err(TypeError::InvalidFilter(expr.to_string()));
        }

        Ok(Self {
            field: field.to_string(),
            matcher,
            invert,
        })
    }

    /// Parse every expression, failing on the first invalid one.
    pub fn parse_all(exprs: &[String]) -> TypeResult<Vec<Self>> {
        exprs.iter().map(|e| Self::parse(e)).collect()
    }

    /// Whether `entry` passes this filter. Unknown fields never match.
    pub fn matches(&self, entry: &CdxEntry) -> bool {
        let hit = match entry.field(&self.field) {
            Some(value) => match &self.matcher {
                Matcher::Exact(expected) => value == expected,
                Matcher::Contains(needle) => value.contains(needle.as_str()),
                Matcher::Pattern(regex) => regex.is_match(value),
            },
            None => false,
        };
        hit != self.invert
    }
}
