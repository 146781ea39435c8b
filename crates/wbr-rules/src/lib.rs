//! Fuzzy lookup rules for the Wayback Resolver.
//!
//! When an exact capture lookup finds nothing, the query engine asks the
//! [`FuzzyRuleSet`] for a broader query: typically the same URL with its
//! query string cut off, matched as a prefix, and narrowed back down with
//! filters built from the parts of the URL that identify the resource.
//!
//! Rules are ordered. Only the first rule whose `url_prefix` covers the
//! canonical key is consulted; if its pattern does not match, there is no
//! fallback to later rules.

pub mod error;
pub mod rule;
pub mod ruleset;

pub use error::{RuleError, RuleResult};
pub use rule::{FuzzyRule, RuleSpec};
pub use ruleset::FuzzyRuleSet;
