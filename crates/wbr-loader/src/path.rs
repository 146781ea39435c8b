use std::path::PathBuf;

use wbr_types::CdxEntry;

/// Maps a storage file identifier to candidate locations, tried in order.
pub trait PathResolver: Send + Sync {
    fn candidates(&self, filename: &str, entry: &CdxEntry) -> Vec<PathBuf>;
}

impl<F> PathResolver for F
where
    F: Fn(&str, &CdxEntry) -> Vec<PathBuf> + Send + Sync,
{
    fn candidates(&self, filename: &str, entry: &CdxEntry) -> Vec<PathBuf> {
        self(filename, entry)
    }
}

/// Joins the filename onto each configured prefix.
///
/// A prefix may contain `{source}`, replaced by the entry's source tag;
/// such a prefix is skipped for entries without one. Prefixes are joined
/// as strings, so a directory prefix needs its trailing separator.
#[derive(Clone, Debug, Default)]
pub struct PrefixPathResolver {
    prefixes: Vec<String>,
}

impl PrefixPathResolver {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

impl PathResolver for PrefixPathResolver {
    fn candidates(&self, filename: &str, entry: &CdxEntry) -> Vec<PathBuf> {
        self.prefixes
            .iter()
            .filter_map(|prefix| {
                let prefix = if prefix.contains("{source}") {
                    prefix.replace("{source}", entry.source.as_deref()?)
                } else {
                    prefix.clone()
                };
                Some(PathBuf::from(prefix + filename))
            })
            .collect()
    }
}
