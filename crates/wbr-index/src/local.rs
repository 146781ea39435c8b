use std::path::{Path, PathBuf};

use wbr_types::{CdxQuery, UrlKey};
use walkdir::WalkDir;

use crate::error::{IndexError, IndexResult};
use crate::source::{IndexSource, SourceReply};

const INDEX_EXTENSIONS: &[&str] = &["cdx", "cdxj"];

/// Sorted CDX / CDXJ files on local disk.
///
/// Each configured path is either an index file or a directory whose
/// `.cdx` / `.cdxj` files (non-recursive) are all searched. Files must be
/// sorted by line, as CDX files are; lookups binary-search to the first
/// candidate key and scan forward while keys can still match.
#[derive(Clone, Debug)]
pub struct LocalCdxSource {
    name: String,
    paths: Vec<PathBuf>,
}

impl LocalCdxSource {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            name: "local".to_string(),
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Expand configured paths into index files, in a stable order.
    fn index_files(&self) -> (Vec<PathBuf>, Vec<IndexError>) {
        let mut files = Vec::new();
        let mut errors = Vec::new();

        for path in &self.paths {
            if path.is_file() {
                files.push(path.clone());
                continue;
            }
            if !path.is_dir() {
                errors.push(io_error(path, std::io::ErrorKind::NotFound.into()));
                continue;
            }
            for entry in WalkDir::new(path).max_depth(1).sort_by_file_name() {
                match entry {
                    Ok(entry) if entry.file_type().is_file() && is_index_file(entry.path()) => {
                        files.push(entry.into_path());
                    }
                    Ok(_) => {}
                    Err(e) => errors.push(IndexError::Io {
                        path: path.display().to_string(),
                        source: e.into(),
                    }),
                }
            }
        }

        (files, errors)
    }
}

impl IndexSource for LocalCdxSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn query(&self, query: &CdxQuery) -> IndexResult<SourceReply> {
        let key = query.url_key()?;
        let (files, mut errors) = self.index_files();
        let mut lines = Vec::new();

        for file in &files {
            match std::fs::read_to_string(file) {
                Ok(content) => {
                    let before = lines.len();
                    scan_sorted(&content, &key, &mut lines);
                    tracing::trace!(file = %file.display(), hits = lines.len() - before, "scanned index file");
                }
                Err(e) => errors.push(io_error(file, e)),
            }
        }

        Ok(SourceReply { lines, errors })
    }
}

/// Collect lines of a sorted index whose key satisfies `key`.
fn scan_sorted(content: &str, key: &UrlKey, out: &mut Vec<String>) {
    let lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty() && !l.starts_with(' ') && !l.starts_with('!'))
        .collect();

    let start = key.start_key();
    let first = lines.partition_point(|line| line_key(line) < start);

    for line in &lines[first..] {
        let urlkey = line_key(line);
        if !urlkey.starts_with(start) {
            break;
        }
        if key.matches(urlkey) {
            out.push((*line).to_string());
        }
    }
}

fn line_key(line: &str) -> &str {
    line.split(' ').next().unwrap_or("")
}

fn is_index_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| INDEX_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn io_error(path: &Path, source: std::io::Error) -> IndexError {
    IndexError::Io {
        path: path.display().to_string(),
        source,
    }
}
