//! Data source discovery.
//!
//! Walks a directory tree and returns every file whose name matches a
//! caller-supplied regular expression. Results are sorted by path so repeated
//! runs see the same listing, but that order is lexical: "Jan16" sorts after
//! "Dec16". Chronological presentation is the caller's job, via an explicit
//! batch configuration.

use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::source::DataSource;
use crate::error::{Result, WavebookError};

/// Discover data files under `root` whose file name matches `pattern`.
///
/// An empty result is not an error here; callers that need at least one
/// source should use [`require_sources`].
pub fn discover(root: impl AsRef<Path>, pattern: &str) -> Result<Vec<DataSource>> {
    let root = root.as_ref();
    let regex = Regex::new(pattern)?;

    if !root.is_dir() {
        return Err(WavebookError::Io {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| WavebookError::Io {
            path: e.path().unwrap_or(root).to_path_buf(),
            source: e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed")),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if regex.is_match(&name) {
            debug!(path = %entry.path().display(), "matched data source");
            paths.push(entry.into_path());
        }
    }

    paths.sort();

    let sources: Vec<DataSource> = paths
        .into_iter()
        .enumerate()
        .map(|(i, path)| DataSource::new(i + 1, path))
        .collect();

    if sources.is_empty() {
        warn!(root = %root.display(), pattern, "no data sources matched");
    }

    Ok(sources)
}

/// Turn an empty discovery result into a configuration error.
pub fn require_sources(
    sources: Vec<DataSource>,
    root: impl AsRef<Path>,
    pattern: &str,
) -> Result<Vec<DataSource>> {
    if sources.is_empty() {
        return Err(WavebookError::EmptyDiscovery {
            root: root.as_ref().to_path_buf(),
            pattern: pattern.to_string(),
        });
    }
    Ok(sources)
}
