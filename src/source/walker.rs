//! Directory enumeration for `dir/pattern` arguments.

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};
use walkdir::WalkDir;

/// Finds files under a directory whose file name matches a glob.
///
/// Only the file name is matched, never the directory part. Results are in
/// deterministic, name-sorted traversal order; entries that cannot be read
/// are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryWalker {
    recursive: bool,
    ignore_case: bool,
}

impl DirectoryWalker {
    pub fn new(recursive: bool, ignore_case: bool) -> Self {
        Self {
            recursive,
            ignore_case,
        }
    }

    /// Files under `directory` whose name matches `pattern`.
    pub fn walk(&self, directory: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
        debug!(
            "Walking {} for '{}' (recurse: {}, ignore case: {})",
            directory.display(),
            pattern,
            self.recursive,
            self.ignore_case
        );

        let matcher =
            Pattern::new(pattern).with_context(|| format!("Invalid glob pattern: {pattern}"))?;
        let options = MatchOptions {
            case_sensitive: !self.ignore_case,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };

        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let mut matches = Vec::new();

        for entry in WalkDir::new(directory)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!("Skipping inaccessible entry: {}", e);
                    None
                }
            })
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            trace!("Checking file: {}", name);
            if matcher.matches_with(&name, options) {
                info!("Found file {}", path.display());
                matches.push(path.to_path_buf());
            }
        }

        debug!("Found {} matches for '{}' in {}", matches.len(), pattern, directory.display());
        Ok(matches)
    }
}
