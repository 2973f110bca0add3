//! Classification of path arguments.
//!
//! Every source or output argument is one of:
//!
//! - a URL (`http://` or `https://`), fetched remotely
//! - a directory plus file-name glob, recognized by a `*` anywhere in the
//!   argument and split at the last path separator (`config/*.json`)
//! - a literal file path
//!
//! Literal files and glob directories are validated to exist up front, so a
//! typo fails the run before anything is read or rewritten.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::SviError;

/// One classified path argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourcePath {
    File(PathBuf),
    Pattern {
        directory: PathBuf,
        pattern: String,
    },
    Url(String),
}

/// Path arguments grouped by kind, each group in argument order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitPaths {
    pub files: Vec<PathBuf>,
    pub patterns: Vec<(PathBuf, String)>,
    pub urls: Vec<String>,
}

/// Classifies and validates path arguments.
pub struct PathResolver;

impl PathResolver {
    /// Classify and validate a single argument.
    pub fn classify(argument: &str) -> Result<SourcePath> {
        if is_url(argument) {
            return Ok(SourcePath::Url(argument.to_string()));
        }

        if argument.contains('*') {
            let (directory, pattern) = split_pattern(argument);
            debug!("Validating that directory {} exists", directory.display());
            if !directory.is_dir() {
                return Err(SviError::InvalidPath {
                    path: argument.to_string(),
                    reason: format!("directory {} does not exist", directory.display()),
                }
                .into());
            }
            return Ok(SourcePath::Pattern {
                directory,
                pattern,
            });
        }

        let path = PathBuf::from(argument);
        debug!("Validating that file {} exists", path.display());
        if !path.is_file() {
            return Err(SviError::InvalidPath {
                path: argument.to_string(),
                reason: "file does not exist".to_string(),
            }
            .into());
        }
        Ok(SourcePath::File(path))
    }

    /// Split arguments into literal files, directory globs and URLs.
    pub fn split(arguments: &[String]) -> Result<SplitPaths> {
        let mut split = SplitPaths::default();
        for argument in arguments {
            match Self::classify(argument)? {
                SourcePath::File(path) => split.files.push(path),
                SourcePath::Pattern {
                    directory,
                    pattern,
                } => split.patterns.push((directory, pattern)),
                SourcePath::Url(url) => split.urls.push(url),
            }
        }
        Ok(split)
    }
}

fn is_url(argument: &str) -> bool {
    let lower = argument.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Split `dir/pattern` at the last separator; a bare pattern means the
/// current directory.
fn split_pattern(argument: &str) -> (PathBuf, String) {
    match argument.rfind(|c: char| c == '/' || std::path::is_separator(c)) {
        Some(0) => (PathBuf::from(&argument[..1]), argument[1..].to_string()),
        Some(index) => (PathBuf::from(&argument[..index]), argument[index + 1..].to_string()),
        None => (Path::new(".").to_path_buf(), argument.to_string()),
    }
}
