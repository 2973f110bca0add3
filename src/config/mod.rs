//! Run configuration
//!
//! [`RunConfig`] is the plain description of one injection run that the
//! library consumes. The CLI assembles it from arguments and environment
//! variables; tests build it directly.
//!
//! # Token Syntax
//!
//! A reference is written `<opening><key><closing>`, `#{key}` by default.
//! [`TokenPair`] owns the two delimiters and derives every token-based
//! pattern from them, escaping the delimiters so that any literal string can
//! serve as a token.
//!
//! ```rust
//! use svi_cli::config::TokenPair;
//!
//! let tokens = TokenPair::new("${{", "}}").unwrap();
//! assert_eq!(tokens.wrap("db.host"), "${{db.host}}");
//!
//! let refs = tokens.reference_pattern().unwrap();
//! let found: Vec<_> = refs
//!     .captures_iter("${{a}}-${{b.c}}")
//!     .filter_map(|c| c.name("ref").map(|m| m.as_str()))
//!     .collect();
//! assert_eq!(found, ["a", "b.c"]);
//! ```

use anyhow::{Context, Result};
use regex::Regex;
use std::path::PathBuf;

use crate::constants::{DEFAULT_CLOSING_TOKEN, DEFAULT_OPENING_TOKEN, default_parallelism};
use crate::core::SviError;

/// Opening and closing delimiters of a reference token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    opening: String,
    closing: String,
}

impl TokenPair {
    /// Validate and build a token pair; both delimiters must be non-empty.
    pub fn new(opening: impl Into<String>, closing: impl Into<String>) -> Result<Self, SviError> {
        let opening = opening.into();
        let closing = closing.into();

        if opening.is_empty() || closing.is_empty() {
            return Err(SviError::ConfigError {
                message: "opening and closing tokens must not be empty".to_string(),
            });
        }

        Ok(Self {
            opening,
            closing,
        })
    }

    pub fn opening(&self) -> &str {
        &self.opening
    }

    pub fn closing(&self) -> &str {
        &self.closing
    }

    /// The literal token referencing `key`.
    pub fn wrap(&self, key: &str) -> String {
        format!("{}{}{}", self.opening, key, self.closing)
    }

    /// Pattern matching every reference, capturing the key as `ref`.
    ///
    /// A reference spans from the opening token to the first character that
    /// belongs to the closing token.
    pub fn reference_pattern(&self) -> Result<Regex> {
        let not_close: String =
            self.closing.chars().map(|c| regex::escape(&c.to_string())).collect();
        Regex::new(&format!(
            "{}(?P<ref>[^{}]+){}",
            regex::escape(&self.opening),
            not_close,
            regex::escape(&self.closing)
        ))
        .context("Failed to build reference pattern")
    }
}

impl Default for TokenPair {
    fn default() -> Self {
        Self {
            opening: DEFAULT_OPENING_TOKEN.to_string(),
            closing: DEFAULT_CLOSING_TOKEN.to_string(),
        }
    }
}

/// Everything one run needs to know.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Output files or `dir/pattern` globs to rewrite in place
    pub outputs: Vec<String>,
    /// Variable sources in override order (files, globs or URLs)
    pub variable_sources: Vec<String>,
    /// Secret sources in override order (files, globs or URLs)
    pub secret_sources: Vec<String>,
    /// Descend into subdirectories when expanding globs
    pub recurse_subdirectories: bool,
    /// Match glob patterns case-insensitively
    pub ignore_case: bool,
    pub tokens: TokenPair,
    /// JSON document backing the bundled file secret store
    pub secret_store: Option<PathBuf>,
    /// Upper bound on concurrently processed output files
    pub max_parallel: usize,
}

impl RunConfig {
    /// Check cross-field constraints the type system cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.outputs.is_empty() {
            return Err(SviError::ConfigError {
                message: "at least one output file is required".to_string(),
            }
            .into());
        }
        if self.max_parallel == 0 {
            return Err(SviError::ConfigError {
                message: "max parallel must be at least 1".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            outputs: Vec::new(),
            variable_sources: Vec::new(),
            secret_sources: Vec::new(),
            recurse_subdirectories: true,
            ignore_case: true,
            tokens: TokenPair::default(),
            secret_store: None,
            max_parallel: default_parallelism(),
        }
    }
}
