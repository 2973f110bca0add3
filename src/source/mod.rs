//! Source discovery and loading.
//!
//! Source arguments (variables and secrets) and output arguments share one
//! syntax, see [`PathResolver`]. Loading keeps the order of the arguments:
//! a glob expands in place to its sorted matches, and remote documents are
//! fetched concurrently and then slotted back into their argument position.
//! Override semantics depend on that order, so it is never reshuffled.
//!
//! # Modules
//!
//! - `path` - argument classification and validation
//! - `walker` - directory enumeration for globs
//! - `remote` - HTTP(S) fetching with fragment headers

mod path;
mod remote;
mod walker;

pub use path::{PathResolver, SourcePath, SplitPaths};
pub use remote::{RemoteFetcher, RemoteRequest};
pub use walker::DirectoryWalker;

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::SviError;
use crate::utils::{bytes_to_string, cancellable, read_source};

/// One loaded source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    name: String,
    content: Vec<u8>,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    /// Path or URL the document was loaded from.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

/// Expands path arguments into documents and output files.
#[derive(Debug, Clone)]
pub struct SourceLoader {
    walker: DirectoryWalker,
    fetcher: RemoteFetcher,
    cancel: CancellationToken,
}

impl SourceLoader {
    pub fn new(walker: DirectoryWalker, fetcher: RemoteFetcher, cancel: CancellationToken) -> Self {
        Self {
            walker,
            fetcher,
            cancel,
        }
    }

    /// Load every source argument, preserving argument order.
    pub async fn load(&self, arguments: &[String]) -> Result<Vec<SourceDocument>> {
        let classified =
            arguments.iter().map(|a| PathResolver::classify(a)).collect::<Result<Vec<_>>>()?;

        let urls: Vec<String> = classified
            .iter()
            .filter_map(|path| match path {
                SourcePath::Url(url) => Some(url.clone()),
                _ => None,
            })
            .collect();
        let mut remote = cancellable(&self.cancel, self.fetcher.fetch_all(&urls))
            .await?
            .into_iter();

        let mut documents = Vec::new();
        for path in classified {
            match path {
                SourcePath::File(file) => documents.push(self.read(file).await?),
                SourcePath::Pattern {
                    directory,
                    pattern,
                } => {
                    for file in self.expand(directory, pattern).await? {
                        documents.push(self.read(file).await?);
                    }
                }
                SourcePath::Url(url) => {
                    let content = remote.next().ok_or_else(|| SviError::RemoteFetch {
                        url: url.clone(),
                        reason: "no response received".to_string(),
                    })?;
                    debug!("Fetched {} ({})", url, bytes_to_string(content.len() as u64));
                    documents.push(SourceDocument::new(redact_fragment(&url), content));
                }
            }
        }

        info!("Input files count: {}", documents.len());
        Ok(documents)
    }

    /// Expand output arguments into distinct local files.
    ///
    /// Every argument is validated before any directory is walked. Literal
    /// files come first, then glob matches; the order carries no meaning
    /// since outputs are rewritten concurrently.
    pub async fn resolve_outputs(&self, arguments: &[String]) -> Result<Vec<PathBuf>> {
        let SplitPaths {
            files,
            patterns,
            urls,
        } = PathResolver::split(arguments)?;

        if let Some(url) = urls.into_iter().next() {
            return Err(SviError::InvalidPath {
                path: url,
                reason: "output files must be local".to_string(),
            }
            .into());
        }

        let mut outputs = Vec::new();
        let mut seen = HashSet::new();
        let mut push = |file: PathBuf| {
            if seen.insert(file.clone()) {
                outputs.push(file);
            } else {
                debug!("Skipping duplicate output {}", file.display());
            }
        };

        for file in files {
            push(file);
        }
        for (directory, pattern) in patterns {
            for file in self.expand(directory, pattern).await? {
                push(file);
            }
        }

        info!("Output files count: {}", outputs.len());
        Ok(outputs)
    }

    async fn read(&self, file: PathBuf) -> Result<SourceDocument> {
        let content = cancellable(&self.cancel, read_source(&file)).await?;
        Ok(SourceDocument::new(file.display().to_string(), content))
    }

    async fn expand(&self, directory: PathBuf, pattern: String) -> Result<Vec<PathBuf>> {
        let walker = self.walker;
        let walk = tokio::task::spawn_blocking(move || walker.walk(&directory, &pattern));
        cancellable(&self.cancel, async move {
            walk.await.context("Directory walk task failed")?
        })
        .await
    }
}

/// Drop the fragment so header values never reach the logs.
fn redact_fragment(link: &str) -> String {
    link.split_once('#').map_or(link, |(url, _)| url).to_string()
}
