//! One injection run, from path arguments to rewritten output files.
//!
//! The run is strictly phased. Every source is loaded and the whole catalog is
//! built before the first output file is opened, so a broken source or a key
//! collision never leaves a half-injected tree behind. Output files are then
//! processed concurrently, bounded by [`RunConfig::max_parallel`], all sharing
//! one catalog and one [`ResolvedValueCache`].

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::ResolvedValueCache;
use crate::config::RunConfig;
use crate::core::{SviError, is_cancellation};
use crate::functions::{FunctionProcessor, FunctionRegistry};
use crate::injection::{FileSecretStore, SecretClient};
use crate::resolver::HierarchicalResolver;
use crate::source::{DirectoryWalker, RemoteFetcher, SourceLoader};
use crate::substitution::{CachedCatalogSupplier, SubstitutionEngine};

/// What a successful run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Keys in the resolved catalog
    pub keys: usize,
    /// Output files rewritten
    pub files: usize,
    /// Distinct secret documents fetched from the store
    pub secrets_fetched: usize,
}

/// Run with the secret store named by `config.secret_store`, if any.
pub async fn run(config: &RunConfig, cancel: CancellationToken) -> Result<RunSummary> {
    let secrets = match &config.secret_store {
        Some(path) => {
            let store = FileSecretStore::load(path).await?;
            SecretClient::new(Arc::new(store), cancel.clone())
        }
        None => SecretClient::disabled(cancel.clone()),
    };
    run_with_secrets(config, Arc::new(secrets), cancel).await
}

/// Run against an explicit secret client.
///
/// The client is scoped to this run: it caches every secret document it
/// fetches and must not be reused across runs.
pub async fn run_with_secrets(
    config: &RunConfig,
    secrets: Arc<SecretClient>,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    config.validate()?;

    let registry = Arc::new(FunctionRegistry::with_builtins());
    let processor = Arc::new(FunctionProcessor::new(
        registry,
        config.tokens.opening(),
        config.tokens.closing(),
    )?);

    let loader = SourceLoader::new(
        DirectoryWalker::new(config.recurse_subdirectories, config.ignore_case),
        RemoteFetcher::new(),
        cancel.clone(),
    );
    let secret_documents =
        loader.load(&config.secret_sources).await.context("Failed to load secret sources")?;
    let variable_documents =
        loader.load(&config.variable_sources).await.context("Failed to load variable sources")?;

    let resolver = HierarchicalResolver::new(
        processor.clone(),
        secrets.clone(),
        config.tokens.clone(),
        cancel.clone(),
    );
    let catalog = Arc::new(resolver.build_catalog(&variable_documents, &secret_documents).await?);
    catalog.log_entries();

    let outputs = loader.resolve_outputs(&config.outputs).await?;

    let cache = Arc::new(ResolvedValueCache::new(secrets.clone()));
    let supplier = Arc::new(CachedCatalogSupplier::new(catalog.clone(), cache.clone()));
    let engine = SubstitutionEngine::new(
        catalog.keys(),
        &config.tokens,
        supplier,
        processor,
        cancel.clone(),
    );

    let engine = &engine;
    let results: Vec<(PathBuf, Result<()>)> = stream::iter(outputs)
        .map(|path| async move {
            let result = engine.inject(&path).await;
            (path, result)
        })
        .buffer_unordered(config.max_parallel)
        .collect()
        .await;

    let total = collect_outcomes(results)?;

    info!(
        "Injected {} files using {} keys ({} cached values)",
        total,
        catalog.len(),
        cache.len()
    );

    Ok(RunSummary {
        keys: catalog.len(),
        files: total,
        secrets_fetched: secrets.fetched_count(),
    })
}

/// Fold per-file outcomes into the run result.
///
/// Files that finished are never reported as cancelled: the run is cancelled
/// only when some file was actually interrupted. Other failures are reported
/// together, one line per file.
fn collect_outcomes(results: Vec<(PathBuf, Result<()>)>) -> Result<usize> {
    let total = results.len();
    let failures: Vec<(PathBuf, anyhow::Error)> = results
        .into_iter()
        .filter_map(|(path, result)| result.err().map(|error| (path, error)))
        .collect();

    if failures.iter().any(|(_, e)| is_cancellation(e)) {
        debug!("Run cancelled with {} of {} files unfinished", failures.len(), total);
        return Err(SviError::Cancelled.into());
    }

    if !failures.is_empty() {
        let messages: Vec<String> = failures
            .iter()
            .map(|(path, error)| format!("  {}: {error:#}", path.display()))
            .collect();
        return Err(anyhow::anyhow!(
            "Failed to inject {} files:\n{}",
            messages.len(),
            messages.join("\n")
        ));
    }

    Ok(total)
}
