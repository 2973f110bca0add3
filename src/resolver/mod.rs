//! Hierarchical resolution of sources into the run catalog.
//!
//! The resolver turns the ordered variable and secret sources of a run into
//! one immutable [`Catalog`]:
//!
//! 1. **Merge** each category's flattened sources in the order given. A key
//!    defined by several sources takes the value of the last one, and every
//!    override is logged as a warning.
//! 2. **Reject collisions**: a key defined both as a variable and as a
//!    secret aborts the build with [`SviError::KeyCollision`].
//! 3. **Materialize** every expansion-capable entry (secrets first, then
//!    variables). Secret values are fetched through the run's
//!    [`SecretClient`], so a failing store aborts the build. The raw value is
//!    passed through the whole-value function grammar.
//! 4. **Evaluate** the reference graph (see [`graph`]) and rebind each entry
//!    to its fully resolved plain-text value. Values that secret material
//!    flowed into are rebound as redacted injections, so logging the catalog
//!    never prints a secret.
//!
//! No partial catalog is ever returned: any fatal error aborts the whole
//! build before an output file is touched.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use svi_cli::config::TokenPair;
//! use svi_cli::functions::{FunctionProcessor, FunctionRegistry};
//! use svi_cli::injection::SecretClient;
//! use svi_cli::resolver::HierarchicalResolver;
//! use svi_cli::source::SourceDocument;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let cancel = CancellationToken::new();
//! let tokens = TokenPair::default();
//! let processor = Arc::new(FunctionProcessor::new(
//!     Arc::new(FunctionRegistry::with_builtins()),
//!     tokens.opening(),
//!     tokens.closing(),
//! )?);
//! let secrets = Arc::new(SecretClient::disabled(cancel.clone()));
//! let resolver = HierarchicalResolver::new(processor, secrets, tokens, cancel);
//!
//! let base = SourceDocument::new("base.json", br##"{"env": "dev", "url": "#{env}.example.com"}"##.to_vec());
//! let prod = SourceDocument::new("prod.json", br#"{"env": "prod"}"#.to_vec());
//!
//! let catalog = resolver.build_catalog(&[base, prod], &[]).await?;
//! assert_eq!(catalog.get("url").unwrap().provision_log_value(), "prod.example.com");
//! # Ok(())
//! # }
//! ```

mod catalog;
pub mod graph;

pub use catalog::Catalog;
pub use graph::recursion_sentinel;

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::TokenPair;
use crate::core::SviError;
use crate::flatten::{flatten_secrets, flatten_variables};
use crate::functions::FunctionProcessor;
use crate::injection::{Injection, PlainTextInjection, SecretClient};
use crate::source::SourceDocument;
use crate::utils::ensure_not_cancelled;
use graph::ReferenceGraph;

/// Builds the run catalog from variable and secret sources.
pub struct HierarchicalResolver {
    processor: Arc<FunctionProcessor>,
    secrets: Arc<SecretClient>,
    tokens: TokenPair,
    cancel: CancellationToken,
}

impl HierarchicalResolver {
    pub fn new(
        processor: Arc<FunctionProcessor>,
        secrets: Arc<SecretClient>,
        tokens: TokenPair,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            processor,
            secrets,
            tokens,
            cancel,
        }
    }

    /// Merge, materialize and resolve the sources into a [`Catalog`].
    ///
    /// Both slices are in override order: later documents win.
    pub async fn build_catalog(
        &self,
        variables: &[SourceDocument],
        secrets: &[SourceDocument],
    ) -> Result<Catalog> {
        let secret_entries = merge_sources("secret", secrets, flatten_secrets)?;
        let variable_entries: BTreeMap<String, Injection> =
            merge_sources("variable", variables, |name, content| {
                Ok(flatten_variables(name, content)?
                    .into_iter()
                    .map(|(key, value)| (key, Injection::plain(value)))
                    .collect())
            })?;

        if let Some(key) = variable_entries.keys().find(|key| secret_entries.contains_key(*key)) {
            return Err(SviError::KeyCollision {
                key: key.clone(),
            }
            .into());
        }

        let mut graph = ReferenceGraph::new(self.tokens.clone())?;
        let mut passthrough = BTreeMap::new();

        for (key, injection) in secret_entries.into_iter().chain(variable_entries) {
            ensure_not_cancelled(&self.cancel)?;

            if !injection.supports_expression_expansion() {
                passthrough.insert(key, injection);
                continue;
            }

            let raw = injection
                .provision_value(&self.secrets)
                .await
                .with_context(|| format!("Failed to materialize value of key '{key}'"))?;
            let text = self.processor.apply_whole_value(&key, &raw)?.into_owned();

            let log_template = if injection.is_sensitive() {
                injection.provision_log_value().to_string()
            } else {
                text.clone()
            };
            graph.insert(key, text, injection.is_sensitive(), log_template);
        }

        debug!("Evaluating {} expandable keys", graph.len());
        let mut entries = passthrough;
        for (key, resolved) in graph.resolve_all() {
            let injection = if resolved.sensitive {
                Injection::PlainText(PlainTextInjection::redacted(
                    resolved.value,
                    resolved.log_template,
                ))
            } else {
                Injection::plain(resolved.value)
            };
            entries.insert(key, injection);
        }

        info!("Catalog contains {} keys", entries.len());
        Ok(Catalog::from_entries(entries))
    }
}

/// Flatten `sources` in order and merge them, later sources overriding.
pub fn merge_sources<T, F>(
    category: &str,
    sources: &[SourceDocument],
    flatten: F,
) -> Result<BTreeMap<String, T>>
where
    F: Fn(&str, &[u8]) -> Result<BTreeMap<String, T>>,
{
    let mut merged = BTreeMap::new();

    for source in sources {
        info!("Reading {} source {}", category, source.name());
        let flattened = flatten(source.name(), source.content())
            .with_context(|| format!("Failed to read {category} source '{}'", source.name()))?;

        for (key, value) in flattened {
            if merged.insert(key.clone(), value).is_some() {
                warn!("Key {} already exists, overwriting with value from {}", key, source.name());
            }
        }
    }

    Ok(merged)
}
