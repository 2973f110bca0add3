//! Run-scoped cache of provisioned values.
//!
//! Every output-file task asks the [`ResolvedValueCache`] for the values of
//! the keys it finds. The first request for a key provisions the value from
//! its [`Injection`]; every later request, concurrent or not, receives the
//! stored result. A secret referenced by a thousand output files is therefore
//! fetched once per run.
//!
//! # Concurrency
//!
//! The map holds one `tokio::sync::OnceCell` per key. The shard guard is only
//! held while the cell is looked up or inserted and is dropped before any
//! await; provisioning then runs inside the cell, so concurrent callers for
//! the same key wait on the single in-flight provisioning instead of racing.
//! Failed provisioning leaves the cell empty and the next caller retries.

use anyhow::{Context, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::injection::{Injection, SecretClient};

/// Concurrent, write-once-per-key value cache for one run.
pub struct ResolvedValueCache {
    values: DashMap<String, Arc<OnceCell<String>>>,
    secrets: Arc<SecretClient>,
}

impl ResolvedValueCache {
    /// Empty cache provisioning secrets through `secrets`.
    pub fn new(secrets: Arc<SecretClient>) -> Self {
        Self {
            values: DashMap::new(),
            secrets,
        }
    }

    /// Cached value of `key`, provisioning it from `injection` on first use.
    pub async fn get_or_resolve(&self, key: &str, injection: &Injection) -> Result<String> {
        let cell = self.values.entry(key.to_string()).or_default().clone();

        let value = cell
            .get_or_try_init(|| async {
                debug!("Provisioning value of {} ({})", key, injection.provision_log_value());
                injection.provision_value(&self.secrets).await
            })
            .await
            .with_context(|| format!("Failed to provision value of key '{key}'"))?;

        Ok(value.clone())
    }

    /// Number of keys with a stored value.
    pub fn len(&self) -> usize {
        self.values.iter().filter(|entry| entry.value().initialized()).count()
    }

    /// Whether no value has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
