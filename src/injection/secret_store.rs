//! Secret store seam and the run-scoped secret client.
//!
//! [`SecretStore`] is the only interface to external secret material: given a
//! secret id (or ARN) it returns the secret's key/value dictionary, or `None`
//! when no such secret exists. Transport, authentication and vendor protocols
//! live behind implementations of this trait.
//!
//! [`SecretClient`] wraps one store for the duration of a run. It is an
//! explicit instance handed to the resolver and the value cache, never a
//! process-wide static, and it fetches each secret document at most once.

use anyhow::{Context, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::SviError;
use crate::flatten::{relax, scalar_to_string};
use crate::utils::cancellable;

/// Key/value dictionary stored under one secret id.
pub type SecretDocument = HashMap<String, String>;

/// Access to an external secret store.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the dictionary stored under `secret_id`.
    ///
    /// Returns `Ok(None)` when the store has no such secret; transport or
    /// permission failures are errors.
    async fn get_secret(&self, secret_id: &str) -> Result<Option<SecretDocument>>;
}

/// In-process secret store backed by a map.
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    secrets: HashMap<String, SecretDocument>,
}

impl MemorySecretStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a secret built from `pairs`.
    #[must_use]
    pub fn with_secret<I, K, V>(mut self, secret_id: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let document = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self.secrets.insert(secret_id.into(), document);
        self
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get_secret(&self, secret_id: &str) -> Result<Option<SecretDocument>> {
        Ok(self.secrets.get(secret_id).cloned())
    }
}

/// Secret store loaded from a JSON file shaped `{ "<secretId>": { "<key>": "<value>" } }`.
///
/// Non-string scalar values are stringified with the same rules as variable
/// sources.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    inner: MemorySecretStore,
}

impl FileSecretStore {
    /// Load and validate the store file.
    pub async fn load(path: &Path) -> Result<Self> {
        let bytes = crate::utils::read_source(path).await?;
        let source_name = path.display().to_string();

        let raw: HashMap<String, serde_json::Map<String, serde_json::Value>> =
            serde_json::from_slice(&relax(&bytes)).map_err(|e| SviError::JsonParse {
                source_name: source_name.clone(),
                reason: e.to_string(),
            })?;

        let mut secrets = HashMap::with_capacity(raw.len());
        for (secret_id, entries) in raw {
            let mut document = SecretDocument::with_capacity(entries.len());
            for (key, value) in entries {
                let rendered = scalar_to_string(&value).ok_or_else(|| SviError::UnsupportedLeaf {
                    source_name: source_name.clone(),
                    key: format!("{secret_id}.{key}"),
                    kind: "non-scalar".to_string(),
                })?;
                document.insert(key, rendered);
            }
            secrets.insert(secret_id, document);
        }

        info!("Loaded {} secrets from {}", secrets.len(), source_name);
        Ok(Self {
            inner: MemorySecretStore {
                secrets,
            },
        })
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get_secret(&self, secret_id: &str) -> Result<Option<SecretDocument>> {
        self.inner.get_secret(secret_id).await
    }
}

/// Run-scoped, caching front of a [`SecretStore`].
///
/// Concurrent requests for the same secret id share a single in-flight fetch;
/// the shard guard of the document map is released before any await.
pub struct SecretClient {
    store: Option<Arc<dyn SecretStore>>,
    documents: DashMap<String, Arc<OnceCell<Arc<SecretDocument>>>>,
    cancel: CancellationToken,
}

impl SecretClient {
    /// Client over `store`, interrupted by `cancel`.
    pub fn new(store: Arc<dyn SecretStore>, cancel: CancellationToken) -> Self {
        Self {
            store: Some(store),
            documents: DashMap::new(),
            cancel,
        }
    }

    /// Client without a store; any secret lookup fails with
    /// [`SviError::SecretStoreNotConfigured`].
    pub fn disabled(cancel: CancellationToken) -> Self {
        Self {
            store: None,
            documents: DashMap::new(),
            cancel,
        }
    }

    /// Resolve `key` inside the secret `secret_id`.
    pub async fn get_value(&self, secret_id: &str, key: &str) -> Result<String> {
        let document = self.get_document(secret_id).await?;
        document.get(key).cloned().ok_or_else(|| {
            SviError::SecretKeyNotFound {
                secret_id: secret_id.to_string(),
                key: key.to_string(),
            }
            .into()
        })
    }

    /// Number of secret documents fetched so far.
    pub fn fetched_count(&self) -> usize {
        self.documents.iter().filter(|entry| entry.value().initialized()).count()
    }

    async fn get_document(&self, secret_id: &str) -> Result<Arc<SecretDocument>> {
        let Some(store) = self.store.as_ref() else {
            return Err(SviError::SecretStoreNotConfigured {
                secret_id: secret_id.to_string(),
            }
            .into());
        };

        let cell = self.documents.entry(secret_id.to_string()).or_default().clone();

        let document = cell
            .get_or_try_init(|| async {
                debug!("Fetching secret {}", secret_id);
                let fetched = cancellable(&self.cancel, store.get_secret(secret_id))
                    .await
                    .map_err(|e| {
                        if crate::core::is_cancellation(&e) {
                            return e;
                        }
                        anyhow::Error::new(SviError::SecretFetch {
                            secret_id: secret_id.to_string(),
                            reason: format!("{e:#}"),
                        })
                    })?;

                let document = fetched.ok_or_else(|| SviError::SecretNotFound {
                    secret_id: secret_id.to_string(),
                })?;
                Ok::<_, anyhow::Error>(Arc::new(document))
            })
            .await
            .with_context(|| format!("Failed to provision secret '{secret_id}'"))?;

        Ok(Arc::clone(document))
    }
}
