use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::injection::SecretStore;
use crate::injection::secret_store::SecretDocument;

/// Secret store wrapper that counts fetches.
///
/// An optional delay widens the window in which concurrent callers could
/// race into a second fetch.
pub struct CountingSecretStore<S> {
    inner: S,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl<S: SecretStore> CountingSecretStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Sleep for `delay` before answering each fetch.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `get_secret` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: SecretStore> SecretStore for CountingSecretStore<S> {
    async fn get_secret(&self, secret_id: &str) -> Result<Option<SecretDocument>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.get_secret(secret_id).await
    }
}
