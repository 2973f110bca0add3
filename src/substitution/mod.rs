//! Token substitution into output files.
//!
//! The [`SubstitutionEngine`] rewrites one output file at a time. It streams
//! the file line by line and, for every catalog key whose token occurs in the
//! line, asks its [`ValueSupplier`] for the value once and replaces every
//! occurrence on that line. The deprecated inline function grammar is applied
//! afterwards. Line terminators are carried over unchanged.
//!
//! # Atomicity
//!
//! Output goes to the sibling `<file>.injected`, which replaces the original
//! only after the whole file was processed. On failure the error is logged at
//! `error` level and returned; the original stays untouched and the temporary
//! file is removed. A cancelled run may leave the temporary file behind; the
//! next run overwrites it.
//!
//! # Concurrency
//!
//! One engine is shared by all output-file tasks of a run. It holds nothing
//! mutable itself; the only shared mutable state is the value cache behind
//! the supplier.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::cache::ResolvedValueCache;
use crate::config::TokenPair;
use crate::core::{SviError, is_cancellation};
use crate::functions::FunctionProcessor;
use crate::resolver::Catalog;
use crate::utils::{cancellable, injected_sibling, replace_file};

/// Asynchronous source of key values during substitution.
#[async_trait]
pub trait ValueSupplier: Send + Sync {
    async fn value(&self, key: &str) -> Result<String>;
}

/// Supplies catalog values through the run-scoped cache.
pub struct CachedCatalogSupplier {
    catalog: Arc<Catalog>,
    cache: Arc<ResolvedValueCache>,
}

impl CachedCatalogSupplier {
    pub fn new(catalog: Arc<Catalog>, cache: Arc<ResolvedValueCache>) -> Self {
        Self {
            catalog,
            cache,
        }
    }
}

#[async_trait]
impl ValueSupplier for CachedCatalogSupplier {
    async fn value(&self, key: &str) -> Result<String> {
        let injection = self.catalog.get(key).ok_or_else(|| SviError::Other {
            message: format!("Key '{key}' is not part of the catalog"),
        })?;
        self.cache.get_or_resolve(key, injection).await
    }
}

/// Rewrites output files in place.
pub struct SubstitutionEngine {
    opening: String,
    /// `(key, token)` pairs in catalog order
    tokens: Vec<(String, String)>,
    supplier: Arc<dyn ValueSupplier>,
    processor: Arc<FunctionProcessor>,
    cancel: CancellationToken,
}

impl SubstitutionEngine {
    /// Engine substituting every key of `keys`.
    pub fn new<'k>(
        keys: impl IntoIterator<Item = &'k str>,
        token_pair: &TokenPair,
        supplier: Arc<dyn ValueSupplier>,
        processor: Arc<FunctionProcessor>,
        cancel: CancellationToken,
    ) -> Self {
        let tokens = keys.into_iter().map(|key| (key.to_string(), token_pair.wrap(key))).collect();
        Self {
            opening: token_pair.opening().to_string(),
            tokens,
            supplier,
            processor,
            cancel,
        }
    }

    /// Substitute all tokens in `path`, replacing the file on success.
    pub async fn inject(&self, path: &Path) -> Result<()> {
        info!("Injecting values into file {}", path.display());
        let temp = injected_sibling(path);

        match self.rewrite(path, &temp).await {
            Ok(lines) => {
                debug!("Rewrote {} lines of {}", lines, path.display());
                Ok(())
            }
            Err(e) if is_cancellation(&e) => {
                debug!("Injection into {} cancelled", path.display());
                Err(e)
            }
            Err(e) => {
                error!("Failed to inject values into file {}: {:#}", path.display(), e);
                if let Err(cleanup) = tokio::fs::remove_file(&temp).await {
                    debug!("Could not remove {}: {}", temp.display(), cleanup);
                }
                Err(e.context(format!("Failed to inject values into file {}", path.display())))
            }
        }
    }

    async fn rewrite(&self, path: &Path, temp: &Path) -> Result<usize> {
        let source = File::open(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let target = File::create(temp)
            .await
            .with_context(|| format!("Failed to create {}", temp.display()))?;

        let mut reader = BufReader::new(source);
        let mut writer = BufWriter::new(target);
        let mut buffer = String::new();
        let mut line_number = 0;

        loop {
            buffer.clear();
            let read = cancellable(&self.cancel, async {
                reader.read_line(&mut buffer).await.with_context(|| {
                    format!("Failed to read line {} of {}", line_number + 1, path.display())
                })
            })
            .await?;
            if read == 0 {
                break;
            }
            line_number += 1;

            let (content, terminator) = split_terminator(&buffer);
            let substituted = self.substitute_line(content).await?;
            let transformed = self.processor.apply_inline(&substituted, path, line_number)?;

            write_line(&mut writer, &transformed, terminator, temp).await?;
        }

        writer.flush().await.with_context(|| format!("Failed to write {}", temp.display()))?;
        drop(writer);

        cancellable(&self.cancel, replace_file(temp, path)).await?;
        Ok(line_number)
    }

    async fn substitute_line(&self, content: &str) -> Result<String> {
        let mut line = content.to_string();
        if !line.contains(&self.opening) {
            return Ok(line);
        }

        for (key, token) in &self.tokens {
            if line.contains(token.as_str()) {
                let value = cancellable(&self.cancel, self.supplier.value(key)).await?;
                line = line.replace(token.as_str(), &value);
            }
        }
        Ok(line)
    }
}

async fn write_line<W>(writer: &mut W, content: &str, terminator: &str, temp: &Path) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(content.as_bytes())
        .await
        .with_context(|| format!("Failed to write {}", temp.display()))?;
    writer
        .write_all(terminator.as_bytes())
        .await
        .with_context(|| format!("Failed to write {}", temp.display()))
}

/// Split a line read with its terminator into content and terminator.
fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::FunctionRegistry;
    use crate::injection::{Injection, SecretClient};
    use crate::test_utils::init_test_logging;
    use std::collections::BTreeMap;
    use std::io;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::{Context as TaskContext, Poll};
    use tempfile::TempDir;

    struct MapSupplier {
        values: BTreeMap<String, String>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ValueSupplier for MapSupplier {
        async fn value(&self, key: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.values.get(key).cloned().ok_or_else(|| anyhow::anyhow!("no value for {key}"))
        }
    }

    fn processor() -> Arc<FunctionProcessor> {
        let registry = Arc::new(FunctionRegistry::with_builtins());
        Arc::new(FunctionProcessor::new(registry, "#{", "}").unwrap())
    }

    fn engine_for(values: &[(&str, &str)]) -> (SubstitutionEngine, Arc<MapSupplier>) {
        let supplier = Arc::new(MapSupplier {
            values: values.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect(),
            calls: AtomicUsize::new(0),
        });
        let engine = SubstitutionEngine::new(
            values.iter().map(|(k, _)| *k),
            &TokenPair::default(),
            supplier.clone(),
            processor(),
            CancellationToken::new(),
        );
        (engine, supplier)
    }

    #[tokio::test]
    async fn test_tokens_replaced_and_terminators_kept() {
        init_test_logging(None);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.yml");
        let original = "host: #{db.host}\r\nurl: #{db.host}:#{db.port}/#{db.host}\nlast";
        tokio::fs::write(&path, original).await.unwrap();

        let (engine, supplier) = engine_for(&[("db.host", "localhost"), ("db.port", "5432")]);
        engine.inject(&path).await.unwrap();

        assert_eq!(
            tokio::fs::read_to_string(&path).await.unwrap(),
            "host: localhost\r\nurl: localhost:5432/localhost\nlast"
        );
        // one call per key per line
        assert_eq!(supplier.calls.load(Ordering::SeqCst), 3);
        assert!(!injected_sibling(&path).exists());
    }

    #[tokio::test]
    async fn test_unknown_tokens_and_inline_functions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        tokio::fs::write(&path, "#{missing} #{abc | base64}\n").await.unwrap();

        let (engine, _) = engine_for(&[("a", "1")]);
        engine.inject(&path).await.unwrap();

        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "#{missing} YWJj\n");
    }

    #[tokio::test]
    async fn test_injection_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let original = "a=#{a}\nb=#{b}\n";
        let (engine, _) = engine_for(&[("a", "1"), ("b", "two")]);

        let mut outputs = Vec::new();
        for _ in 0..2 {
            let path = dir.path().join("out.ini");
            tokio::fs::write(&path, original).await.unwrap();
            engine.inject(&path).await.unwrap();
            outputs.push(tokio::fs::read_to_string(&path).await.unwrap());
            assert!(!injected_sibling(&path).exists());
        }

        assert_eq!(outputs[0], "a=1\nb=two\n");
        assert_eq!(outputs[0], outputs[1]);
    }

    #[tokio::test]
    async fn test_failure_leaves_original_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        let original = "ok #{a}\nbroken #{x | rot13}\n";
        tokio::fs::write(&path, original).await.unwrap();

        let (engine, _) = engine_for(&[("a", "1")]);
        let err = engine.inject(&path).await.unwrap_err();

        assert!(matches!(
            crate::core::find_svi_error(&err),
            Some(SviError::FunctionNotFound { .. })
        ));
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), original);
        assert!(!injected_sibling(&path).exists());
    }

    #[tokio::test]
    async fn test_cached_catalog_supplier() {
        let catalog: Catalog = [("k".to_string(), Injection::plain("v"))].into_iter().collect();
        let cache = Arc::new(ResolvedValueCache::new(Arc::new(SecretClient::disabled(
            CancellationToken::new(),
        ))));
        let supplier = CachedCatalogSupplier::new(Arc::new(catalog), cache.clone());

        assert_eq!(supplier.value("k").await.unwrap(), "v");
        assert!(supplier.value("other").await.is_err());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_injection_keeps_original() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        tokio::fs::write(&path, "#{a}\n").await.unwrap();

        let supplier = Arc::new(MapSupplier {
            values: BTreeMap::from([("a".to_string(), "1".to_string())]),
            calls: AtomicUsize::new(0),
        });
        let cancel = CancellationToken::new();
        let engine = SubstitutionEngine::new(
            ["a"],
            &TokenPair::default(),
            supplier,
            processor(),
            cancel.clone(),
        );
        cancel.cancel();

        let err = engine.inject(&path).await.unwrap_err();
        assert!(is_cancellation(&err));
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "#{a}\n");
    }

    struct FullDisk;

    impl AsyncWrite for FullDisk {
        fn poll_write(
            self: Pin<&mut Self>,
            _: &mut TaskContext<'_>,
            _: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::other("no space left on device")))
        }

        fn poll_flush(self: Pin<&mut Self>, _: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _: &mut TaskContext<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_write_failure_names_temporary_file() {
        let temp = Path::new("deploy/out.yml.injected");
        let err = write_line(&mut FullDisk, "a: 1", "\n", temp).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to write deploy/out.yml.injected");
        assert!(format!("{err:#}").contains("no space left on device"));
    }
}
