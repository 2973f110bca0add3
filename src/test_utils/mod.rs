//! Test utilities for SVI
//!
//! Helpers shared by unit tests and the integration test suite (enable the
//! `test-utils` feature to use them outside this crate):
//!
//! - [`init_test_logging`] - once-guarded tracing setup writing to the test output
//! - [`capture_logs`] - records the log lines emitted by a closure
//! - [`CountingSecretStore`] - secret store double recording every fetch
//! - [`fixtures`] - sample source documents and file helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use svi_cli::injection::MemorySecretStore;
//! use svi_cli::test_utils::{CountingSecretStore, init_test_logging};
//!
//! init_test_logging(None);
//! let store = Arc::new(CountingSecretStore::new(
//!     MemorySecretStore::new().with_secret("prod/db", [("password", "hunter2")]),
//! ));
//! assert_eq!(store.calls(), 0);
//! ```

pub mod fixtures;
mod secret_store;

pub use secret_store::CountingSecretStore;

use std::io;
use std::sync::{Arc, Mutex, Once, PoisonError};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG` if set; without either, no
/// subscriber is installed. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=svi_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Run `f` under a thread-local subscriber and return its result together
/// with every log line at `level` or above, rendered without colors.
///
/// ```rust
/// use svi_cli::test_utils::capture_logs;
/// use tracing::Level;
///
/// let ((), logs) = capture_logs(Level::WARN, || tracing::warn!("disk almost full"));
/// assert!(logs.contains("WARN"));
/// assert!(logs.contains("disk almost full"));
/// ```
pub fn capture_logs<T>(level: Level, f: impl FnOnce() -> T) -> (T, String) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_target(false)
        .finish();

    let value = tracing::subscriber::with_default(subscriber, f);
    (value, buffer.contents())
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
