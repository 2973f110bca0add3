//! Cancellation helpers.
//!
//! One [`CancellationToken`] is created per run and threaded through every
//! suspension point (file reads and writes, network calls, secret fetches).
//! When it fires, the awaited operation is dropped and the caller receives
//! [`SviError::Cancelled`] instead of a generic failure.

use anyhow::Result;
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::core::SviError;

/// Await `future` unless `token` is cancelled first.
///
/// A token that is already cancelled wins even if the future would complete
/// immediately.
pub async fn cancellable<F, T>(token: &CancellationToken, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        () = token.cancelled() => Err(SviError::Cancelled.into()),
        result = future => result,
    }
}

/// Fail with [`SviError::Cancelled`] if the token has fired.
pub fn ensure_not_cancelled(token: &CancellationToken) -> Result<()> {
    if token.is_cancelled() {
        return Err(SviError::Cancelled.into());
    }
    Ok(())
}
