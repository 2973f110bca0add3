//! SVI command-line entry point.
//!
//! Parses arguments, installs logging and signal handling, and maps the run
//! outcome to the process exit status.

use anyhow::Result;
use clap::Parser;
use svi_cli::cli::Cli;
use svi_cli::core::{exit_code_for, user_friendly_error};
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.init_logging();

    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    match cli.execute(cancel).await {
        Ok(()) => Ok(()),
        Err(e) => {
            let code = exit_code_for(&e);
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            std::process::exit(code);
        }
    }
}

/// Cancel the run on Ctrl-C, and on SIGTERM or SIGQUIT where available.
async fn cancel_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (Ok(mut term), Ok(mut quit)) =
            (signal(SignalKind::terminate()), signal(SignalKind::quit()))
        else {
            warn!("Could not install signal handlers; only Ctrl-C will cancel the run");
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
            return;
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
            _ = quit.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        if tokio::signal::ctrl_c().await.is_err() {
            warn!("Could not listen for Ctrl-C");
            return;
        }
    }

    warn!("Cancellation requested, stopping");
    cancel.cancel();
}
