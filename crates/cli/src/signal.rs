//! Interrupt handling.

use std::future::Future;

use tracing::{info, warn};

use crate::cancel::Cancellation;

/// Trip `cancel` on SIGINT or SIGTERM; exit with status 1 on the next one.
///
/// In-flight requests are not aborted by the first interrupt and have no
/// timeout, so a second interrupt is the way out of a stalled request.
pub async fn trip_on_interrupt(cancel: Cancellation) {
    watch_interrupts(cancel, shutdown_signal).await;
    warn!("Exiting without waiting for in-flight requests");
    std::process::exit(1);
}

/// Trip `cancel` on the first `signal` and resolve on the one after it.
///
/// A self-cancelled run skips straight to waiting for a single signal.
async fn watch_interrupts<F, Fut>(cancel: Cancellation, mut signal: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    tokio::select! {
        biased;
        _ = cancel.tripped() => {}
        _ = signal() => {
            cancel.trip("interrupted");
            info!("Waiting for in-flight requests, interrupt again to exit now");
        }
    }

    signal().await;
}

/// Resolves on the first SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(error = %error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
            return;
        }
        info!("Received SIGINT (Ctrl+C)");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received SIGTERM");
            }
            Err(error) => {
                warn!(error = %error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
