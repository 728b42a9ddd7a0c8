// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that the event loop monitors. In-flight handlers
//! are drained before the process exits.

use std::time::Duration;

use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
/// The signal handler task runs in the background until the token is cancelled.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                        _ = token_clone.cancelled() => return,
                    }
                }
                Err(e) => {
                    warn!(error = %e, "SIGTERM handler unavailable, listening for Ctrl+C only");
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = token_clone.cancelled() => return,
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = ctrl_c => info!("received Ctrl+C, initiating shutdown"),
                _ = token_clone.cancelled() => return,
            }
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Logs how a handler task ended.
pub fn log_handler_exit(result: Result<(), JoinError>) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_panic() => error!(error = %e, "event handler panicked"),
        Err(e) => debug!(error = %e, "event handler cancelled"),
    }
}

/// Waits up to `timeout` for in-flight handlers, then aborts the rest.
///
/// Returns the number of handlers that were abandoned.
pub async fn drain_handlers(handlers: &mut JoinSet<()>, timeout: Duration) -> usize {
    if handlers.is_empty() {
        info!("no in-flight handlers to drain");
        return 0;
    }

    info!(count = handlers.len(), "waiting for in-flight handlers to complete");

    let drained = tokio::time::timeout(timeout, async {
        while let Some(result) = handlers.join_next().await {
            log_handler_exit(result);
        }
    })
    .await;

    match drained {
        Ok(()) => {
            info!("all handlers drained successfully");
            0
        }
        Err(_) => {
            let remaining = handlers.len();
            warn!(remaining, "timeout reached, abandoning handlers");
            handlers.abort_all();
            remaining
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_signal_handler_returns_token() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
    }

    #[tokio::test]
    async fn drain_empty_set() {
        let mut handlers = JoinSet::new();
        assert_eq!(drain_handlers(&mut handlers, Duration::from_millis(10)).await, 0);
    }

    #[tokio::test]
    async fn drain_waits_for_quick_handlers() {
        let mut handlers = JoinSet::new();
        for _ in 0..3 {
            handlers.spawn(async {
                tokio::time::sleep(Duration::from_millis(5)).await;
            });
        }
        assert_eq!(drain_handlers(&mut handlers, Duration::from_secs(5)).await, 0);
        assert!(handlers.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn drain_abandons_stuck_handlers() {
        let mut handlers = JoinSet::new();
        handlers.spawn(async {});
        handlers.spawn(std::future::pending::<()>());
        assert_eq!(drain_handlers(&mut handlers, Duration::from_secs(1)).await, 1);
    }

    #[tokio::test]
    async fn panicking_handler_is_contained() {
        let mut handlers: JoinSet<()> = JoinSet::new();
        handlers.spawn(async {
            panic!("handler bug");
        });
        assert_eq!(drain_handlers(&mut handlers, Duration::from_secs(1)).await, 0);
    }
}
