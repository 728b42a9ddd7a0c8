// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passive liveness responder for hosting platforms.
//!
//! Runs on a dedicated OS thread with its own single-threaded runtime, so a
//! stalled or crashed responder never touches the bot's scheduler. The only
//! link back is the [`CancellationToken`] used to stop it.

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use axum::{Router, routing::get};
use pixrelay_config::model::HealthConfig;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const BODY: &str = "Hello World!";

/// Routes answered by the responder.
pub fn router() -> Router {
    Router::new()
        .route("/", get(hello))
        .route("/health", get(hello))
}

async fn hello() -> &'static str {
    BODY
}

/// Serve [`router`] on `listener` until `cancel` fires.
pub async fn serve(listener: TcpListener, cancel: CancellationToken) -> std::io::Result<()> {
    axum::serve(listener, router())
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
}

/// Handle to the responder thread.
pub struct HealthResponder {
    thread: JoinHandle<()>,
    cancel: CancellationToken,
}

impl HealthResponder {
    /// Cancel the responder and wait up to `timeout` for its thread to end.
    pub async fn stop(self, timeout: Duration) {
        self.cancel.cancel();
        let deadline = Instant::now() + timeout;
        while !self.thread.is_finished() {
            if Instant::now() >= deadline {
                warn!("health responder did not stop in time, leaving it behind");
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        if self.thread.join().is_err() {
            error!("health responder thread panicked");
        }
        info!("health responder stopped");
    }
}

/// Start the responder if enabled. Failures are logged and never fatal.
pub fn spawn(config: &HealthConfig) -> Option<HealthResponder> {
    if !config.enabled {
        info!("health responder disabled");
        return None;
    }

    let addr = format!("{}:{}", config.host, config.port);
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let spawned = std::thread::Builder::new()
        .name("health".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!(error = %e, "failed to build health responder runtime");
                    return;
                }
            };

            runtime.block_on(async move {
                let listener = match TcpListener::bind(&addr).await {
                    Ok(listener) => listener,
                    Err(e) => {
                        error!(addr = %addr, error = %e, "health responder failed to bind");
                        return;
                    }
                };
                info!(addr = %addr, "health responder listening");
                if let Err(e) = serve(listener, token).await {
                    error!(error = %e, "health responder failed");
                }
                debug!("health responder exited");
            });
        });

    match spawned {
        Ok(thread) => Some(HealthResponder { thread, cancel }),
        Err(e) => {
            error!(error = %e, "failed to spawn health responder thread");
            None
        }
    }
}
