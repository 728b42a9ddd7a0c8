// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation logic and event loop for pixrelay.
//!
//! The [`BotLoop`] is the central coordinator that:
//! - Receives inbound events from the transport listener
//! - Runs each event in its own handler task on a [`JoinSet`]
//! - Drives the per-user generation conversation ([`session`])
//! - Mirrors traffic into per-user staff threads ([`relay`])
//! - Runs the two-phase operator broadcast ([`broadcast`])
//! - Drains in-flight handlers on shutdown ([`shutdown`])

pub mod bot;
pub mod broadcast;
pub mod guard;
pub mod relay;
pub mod session;
pub mod shutdown;
pub mod texts;

use std::sync::Arc;
use std::time::Duration;

use pixrelay_core::types::InboundEvent;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub use bot::{BotSettings, PixBot};
pub use guard::InstanceGuard;
pub use session::{SessionState, SessionStore};

/// Pulls events off the listener channel and runs each in its own task.
///
/// A failing or panicking handler only affects its own event.
pub struct BotLoop {
    bot: Arc<PixBot>,
    handlers: JoinSet<()>,
}

impl BotLoop {
    pub fn new(bot: Arc<PixBot>) -> Self {
        Self {
            bot,
            handlers: JoinSet::new(),
        }
    }

    /// Number of handler tasks not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.handlers.len()
    }

    /// Runs until `cancel` fires or the event channel closes.
    ///
    /// Handlers still running on return are left to [`BotLoop::drain`].
    pub async fn run(&mut self, mut events: mpsc::Receiver<InboundEvent>, cancel: CancellationToken) {
        info!("bot loop running");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("shutdown signal received, stopping bot loop");
                    break;
                }
                Some(result) = self.handlers.join_next(), if !self.handlers.is_empty() => {
                    shutdown::log_handler_exit(result);
                }
                event = events.recv() => match event {
                    Some(event) => self.dispatch(event),
                    None => {
                        info!("event stream closed, stopping bot loop");
                        break;
                    }
                },
            }
        }
    }

    fn dispatch(&mut self, event: InboundEvent) {
        let bot = self.bot.clone();
        let user_id = event.sender().id.0;
        debug!(user_id, "dispatching event");
        self.handlers.spawn(async move {
            if let Err(e) = bot.handle(event).await {
                error!(user_id, error = %e, "failed to handle event");
            }
        });
    }

    /// Waits up to `timeout` for in-flight handlers. Returns how many were
    /// abandoned.
    pub async fn drain(&mut self, timeout: Duration) -> usize {
        shutdown::drain_handlers(&mut self.handlers, timeout).await
    }
}
