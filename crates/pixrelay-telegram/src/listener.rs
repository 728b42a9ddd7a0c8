// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long polling: feeds translated updates into a channel and watches for
//! a second instance polling the same bot token.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use pixrelay_core::types::InboundEvent;
use teloxide::dispatching::ShutdownToken;
use teloxide::error_handlers::ErrorHandler;
use teloxide::prelude::*;
use teloxide::update_listeners;
use teloxide::{ApiError, RequestError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::handler;

/// Capacity of the inbound event channel.
const EVENT_BUFFER: usize = 256;

/// True when Telegram reports that another process is polling this bot.
pub fn is_conflict(error: &RequestError) -> bool {
    matches!(error, RequestError::Api(ApiError::TerminatedByOtherGetUpdates))
}

/// Update-listener error handler that trips a token on conflict.
struct ConflictWatch {
    conflict: CancellationToken,
}

impl ErrorHandler<RequestError> for ConflictWatch {
    fn handle_error(self: Arc<Self>, error: RequestError) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            if is_conflict(&error) {
                if !self.conflict.is_cancelled() {
                    error!(error = %error, "another instance is polling this bot");
                }
                self.conflict.cancel();
            } else {
                warn!(error = %error, "update listener error");
            }
        })
    }
}

/// A running long-polling dispatcher.
pub struct Polling {
    task: JoinHandle<()>,
    shutdown: ShutdownToken,
    conflict: CancellationToken,
}

impl Polling {
    /// Cancelled once Telegram reports a duplicate poller.
    pub fn conflict_token(&self) -> CancellationToken {
        self.conflict.clone()
    }

    /// Stop accepting updates and wait up to `timeout` for the dispatcher to exit.
    pub async fn stop(self, timeout: Duration) {
        match self.shutdown.shutdown() {
            Ok(done) => {
                if tokio::time::timeout(timeout, done).await.is_err() {
                    warn!("dispatcher did not stop in time");
                }
            }
            Err(_) => debug!("dispatcher was idle at shutdown"),
        }

        let mut task = self.task;
        if tokio::time::timeout(timeout, &mut task).await.is_err() {
            warn!("aborting polling task");
            task.abort();
        }
        info!("telegram polling stopped");
    }
}

/// Start long polling. Translated events arrive on the returned receiver.
pub fn start_polling(bot: Bot, group_chat_id: i64) -> (Polling, mpsc::Receiver<InboundEvent>) {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let message_tx = tx.clone();
    let callback_tx = tx;

    let schema = dptree::entry()
        .branch(Update::filter_message().endpoint(move |msg: Message| {
            let tx = message_tx.clone();
            async move {
                match handler::message_to_event(&msg, group_chat_id) {
                    Some(event) => {
                        if tx.send(event).await.is_err() {
                            warn!("inbound channel closed, dropping message");
                        }
                    }
                    None => debug!(chat_id = msg.chat.id.0, "ignoring message"),
                }
                respond(())
            }
        }))
        .branch(
            Update::filter_callback_query().endpoint(move |query: CallbackQuery| {
                let tx = callback_tx.clone();
                async move {
                    let Some(event) = handler::callback_to_event(&query) else {
                        return respond(());
                    };
                    if tx.send(event).await.is_err() {
                        warn!("inbound channel closed, dropping callback");
                    }
                    respond(())
                }
            }),
        );

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema)
        .default_handler(|_| async {})
        .build();
    let shutdown = dispatcher.shutdown_token();
    let conflict = CancellationToken::new();
    let watch = Arc::new(ConflictWatch {
        conflict: conflict.clone(),
    });

    info!("starting Telegram long polling");
    let task = tokio::spawn(async move {
        let listener = update_listeners::polling_default(bot).await;
        dispatcher.dispatch_with_listener(listener, watch).await;
    });

    (
        Polling {
            task,
            shutdown,
            conflict,
        },
        rx,
    )
}
