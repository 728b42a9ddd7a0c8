// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pixrelay serve` command implementation.
//!
//! Acquires the instance guard, opens SQLite storage, imports the user list,
//! connects the image API and Telegram, then runs the bot loop until a
//! signal or a polling conflict arrives. Shutdown runs the same bounded
//! sequence in both cases.

use std::sync::Arc;
use std::time::Duration;

use pixrelay_agent::{BotLoop, BotSettings, InstanceGuard, PixBot, shutdown};
use pixrelay_config::model::PixrelayConfig;
use pixrelay_core::{PluginAdapter, RelayError};
use pixrelay_imagegen::GenerationPipeline;
use pixrelay_storage::SqliteUserStore;
use pixrelay_telegram::{TelegramMessenger, start_polling};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::health;

/// Runs the bot until shutdown. Returns `RelayError::Conflict` when another
/// instance took over polling.
pub async fn run_serve(config: PixrelayConfig) -> Result<(), RelayError> {
    init_tracing(&config.bot.log_level);

    let mut guard = InstanceGuard::acquire(&config.daemon.lock_file)?;

    let store = Arc::new(SqliteUserStore::new(config.storage.clone()));
    store.initialize().await?;

    let users_file = config.storage.users_file_path();
    if let Err(e) = pixrelay_storage::import_users(store.as_ref(), &users_file).await {
        warn!(path = %users_file.display(), error = %e, "user import failed, continuing");
    }

    let generator = Arc::new(GenerationPipeline::new(&config.image_api)?);
    let messenger = Arc::new(TelegramMessenger::new(&config.telegram)?);
    if let Err(e) = messenger.health_check().await {
        warn!(error = %e, "telegram health check failed, starting anyway");
    }

    let bot = Arc::new(PixBot::new(
        messenger.clone(),
        store.clone(),
        generator,
        BotSettings::from_config(&config),
    ));
    let mut bot_loop = BotLoop::new(bot);

    let responder = health::spawn(&config.health);

    let (polling, events) = start_polling(messenger.bot().clone(), config.telegram.group_chat_id);
    let conflict = polling.conflict_token();
    let signal = shutdown::install_signal_handler();

    let stop = stop_on_either(&signal, &conflict);

    info!(
        group_chat_id = config.telegram.group_chat_id,
        admin_id = config.bot.admin_id,
        "pixrelay running"
    );
    bot_loop.run(events, stop.clone()).await;
    stop.cancel();

    let timeout = Duration::from_secs(config.daemon.shutdown_timeout_secs);
    polling.stop(timeout).await;

    let abandoned = bot_loop.drain(timeout).await;
    if abandoned > 0 {
        warn!(abandoned, "handlers abandoned at shutdown");
    }

    if let Some(responder) = responder {
        responder.stop(timeout).await;
    }

    guard.release();
    signal.cancel();

    if let Err(e) = store.shutdown().await {
        warn!(error = %e, "storage shutdown failed");
    }

    shutdown_result(&conflict)?;
    info!("pixrelay serve shutdown complete");
    Ok(())
}

/// A token cancelled as soon as either `signal` or `conflict` fires.
fn stop_on_either(signal: &CancellationToken, conflict: &CancellationToken) -> CancellationToken {
    let stop = CancellationToken::new();
    let trigger = stop.clone();
    let signal = signal.clone();
    let conflict = conflict.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = signal.cancelled() => {}
            _ = conflict.cancelled() => {}
        }
        trigger.cancel();
    });
    stop
}

/// Exit status of a finished serve run: a polling conflict is an error.
fn shutdown_result(conflict: &CancellationToken) -> Result<(), RelayError> {
    if conflict.is_cancelled() {
        return Err(RelayError::Conflict(
            "another instance is polling this bot token".to_string(),
        ));
    }
    Ok(())
}

/// Initialize the tracing subscriber with the configured log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pixrelay={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fires(token: &CancellationToken) -> bool {
        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .is_ok()
    }

    #[tokio::test]
    async fn conflict_stops_the_bot_and_fails_the_run() {
        let signal = CancellationToken::new();
        let conflict = CancellationToken::new();
        let stop = stop_on_either(&signal, &conflict);
        assert!(!stop.is_cancelled());

        conflict.cancel();
        assert!(fires(&stop).await, "stop token never fired on conflict");
        assert!(!signal.is_cancelled());

        let err = shutdown_result(&conflict).unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn signal_stops_the_bot_cleanly() {
        let signal = CancellationToken::new();
        let conflict = CancellationToken::new();
        let stop = stop_on_either(&signal, &conflict);

        signal.cancel();
        assert!(fires(&stop).await, "stop token never fired on signal");
        assert!(shutdown_result(&conflict).is_ok());
    }
}
