// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Event router tying sessions, relay, broadcasts and generation together.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pixrelay_config::PixrelayConfig;
use pixrelay_core::types::{
    Button, ChatTarget, Command, Dimension, Document, GenerationOutcome, InboundEvent, Keyboard,
    PhotoSource, Reply, UserProfile,
};
use pixrelay_core::{ImageGenerator, Messenger, MessageRef, RelayError, TopicId, UserId, UserStore};
use tracing::{debug, error, info, warn};

use crate::broadcast::{self, BroadcastDesk};
use crate::relay::TopicRelay;
use crate::session::{PromptOutcome, SessionStore};
use crate::texts;

/// Runtime settings of the bot, extracted from the configuration.
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub admin_id: UserId,
    pub group_chat_id: i64,
    pub support_url: String,
    pub users_file: PathBuf,
    pub image_api_url: String,
    pub verify_image_url: bool,
    pub session_ttl_secs: u64,
    pub notify_stale_topics: bool,
    pub send_delay: Duration,
}

impl BotSettings {
    pub fn from_config(config: &PixrelayConfig) -> Self {
        Self {
            admin_id: UserId(config.bot.admin_id),
            group_chat_id: config.telegram.group_chat_id,
            support_url: config.bot.support_url.clone(),
            users_file: config.storage.users_file_path(),
            image_api_url: config.image_api.base_url.clone(),
            verify_image_url: config.image_api.verify_image_url,
            session_ttl_secs: config.bot.session_ttl_secs,
            notify_stale_topics: config.telegram.notify_stale_topics,
            send_delay: Duration::from_millis(config.broadcast.send_delay_ms),
        }
    }
}

/// Handles one [`InboundEvent`] at a time; shared across handler tasks.
pub struct PixBot {
    messenger: Arc<dyn Messenger>,
    store: Arc<dyn UserStore>,
    generator: Arc<dyn ImageGenerator>,
    sessions: SessionStore,
    relay: TopicRelay,
    broadcasts: BroadcastDesk,
    settings: BotSettings,
    started_at: DateTime<Utc>,
}

impl PixBot {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        store: Arc<dyn UserStore>,
        generator: Arc<dyn ImageGenerator>,
        settings: BotSettings,
    ) -> Self {
        let relay = TopicRelay::new(
            messenger.clone(),
            store.clone(),
            settings.group_chat_id,
            settings.admin_id,
            settings.notify_stale_topics,
        );
        let broadcasts = BroadcastDesk::new(messenger.clone(), store.clone(), settings.send_delay);
        Self {
            messenger,
            store,
            generator,
            sessions: SessionStore::with_ttl_secs(settings.session_ttl_secs),
            relay,
            broadcasts,
            settings,
            started_at: Utc::now(),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn relay(&self) -> &TopicRelay {
        &self.relay
    }

    pub fn broadcasts(&self) -> &BroadcastDesk {
        &self.broadcasts
    }

    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    fn is_admin(&self, user: UserId) -> bool {
        user == self.settings.admin_id
    }

    /// Routes one event. Errors are those of the primary reply; relay
    /// failures never surface here.
    pub async fn handle(&self, event: InboundEvent) -> Result<(), RelayError> {
        match event {
            InboundEvent::Command {
                from,
                message,
                command,
                args,
            } => self.on_command(&from, message, command, &args).await,
            InboundEvent::PrivateText {
                from,
                message,
                text,
            } => self.on_text(&from, message, &text).await,
            InboundEvent::PrivateOther { from, message } => {
                self.relay.relay_inbound(&from, message).await;
                Ok(())
            }
            InboundEvent::Callback {
                from,
                callback_id,
                message,
                data,
            } => self.on_callback(&from, &callback_id, message, &data).await,
            InboundEvent::TopicReply { from, topic, text } => {
                if self.is_admin(from.id) {
                    self.relay.relay_admin_reply(topic, &text).await;
                } else {
                    debug!(user_id = from.id.0, topic_id = topic.0, "ignoring non-operator topic post");
                }
                Ok(())
            }
        }
    }

    /// Sends `reply` to the user and mirrors it into their thread.
    async fn reply(
        &self,
        user: UserId,
        topic: Option<TopicId>,
        reply: Reply,
    ) -> Result<MessageRef, RelayError> {
        let sent = self
            .messenger
            .send(reply.clone().to(ChatTarget::user(user)))
            .await?;
        self.relay.relay_outbound(topic, &reply).await;
        Ok(sent)
    }

    async fn on_command(
        &self,
        from: &UserProfile,
        message: MessageRef,
        command: Command,
        args: &str,
    ) -> Result<(), RelayError> {
        info!(user_id = from.id.0, command = %command, "command received");
        let topic = self.relay.relay_inbound(from, message).await;

        if command.is_admin_only() && !self.is_admin(from.id) {
            self.reply(from.id, topic, Reply::text(texts::ADMIN_ONLY)).await?;
            return Ok(());
        }

        match command {
            Command::Start => self.start(from, topic).await,
            Command::Gen => {
                self.sessions.begin(from.id);
                self.reply(from.id, topic, Reply::text(texts::PROMPT)).await?;
                Ok(())
            }
            Command::Users => self.send_user_list(from.id, topic).await,
            Command::Broadcast => self.compose_broadcast(from.id, topic, args).await,
            Command::Debug => {
                let summary = self.debug_summary().await;
                self.reply(from.id, topic, Reply::text(summary)).await?;
                Ok(())
            }
        }
    }

    async fn start(&self, from: &UserProfile, topic: Option<TopicId>) -> Result<(), RelayError> {
        if topic.is_none() {
            let failure = Reply::text(texts::error(texts::START_FAILED));
            self.reply(from.id, None, failure).await?;
            return Ok(());
        }
        let support = Button::url(texts::SUPPORT, broadcast::normalize_link(&self.settings.support_url));
        let welcome = Reply::text(texts::WELCOME).with_keyboard(Keyboard::single(support));
        self.reply(from.id, topic, welcome).await?;
        Ok(())
    }

    async fn send_user_list(&self, admin: UserId, topic: Option<TopicId>) -> Result<(), RelayError> {
        let path = &self.settings.users_file;
        let sent = async {
            let count = pixrelay_storage::export_users(&*self.store, path).await?;
            let bytes = tokio::fs::read(path).await.map_err(|e| RelayError::Storage {
                source: Box::new(e),
            })?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "users.txt".to_string());
            let document = Document {
                file_name,
                bytes,
                caption: Some(texts::user_count(count)),
            };
            self.messenger.send_document(admin.0, document).await
        };
        if let Err(e) = sent.await {
            error!(error = %e, "failed to send user list");
            self.reply(admin, topic, Reply::text(texts::error(texts::USERS_FAILED)))
                .await?;
        }
        Ok(())
    }

    async fn compose_broadcast(
        &self,
        admin: UserId,
        topic: Option<TopicId>,
        args: &str,
    ) -> Result<(), RelayError> {
        match self.broadcasts.compose(admin, args).await {
            Ok(_) => Ok(()),
            Err(RelayError::Validation(reason)) => {
                debug!(reason = %reason, "rejected broadcast syntax");
                self.reply(admin, topic, Reply::text(texts::BROADCAST_USAGE)).await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn debug_summary(&self) -> String {
        let users = match self.store.list_all().await {
            Ok(users) => users.len().to_string(),
            Err(e) => {
                warn!(error = %e, "user count unavailable");
                "unavailable".to_string()
            }
        };
        let uptime = (Utc::now() - self.started_at).num_seconds().max(0);
        format!(
            "Debug info:\nUsers: {users}\nActive sessions: {}\nPending broadcasts: {}\n\
             Uptime: {}\nStarted: {}\nImage API: {}\nURL verification: {}",
            self.sessions.active(),
            self.broadcasts.pending(),
            format_uptime(uptime),
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.settings.image_api_url,
            if self.settings.verify_image_url { "on" } else { "off" },
        )
    }

    async fn on_text(
        &self,
        from: &UserProfile,
        message: MessageRef,
        text: &str,
    ) -> Result<(), RelayError> {
        let topic = self.relay.relay_inbound(from, message).await;
        match self.sessions.submit_prompt(from.id, text) {
            PromptOutcome::Accepted(prompt) => {
                debug!(user_id = from.id.0, prompt = %prompt, "prompt captured");
                let choices = Keyboard::column(
                    Dimension::ALL
                        .iter()
                        .map(|d| Button::callback(d.label(), format!("dim_{d}")))
                        .collect(),
                );
                let reply = Reply::text(texts::DIMENSION).with_keyboard(choices);
                self.reply(from.id, topic, reply).await?;
            }
            PromptOutcome::Blank => debug!(user_id = from.id.0, "blank prompt ignored"),
            PromptOutcome::Ignored => {}
        }
        Ok(())
    }

    async fn on_callback(
        &self,
        from: &UserProfile,
        callback_id: &str,
        message: Option<MessageRef>,
        data: &str,
    ) -> Result<(), RelayError> {
        if let Err(e) = self.messenger.answer_callback(callback_id).await {
            debug!(error = %e, "failed to answer callback");
        }

        if data.starts_with("broadcast_") {
            return self.on_broadcast_decision(from, data, message).await;
        }
        if let Some(choice) = data.strip_prefix("dim_") {
            let Ok(dimension) = choice.parse::<Dimension>() else {
                debug!(data, "unknown dimension");
                return Ok(());
            };
            return self.on_dimension(from, message, dimension).await;
        }
        if let Some(choice) = data.strip_prefix("imp_") {
            let improve = match choice {
                "true" => true,
                "false" => false,
                _ => {
                    debug!(data, "unknown improve choice");
                    return Ok(());
                }
            };
            return self.on_improve(from, message, improve).await;
        }
        debug!(data, "unhandled callback");
        Ok(())
    }

    async fn on_broadcast_decision(
        &self,
        from: &UserProfile,
        data: &str,
        message: Option<MessageRef>,
    ) -> Result<(), RelayError> {
        if !self.is_admin(from.id) {
            self.messenger
                .send(Reply::text(texts::ADMIN_ONLY).to(ChatTarget::user(from.id)))
                .await?;
            return Ok(());
        }
        let Some((decision, id)) = broadcast::parse_decision(data) else {
            debug!(data, "malformed broadcast decision");
            return Ok(());
        };
        self.broadcasts.decide(decision, id, message).await;
        Ok(())
    }

    /// Replaces the message the user pressed, or sends a new one.
    async fn show(
        &self,
        user: UserId,
        pressed: Option<MessageRef>,
        reply: Reply,
    ) -> Result<MessageRef, RelayError> {
        if let Some(message) = pressed {
            let text = reply.body().unwrap_or_default();
            match self.messenger.edit_text(message, text, reply.keyboard.clone()).await {
                Ok(()) => return Ok(message),
                Err(e) => debug!(error = %e, "edit failed, sending instead"),
            }
        }
        self.messenger.send(reply.to(ChatTarget::user(user))).await
    }

    async fn on_dimension(
        &self,
        from: &UserProfile,
        message: Option<MessageRef>,
        dimension: Dimension,
    ) -> Result<(), RelayError> {
        if !self.sessions.select_dimension(from.id, dimension) {
            debug!(user_id = from.id.0, "dimension outside of a session ignored");
            return Ok(());
        }
        let topic = self.relay.topic_for(from).await;
        self.relay
            .relay_outbound(topic, &Reply::text(texts::selected_dimension(&dimension.to_string())))
            .await;

        let choices = Keyboard::column(vec![
            Button::callback(texts::YES, "imp_true"),
            Button::callback(texts::NO, "imp_false"),
        ]);
        let reply = Reply::text(texts::IMPROVE).with_keyboard(choices);
        self.show(from.id, message, reply.clone()).await?;
        self.relay.relay_outbound(topic, &reply).await;
        Ok(())
    }

    async fn on_improve(
        &self,
        from: &UserProfile,
        message: Option<MessageRef>,
        improve: bool,
    ) -> Result<(), RelayError> {
        let Some(request) = self.sessions.select_improve(from.id, improve) else {
            debug!(user_id = from.id.0, "improve choice outside of a session ignored");
            return Ok(());
        };
        let topic = self.relay.topic_for(from).await;
        self.relay
            .relay_outbound(topic, &Reply::text(texts::selected_improve(improve)))
            .await;

        match self.store.increment_usage(from.id).await {
            Ok(count) => debug!(user_id = from.id.0, usage = count, "usage recorded"),
            Err(e) => warn!(user_id = from.id.0, error = %e, "failed to record usage"),
        }

        let processing = Reply::text(texts::GENERATING);
        let indicator = match self.show(from.id, message, processing.clone()).await {
            Ok(indicator) => Some(indicator),
            Err(e) => {
                warn!(user_id = from.id.0, error = %e, "failed to show processing status");
                None
            }
        };
        self.relay.relay_outbound(topic, &processing).await;

        let outcome = self.generator.generate(&request).await;
        info!(
            user_id = from.id.0,
            dimension = %request.dimension,
            improve,
            outcome = outcome.failure_reason().unwrap_or("delivered"),
            "generation finished"
        );
        if let GenerationOutcome::Unexpected(detail) = &outcome {
            error!(user_id = from.id.0, detail = %detail, "generation failed unexpectedly");
        }

        let result = self
            .reply(from.id, topic, render_outcome(&request.prompt, &outcome))
            .await;

        if let Some(indicator) = indicator {
            if let Err(e) = self.messenger.delete(indicator).await {
                debug!(error = %e, "failed to clear processing status");
            }
        }
        result.map(|_| ())
    }
}

/// The reply for a finished generation.
pub fn render_outcome(prompt: &str, outcome: &GenerationOutcome) -> Reply {
    match outcome {
        GenerationOutcome::Delivered {
            image_url,
            elapsed_secs,
            size_kb,
        } => Reply::photo(
            PhotoSource::Url(image_url.clone()),
            texts::generated(prompt, *elapsed_secs, *size_kb),
        )
        .with_keyboard(Keyboard::single(Button::url(texts::DOWNLOAD, image_url.clone()))),
        other => Reply::text(texts::error(other.failure_reason().unwrap_or("Unexpected error"))),
    }
}

fn format_uptime(secs: i64) -> String {
    let (h, m, s) = (secs / 3600, secs % 3600 / 60, secs % 60);
    format!("{h}h {m:02}m {s:02}s")
}
