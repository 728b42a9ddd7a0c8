// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram transport for pixrelay.
//!
//! [`TelegramMessenger`] implements [`Messenger`] on top of the Bot API via
//! teloxide; [`listener::start_polling`] turns long-polled updates into
//! [`InboundEvent`](pixrelay_core::types::InboundEvent)s.

pub mod handler;
pub mod keyboard;
pub mod listener;

use async_trait::async_trait;
use pixrelay_config::model::TelegramConfig;
use pixrelay_core::types::{
    AdapterType, ChatTarget, Content, Document, HealthStatus, Keyboard, MessageRef, ParseMode,
    PhotoSource, TopicId, UserId,
};
use pixrelay_core::{Messenger, PluginAdapter, RelayError};
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQueryId, ChatAction, FileId, InputFile, MessageId, ThreadId,
};
use teloxide::{ApiError, RequestError};
use tracing::debug;

pub use listener::{Polling, start_polling};

/// Telegram implementation of [`Messenger`].
#[derive(Clone)]
pub struct TelegramMessenger {
    bot: Bot,
}

impl TelegramMessenger {
    /// Creates the messenger. Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig) -> Result<Self, RelayError> {
        let token = config
            .bot_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RelayError::Config("telegram.bot_token is required".into()))?;
        Ok(Self {
            bot: Bot::new(token),
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }
}

fn thread_id(topic: TopicId) -> ThreadId {
    ThreadId(MessageId(topic.0))
}

fn transport_err(what: &str, e: RequestError) -> RelayError {
    RelayError::Transport {
        message: format!("{what}: {e}"),
        source: Some(Box::new(e)),
    }
}

fn teloxide_user(user: UserId) -> Result<teloxide::types::UserId, RelayError> {
    u64::try_from(user.0)
        .map(teloxide::types::UserId)
        .map_err(|_| RelayError::Validation(format!("not a user id: {user}")))
}

#[async_trait]
impl PluginAdapter for TelegramMessenger {
    fn name(&self) -> &str {
        "telegram"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Messenger
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        match self.bot.get_me().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!(
                "Telegram bot unreachable: {e}"
            ))),
        }
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        debug!("Telegram messenger shutting down");
        Ok(())
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send(&self, msg: pixrelay_core::types::OutboundMessage) -> Result<MessageRef, RelayError> {
        let chat = ChatId(msg.target.chat_id);
        let thread = msg.target.thread.map(thread_id);
        let markup = msg
            .reply
            .keyboard
            .as_ref()
            .map(keyboard::to_markup)
            .transpose()?;
        let parse_mode = match msg.reply.parse_mode {
            ParseMode::Html => Some(teloxide::types::ParseMode::Html),
            ParseMode::Plain => None,
        };

        let sent = match msg.reply.content {
            Content::Text(text) => {
                let mut req = self.bot.send_message(chat, text);
                if let Some(thread) = thread {
                    req = req.message_thread_id(thread);
                }
                if let Some(markup) = markup {
                    req = req.reply_markup(markup);
                }
                if let Some(mode) = parse_mode {
                    req = req.parse_mode(mode);
                }
                req.await.map_err(|e| transport_err("failed to send message", e))?
            }
            Content::Photo { source, caption } => {
                let photo = match source {
                    PhotoSource::Url(url) => InputFile::url(keyboard::parse_link(&url)?),
                    PhotoSource::FileId(id) => InputFile::file_id(FileId(id)),
                };
                let mut req = self.bot.send_photo(chat, photo);
                if let Some(caption) = caption {
                    req = req.caption(caption);
                }
                if let Some(thread) = thread {
                    req = req.message_thread_id(thread);
                }
                if let Some(markup) = markup {
                    req = req.reply_markup(markup);
                }
                if let Some(mode) = parse_mode {
                    req = req.parse_mode(mode);
                }
                req.await.map_err(|e| transport_err("failed to send photo", e))?
            }
        };

        Ok(MessageRef {
            chat_id: sent.chat.id.0,
            message_id: sent.id.0,
        })
    }

    async fn forward(&self, to: ChatTarget, message: MessageRef) -> Result<(), RelayError> {
        let mut req = self.bot.forward_message(
            ChatId(to.chat_id),
            ChatId(message.chat_id),
            MessageId(message.message_id),
        );
        if let Some(topic) = to.thread {
            req = req.message_thread_id(thread_id(topic));
        }
        req.await
            .map_err(|e| transport_err("failed to forward message", e))?;
        Ok(())
    }

    async fn edit_text(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), RelayError> {
        let mut req = self.bot.edit_message_text(
            ChatId(message.chat_id),
            MessageId(message.message_id),
            text,
        );
        if let Some(keyboard) = keyboard {
            req = req.reply_markup(keyboard::to_markup(&keyboard)?);
        }
        match req.await {
            Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
            Err(e) => Err(transport_err("failed to edit message", e)),
        }
    }

    async fn delete(&self, message: MessageRef) -> Result<(), RelayError> {
        self.bot
            .delete_message(ChatId(message.chat_id), MessageId(message.message_id))
            .await
            .map_err(|e| transport_err("failed to delete message", e))?;
        Ok(())
    }

    async fn create_topic(&self, group_chat_id: i64, name: &str) -> Result<TopicId, RelayError> {
        let topic = self
            .bot
            .create_forum_topic(ChatId(group_chat_id), name)
            .await
            .map_err(|e| transport_err("failed to create forum topic", e))?;
        Ok(TopicId(topic.thread_id.0.0))
    }

    async fn probe_topic(&self, group_chat_id: i64, topic: TopicId) -> Result<(), RelayError> {
        self.bot
            .send_chat_action(ChatId(group_chat_id), ChatAction::Typing)
            .message_thread_id(thread_id(topic))
            .await
            .map_err(|e| transport_err("topic probe failed", e))?;
        Ok(())
    }

    async fn profile_photo(&self, user: UserId) -> Result<Option<String>, RelayError> {
        let photos = self
            .bot
            .get_user_profile_photos(teloxide_user(user)?)
            .limit(1)
            .await
            .map_err(|e| transport_err("failed to fetch profile photos", e))?;
        Ok(photos
            .photos
            .first()
            .and_then(|sizes| sizes.last())
            .map(|largest| largest.file.id.to_string()))
    }

    async fn send_document(&self, chat_id: i64, document: Document) -> Result<(), RelayError> {
        let file = InputFile::memory(document.bytes).file_name(document.file_name);
        let mut req = self.bot.send_document(ChatId(chat_id), file);
        if let Some(caption) = document.caption {
            req = req.caption(caption);
        }
        req.await
            .map_err(|e| transport_err("failed to send document", e))?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), RelayError> {
        self.bot
            .answer_callback_query(CallbackQueryId(callback_id.to_owned()))
            .await
            .map_err(|e| transport_err("failed to answer callback", e))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> TelegramConfig {
        TelegramConfig {
            bot_token: token.map(str::to_string),
            group_chat_id: -100,
            notify_stale_topics: false,
        }
    }

    #[test]
    fn new_requires_bot_token() {
        assert!(TelegramMessenger::new(&config(None)).is_err());
        assert!(TelegramMessenger::new(&config(Some("  "))).is_err());
    }

    #[test]
    fn new_accepts_valid_token() {
        let messenger =
            TelegramMessenger::new(&config(Some("123456:ABC-DEF1234ghIkl-zyx57W2v1u123ew11")))
                .unwrap();
        assert_eq!(messenger.name(), "telegram");
        assert_eq!(messenger.adapter_type(), AdapterType::Messenger);
    }

    #[test]
    fn topic_maps_to_thread_id() {
        assert_eq!(thread_id(TopicId(42)), ThreadId(MessageId(42)));
    }

    #[test]
    fn negative_ids_are_not_users() {
        assert!(teloxide_user(UserId(-5)).is_err());
        assert_eq!(
            teloxide_user(UserId(5)).unwrap(),
            teloxide::types::UserId(5)
        );
    }
}
