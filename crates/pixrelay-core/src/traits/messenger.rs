// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging transport trait (the chat platform's bot API).

use async_trait::async_trait;

use crate::error::RelayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChatTarget, Document, Keyboard, MessageRef, OutboundMessage, TopicId, UserId};

/// Outbound capabilities the bot needs from the chat platform.
///
/// Inbound events arrive separately as [`crate::types::InboundEvent`]s.
#[async_trait]
pub trait Messenger: PluginAdapter {
    /// Sends text or a photo, with optional inline keyboard.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageRef, RelayError>;

    /// Forwards an existing message verbatim.
    async fn forward(&self, to: ChatTarget, message: MessageRef) -> Result<(), RelayError>;

    /// Replaces the text (and keyboard) of a previously sent message.
    async fn edit_text(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), RelayError>;

    async fn delete(&self, message: MessageRef) -> Result<(), RelayError>;

    /// Creates a named thread in a forum group.
    async fn create_topic(&self, group_chat_id: i64, name: &str) -> Result<TopicId, RelayError>;

    /// Lightweight liveness check of a thread. `Err` means the thread is unusable.
    async fn probe_topic(&self, group_chat_id: i64, topic: TopicId) -> Result<(), RelayError>;

    /// File reference of the user's most recent profile photo, if any.
    async fn profile_photo(&self, user: UserId) -> Result<Option<String>, RelayError>;

    async fn send_document(&self, chat_id: i64, document: Document) -> Result<(), RelayError>;

    /// Acknowledges an inline-button press so the client stops its spinner.
    async fn answer_callback(&self, callback_id: &str) -> Result<(), RelayError>;
}
