// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end testing of the bot.
//!
//! `TestHarness` wires a [`PixBot`] to mock adapters and a temporary data
//! directory, and offers helpers that play the part of users and the
//! operator.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use pixrelay_agent::{BotSettings, PixBot};
use pixrelay_config::PixrelayConfig;
use pixrelay_core::types::{
    Command, Dimension, GenerationOutcome, InboundEvent, MessageRef, TopicId, UserId, UserProfile,
};
use pixrelay_core::RelayError;

use crate::memory_store::MemoryUserStore;
use crate::mock_generator::MockGenerator;
use crate::mock_messenger::MockMessenger;

/// The operator of every harness.
pub const ADMIN: UserId = UserId(1);

/// The staff group of every harness.
pub const GROUP_CHAT: i64 = -100_123;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    outcomes: Vec<GenerationOutcome>,
    session_ttl_secs: u64,
    send_delay_ms: u64,
    notify_stale_topics: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            outcomes: Vec::new(),
            session_ttl_secs: 0,
            send_delay_ms: 0,
            notify_stale_topics: false,
        }
    }

    /// Outcomes returned by successive generations; then every one delivers.
    pub fn with_outcomes(mut self, outcomes: Vec<GenerationOutcome>) -> Self {
        self.outcomes = outcomes;
        self
    }

    pub fn with_session_ttl(mut self, secs: u64) -> Self {
        self.session_ttl_secs = secs;
        self
    }

    pub fn with_send_delay_ms(mut self, millis: u64) -> Self {
        self.send_delay_ms = millis;
        self
    }

    pub fn with_stale_topic_notices(mut self) -> Self {
        self.notify_stale_topics = true;
        self
    }

    /// Build the test harness.
    pub fn build(self) -> Result<TestHarness, RelayError> {
        let temp_dir = tempfile::TempDir::new().map_err(|e| RelayError::Storage {
            source: Box::new(e),
        })?;

        let mut config = PixrelayConfig::default();
        config.bot.admin_id = ADMIN.0;
        config.bot.session_ttl_secs = self.session_ttl_secs;
        config.telegram.group_chat_id = GROUP_CHAT;
        config.telegram.notify_stale_topics = self.notify_stale_topics;
        config.broadcast.send_delay_ms = self.send_delay_ms;
        config.storage.data_dir = temp_dir.path().to_string_lossy().to_string();
        config.image_api.base_url = "https://images.test/".to_string();

        let messenger = Arc::new(MockMessenger::new());
        let store = Arc::new(MemoryUserStore::new());
        let generator = Arc::new(MockGenerator::with_outcomes(self.outcomes));
        let bot = Arc::new(PixBot::new(
            messenger.clone(),
            store.clone(),
            generator.clone(),
            BotSettings::from_config(&config),
        ));

        Ok(TestHarness {
            bot,
            messenger,
            store,
            generator,
            config,
            next_message: AtomicI32::new(1),
            _temp_dir: temp_dir,
        })
    }
}

/// A bot wired to mocks, plus helpers that drive it.
pub struct TestHarness {
    pub bot: Arc<PixBot>,
    pub messenger: Arc<MockMessenger>,
    pub store: Arc<MemoryUserStore>,
    pub generator: Arc<MockGenerator>,
    pub config: PixrelayConfig,
    next_message: AtomicI32,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with default settings.
    pub fn new() -> Result<Self, RelayError> {
        Self::builder().build()
    }

    pub fn profile(user: UserId) -> UserProfile {
        UserProfile {
            id: user,
            full_name: format!("Tester {user}"),
        }
    }

    /// A fresh reference to a message in `user`'s private chat.
    pub fn message_in(&self, user: UserId) -> MessageRef {
        MessageRef {
            chat_id: user.0,
            message_id: self.next_message.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Sends a slash command such as `/gen` or `/bro Hello`.
    pub async fn command(&self, user: UserId, text: &str) -> Result<(), RelayError> {
        let (command, args) = Command::parse(text)
            .ok_or_else(|| RelayError::Validation(format!("not a command: {text}")))?;
        self.bot
            .handle(InboundEvent::Command {
                from: Self::profile(user),
                message: self.message_in(user),
                command,
                args,
            })
            .await
    }

    /// Sends free text in the private chat.
    pub async fn text(&self, user: UserId, text: &str) -> Result<(), RelayError> {
        self.bot
            .handle(InboundEvent::PrivateText {
                from: Self::profile(user),
                message: self.message_in(user),
                text: text.to_string(),
            })
            .await
    }

    /// Presses an inline button with callback `data` on `message`.
    pub async fn press(
        &self,
        user: UserId,
        data: &str,
        message: Option<MessageRef>,
    ) -> Result<(), RelayError> {
        self.bot
            .handle(InboundEvent::Callback {
                from: Self::profile(user),
                callback_id: format!("cb-{}", self.next_message.fetch_add(1, Ordering::Relaxed)),
                message,
                data: data.to_string(),
            })
            .await
    }

    /// Posts text inside a staff-group thread.
    pub async fn topic_reply(
        &self,
        user: UserId,
        topic: TopicId,
        text: &str,
    ) -> Result<(), RelayError> {
        self.bot
            .handle(InboundEvent::TopicReply {
                from: Self::profile(user),
                topic,
                text: text.to_string(),
            })
            .await
    }

    /// Walks `user` through `/gen`, prompt, dimension and improve.
    pub async fn generate(
        &self,
        user: UserId,
        prompt: &str,
        dimension: Dimension,
        improve: bool,
    ) -> Result<(), RelayError> {
        self.command(user, "/gen").await?;
        self.text(user, prompt).await?;
        let pressed = self.message_in(user);
        self.press(user, &format!("dim_{dimension}"), Some(pressed))
            .await?;
        self.press(user, &format!("imp_{improve}"), Some(pressed))
            .await
    }
}
