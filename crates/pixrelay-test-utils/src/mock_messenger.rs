// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging transport for deterministic testing.
//!
//! `MockMessenger` implements `Messenger` by recording every call. Failures
//! can be injected per chat, per thread, or for whole operations.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI32, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use pixrelay_core::types::{
    AdapterType, ChatTarget, Document, HealthStatus, Keyboard, MessageRef, OutboundMessage, Reply,
    TopicId, UserId,
};
use pixrelay_core::{Messenger, PluginAdapter, RelayError};

#[derive(Default)]
struct Recorded {
    sent: Vec<OutboundMessage>,
    forwards: Vec<(ChatTarget, MessageRef)>,
    edits: Vec<(MessageRef, String, Option<Keyboard>)>,
    deleted: Vec<MessageRef>,
    topics: Vec<(i64, String, TopicId)>,
    probes: Vec<TopicId>,
    documents: Vec<(i64, Document)>,
    answered: Vec<String>,
}

#[derive(Default)]
struct Faults {
    failing_chats: HashSet<i64>,
    dead_topics: HashSet<TopicId>,
    fail_forwards: bool,
    fail_topic_creation: bool,
    profile_photos: HashMap<UserId, String>,
}

/// A recording messenger for tests.
pub struct MockMessenger {
    recorded: Mutex<Recorded>,
    faults: Mutex<Faults>,
    next_message: AtomicI32,
    next_topic: AtomicI32,
}

impl MockMessenger {
    /// Create a messenger where every call succeeds.
    pub fn new() -> Self {
        Self {
            recorded: Mutex::new(Recorded::default()),
            faults: Mutex::new(Faults::default()),
            next_message: AtomicI32::new(1),
            next_topic: AtomicI32::new(1000),
        }
    }

    // --- fault injection ---

    /// Make sends and documents to `chat_id` fail.
    pub async fn fail_chat(&self, chat_id: i64) {
        self.faults.lock().await.failing_chats.insert(chat_id);
    }

    /// Make probes of `topic` fail, as if the thread was deleted.
    pub async fn kill_topic(&self, topic: TopicId) {
        self.faults.lock().await.dead_topics.insert(topic);
    }

    pub async fn fail_forwards(&self, fail: bool) {
        self.faults.lock().await.fail_forwards = fail;
    }

    pub async fn fail_topic_creation(&self, fail: bool) {
        self.faults.lock().await.fail_topic_creation = fail;
    }

    pub async fn set_profile_photo(&self, user: UserId, file_id: &str) {
        self.faults
            .lock()
            .await
            .profile_photos
            .insert(user, file_id.to_string());
    }

    // --- inspection ---

    /// Every message passed to `send()`, in order.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.recorded.lock().await.sent.clone()
    }

    /// Replies sent to exactly `target`.
    pub async fn sent_to(&self, target: ChatTarget) -> Vec<Reply> {
        self.recorded
            .lock()
            .await
            .sent
            .iter()
            .filter(|m| m.target == target)
            .map(|m| m.reply.clone())
            .collect()
    }

    /// Bodies of the replies sent to a user's private chat.
    pub async fn texts_to(&self, user: UserId) -> Vec<String> {
        self.sent_to(ChatTarget::user(user))
            .await
            .iter()
            .filter_map(|r| r.body().map(str::to_string))
            .collect()
    }

    pub async fn forwards(&self) -> Vec<(ChatTarget, MessageRef)> {
        self.recorded.lock().await.forwards.clone()
    }

    pub async fn edits(&self) -> Vec<(MessageRef, String, Option<Keyboard>)> {
        self.recorded.lock().await.edits.clone()
    }

    pub async fn deleted(&self) -> Vec<MessageRef> {
        self.recorded.lock().await.deleted.clone()
    }

    /// `(group, name, topic)` of each created thread.
    pub async fn created_topics(&self) -> Vec<(i64, String, TopicId)> {
        self.recorded.lock().await.topics.clone()
    }

    pub async fn probes(&self) -> Vec<TopicId> {
        self.recorded.lock().await.probes.clone()
    }

    pub async fn documents(&self) -> Vec<(i64, Document)> {
        self.recorded.lock().await.documents.clone()
    }

    pub async fn answered(&self) -> Vec<String> {
        self.recorded.lock().await.answered.clone()
    }

    /// Forget everything recorded so far. Faults stay in place.
    pub async fn clear(&self) {
        *self.recorded.lock().await = Recorded::default();
    }

    fn next_ref(&self, chat_id: i64) -> MessageRef {
        MessageRef {
            chat_id,
            message_id: self.next_message.fetch_add(1, Ordering::Relaxed),
        }
    }
}

impl Default for MockMessenger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockMessenger {
    fn name(&self) -> &str {
        "mock-messenger"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Messenger
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    async fn send(&self, msg: OutboundMessage) -> Result<MessageRef, RelayError> {
        if self.faults.lock().await.failing_chats.contains(&msg.target.chat_id) {
            return Err(RelayError::transport(format!(
                "chat {} unreachable",
                msg.target.chat_id
            )));
        }
        if let Some(topic) = msg.target.thread {
            if self.faults.lock().await.dead_topics.contains(&topic) {
                return Err(RelayError::transport(format!("thread {topic} not found")));
            }
        }
        let sent = self.next_ref(msg.target.chat_id);
        self.recorded.lock().await.sent.push(msg);
        Ok(sent)
    }

    async fn forward(&self, to: ChatTarget, message: MessageRef) -> Result<(), RelayError> {
        if self.faults.lock().await.fail_forwards {
            return Err(RelayError::transport("forward rejected"));
        }
        self.recorded.lock().await.forwards.push((to, message));
        Ok(())
    }

    async fn edit_text(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<(), RelayError> {
        self.recorded
            .lock()
            .await
            .edits
            .push((message, text.to_string(), keyboard));
        Ok(())
    }

    async fn delete(&self, message: MessageRef) -> Result<(), RelayError> {
        self.recorded.lock().await.deleted.push(message);
        Ok(())
    }

    async fn create_topic(&self, group_chat_id: i64, name: &str) -> Result<TopicId, RelayError> {
        if self.faults.lock().await.fail_topic_creation {
            return Err(RelayError::transport("not enough rights to create a topic"));
        }
        let topic = TopicId(self.next_topic.fetch_add(1, Ordering::Relaxed));
        self.recorded
            .lock()
            .await
            .topics
            .push((group_chat_id, name.to_string(), topic));
        Ok(topic)
    }

    async fn probe_topic(&self, _group_chat_id: i64, topic: TopicId) -> Result<(), RelayError> {
        self.recorded.lock().await.probes.push(topic);
        if self.faults.lock().await.dead_topics.contains(&topic) {
            return Err(RelayError::transport(format!("thread {topic} not found")));
        }
        Ok(())
    }

    async fn profile_photo(&self, user: UserId) -> Result<Option<String>, RelayError> {
        Ok(self.faults.lock().await.profile_photos.get(&user).cloned())
    }

    async fn send_document(&self, chat_id: i64, document: Document) -> Result<(), RelayError> {
        if self.faults.lock().await.failing_chats.contains(&chat_id) {
            return Err(RelayError::transport(format!("chat {chat_id} unreachable")));
        }
        self.recorded.lock().await.documents.push((chat_id, document));
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<(), RelayError> {
        self.recorded
            .lock()
            .await
            .answered
            .push(callback_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_sends_with_distinct_refs() {
        let messenger = MockMessenger::new();
        let a = messenger
            .send(Reply::text("one").to(ChatTarget::chat(5)))
            .await
            .unwrap();
        let b = messenger
            .send(Reply::text("two").to(ChatTarget::chat(5)))
            .await
            .unwrap();
        assert_ne!(a, b);
        assert_eq!(messenger.texts_to(UserId(5)).await, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn dead_topics_fail_probes_and_sends() {
        let messenger = MockMessenger::new();
        messenger.kill_topic(TopicId(3)).await;
        assert!(messenger.probe_topic(-1, TopicId(3)).await.is_err());
        assert!(messenger.probe_topic(-1, TopicId(4)).await.is_ok());
        assert!(messenger
            .send(Reply::text("x").to(ChatTarget::topic(-1, TopicId(3))))
            .await
            .is_err());
        assert_eq!(messenger.probes().await, vec![TopicId(3), TopicId(4)]);
    }

    #[tokio::test]
    async fn created_topics_are_unique() {
        let messenger = MockMessenger::new();
        let a = messenger.create_topic(-1, "User a").await.unwrap();
        let b = messenger.create_topic(-1, "User b").await.unwrap();
        assert_ne!(a, b);
        messenger.clear().await;
        assert!(messenger.created_topics().await.is_empty());
    }
}
