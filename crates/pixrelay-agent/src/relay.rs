// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Topic relay: one staff-group thread per user, and the traffic mirrored
//! between the user's private chat and that thread.
//!
//! Everything except [`TopicRelay::ensure_topic`] is a side channel. Failures
//! are logged and swallowed so they never abort the reply to the user.

use std::sync::Arc;

use dashmap::DashMap;
use pixrelay_core::types::{ChatTarget, PhotoSource, Reply, UserProfile, UserUpdate};
use pixrelay_core::{Messenger, MessageRef, RelayError, TopicId, UserId, UserStore};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Maps users to live threads in the staff group and mirrors traffic.
pub struct TopicRelay {
    messenger: Arc<dyn Messenger>,
    store: Arc<dyn UserStore>,
    group_chat_id: i64,
    operator: UserId,
    notify_stale: bool,
    creating: DashMap<UserId, Arc<Mutex<()>>>,
}

impl TopicRelay {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        store: Arc<dyn UserStore>,
        group_chat_id: i64,
        operator: UserId,
        notify_stale: bool,
    ) -> Self {
        Self {
            messenger,
            store,
            group_chat_id,
            operator,
            notify_stale,
            creating: DashMap::new(),
        }
    }

    pub fn group_chat_id(&self) -> i64 {
        self.group_chat_id
    }

    /// Returns the user's live thread, replacing a dead one or creating the
    /// first one. Also ensures the user record exists.
    ///
    /// Calls for the same user are serialized so concurrent events never
    /// create two threads.
    pub async fn ensure_topic(&self, user: &UserProfile) -> Result<TopicId, RelayError> {
        let lock = self
            .creating
            .entry(user.id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.reuse_or_create(user).await
        };
        drop(lock);

        // Only the map still holds the lock once no caller waits on it.
        self.creating
            .remove_if(&user.id, |_, lock| Arc::strong_count(lock) == 1);
        result
    }

    async fn reuse_or_create(&self, user: &UserProfile) -> Result<TopicId, RelayError> {
        let record = self.store.get_or_create(user.id).await?;
        if let Some(topic) = record.topic_id {
            match self.messenger.probe_topic(self.group_chat_id, topic).await {
                Ok(()) => {
                    debug!(user_id = user.id.0, topic_id = topic.0, "reusing topic");
                    return Ok(topic);
                }
                Err(e) => {
                    warn!(
                        user_id = user.id.0,
                        topic_id = topic.0,
                        error = %e,
                        "stored topic is unusable, replacing it"
                    );
                    self.store.update(user.id, UserUpdate::clear_topic()).await?;
                    if self.notify_stale {
                        self.notify_operator(user, topic).await;
                    }
                }
            }
        }

        let name = format!("User {}", user.display_name());
        let topic = self.messenger.create_topic(self.group_chat_id, &name).await?;
        self.store.update(user.id, UserUpdate::set_topic(topic)).await?;
        info!(user_id = user.id.0, topic_id = topic.0, "created topic");

        self.post_identity_card(user, topic).await;
        Ok(topic)
    }

    /// Like [`ensure_topic`](Self::ensure_topic), but logs and swallows failure.
    pub async fn topic_for(&self, user: &UserProfile) -> Option<TopicId> {
        match self.ensure_topic(user).await {
            Ok(topic) => Some(topic),
            Err(e) => {
                warn!(user_id = user.id.0, error = %e, "no topic available for user");
                None
            }
        }
    }

    /// Forwards the user's original message into their thread and returns
    /// the thread for mirroring the replies.
    pub async fn relay_inbound(&self, user: &UserProfile, message: MessageRef) -> Option<TopicId> {
        let topic = self.topic_for(user).await?;
        let target = ChatTarget::topic(self.group_chat_id, topic);
        if let Err(e) = self.messenger.forward(target, message).await {
            warn!(
                user_id = user.id.0,
                topic_id = topic.0,
                error = %e,
                "failed to forward message to topic"
            );
        }
        Some(topic)
    }

    /// Mirrors a bot reply into a thread. No-op without a thread.
    pub async fn relay_outbound(&self, topic: Option<TopicId>, reply: &Reply) {
        let Some(topic) = topic else {
            debug!("no topic to mirror reply into");
            return;
        };
        let target = ChatTarget::topic(self.group_chat_id, topic);
        if let Err(e) = self.messenger.send(reply.clone().to(target)).await {
            warn!(topic_id = topic.0, error = %e, "failed to mirror reply to topic");
        }
    }

    /// Delivers operator text posted in a thread to the thread's owner.
    /// Threads without an owner are ignored.
    pub async fn relay_admin_reply(&self, topic: TopicId, text: &str) {
        let owner = match self.store.find_by_topic(topic).await {
            Ok(Some(owner)) => owner,
            Ok(None) => {
                debug!(topic_id = topic.0, "no user owns this topic");
                return;
            }
            Err(e) => {
                warn!(topic_id = topic.0, error = %e, "topic owner lookup failed");
                return;
            }
        };
        let msg = Reply::text(text).to(ChatTarget::user(owner));
        if let Err(e) = self.messenger.send(msg).await {
            warn!(user_id = owner.0, error = %e, "failed to deliver operator reply");
        }
    }

    async fn post_identity_card(&self, user: &UserProfile, topic: TopicId) {
        let card = identity_card(user);
        let photo = match self.messenger.profile_photo(user.id).await {
            Ok(photo) => photo,
            Err(e) => {
                debug!(user_id = user.id.0, error = %e, "profile photo unavailable");
                None
            }
        };
        let reply = match photo {
            Some(file_id) => Reply::photo(PhotoSource::FileId(file_id), card),
            None => Reply::text(card),
        };
        self.relay_outbound(Some(topic), &reply.html()).await;
    }

    async fn notify_operator(&self, user: &UserProfile, stale: TopicId) {
        let text = format!(
            "Topic {stale} of user {} is gone, opening a new one.",
            user.id
        );
        let msg = Reply::text(text).to(ChatTarget::user(self.operator));
        if let Err(e) = self.messenger.send(msg).await {
            warn!(error = %e, "failed to notify operator about stale topic");
        }
    }
}

/// HTML card introducing the user at the top of their thread.
pub fn identity_card(user: &UserProfile) -> String {
    format!(
        "User Info:\nFull Name: {}\n<a href=\"tg://user?id={id}\">User ID: {id}</a>",
        escape_html(&user.display_name()),
        id = user.id,
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixrelay_core::types::{Content, ParseMode};
    use pixrelay_test_utils::{MemoryUserStore, MockMessenger};
    use tracing_test::traced_test;

    const GROUP: i64 = -100_200;
    const OPERATOR: UserId = UserId(1);

    fn alice() -> UserProfile {
        UserProfile {
            id: UserId(42),
            full_name: "Alice <Admin>".into(),
        }
    }

    fn relay(messenger: &Arc<MockMessenger>, store: &Arc<MemoryUserStore>) -> TopicRelay {
        TopicRelay::new(messenger.clone(), store.clone(), GROUP, OPERATOR, true)
    }

    #[test]
    fn card_escapes_name_and_links_id() {
        let card = identity_card(&alice());
        assert!(card.contains("Full Name: Alice &lt;Admin&gt;"));
        assert!(card.contains("<a href=\"tg://user?id=42\">User ID: 42</a>"));
    }

    #[tokio::test]
    async fn first_contact_creates_topic_and_card() {
        let messenger = Arc::new(MockMessenger::new());
        let store = Arc::new(MemoryUserStore::new());
        let relay = relay(&messenger, &store);

        let topic = relay.ensure_topic(&alice()).await.unwrap();

        let created = messenger.created_topics().await;
        assert_eq!(created, vec![(GROUP, "User Alice <Admin>".to_string(), topic)]);
        assert_eq!(store.record(UserId(42)).await.unwrap().topic_id, Some(topic));

        let sent = messenger.sent_to(ChatTarget::topic(GROUP, topic)).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].parse_mode, ParseMode::Html);
        assert!(matches!(sent[0].content, Content::Text(_)));
    }

    #[tokio::test]
    async fn card_uses_profile_photo_when_present() {
        let messenger = Arc::new(MockMessenger::new());
        messenger.set_profile_photo(UserId(42), "photo-file").await;
        let store = Arc::new(MemoryUserStore::new());
        let topic = relay(&messenger, &store).ensure_topic(&alice()).await.unwrap();

        let sent = messenger.sent_to(ChatTarget::topic(GROUP, topic)).await;
        assert!(matches!(
            &sent[0].content,
            Content::Photo { source: PhotoSource::FileId(id), .. } if id == "photo-file"
        ));
    }

    #[tokio::test]
    async fn live_topic_is_reused() {
        let messenger = Arc::new(MockMessenger::new());
        let store = Arc::new(MemoryUserStore::new());
        let relay = relay(&messenger, &store);

        let first = relay.ensure_topic(&alice()).await.unwrap();
        let second = relay.ensure_topic(&alice()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(messenger.created_topics().await.len(), 1);
    }

    #[tokio::test]
    async fn dead_topic_is_replaced_once_and_operator_told() {
        let messenger = Arc::new(MockMessenger::new());
        let store = Arc::new(MemoryUserStore::new());
        store.seed(UserId(42), 3, Some(TopicId(7))).await;
        messenger.kill_topic(TopicId(7)).await;
        let relay = relay(&messenger, &store);

        let topic = relay.ensure_topic(&alice()).await.unwrap();
        assert_ne!(topic, TopicId(7));
        assert_eq!(messenger.created_topics().await.len(), 1);

        let record = store.record(UserId(42)).await.unwrap();
        assert_eq!(record.topic_id, Some(topic));
        assert_eq!(record.usage_count, 3);
        assert_eq!(messenger.sent_to(ChatTarget::user(OPERATOR)).await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_first_contact_creates_one_topic() {
        let messenger = Arc::new(MockMessenger::new());
        let store = Arc::new(MemoryUserStore::new());
        let relay = Arc::new(relay(&messenger, &store));

        let mut handles = Vec::new();
        for _ in 0..5 {
            let relay = relay.clone();
            handles.push(tokio::spawn(async move { relay.ensure_topic(&alice()).await }));
        }
        let mut topics = Vec::new();
        for handle in handles {
            topics.push(handle.await.unwrap().unwrap());
        }
        topics.dedup();
        assert_eq!(topics.len(), 1);
        assert_eq!(messenger.created_topics().await.len(), 1);
        assert!(relay.creating.is_empty());
    }

    #[tokio::test]
    async fn per_user_locks_are_released_after_use() {
        let messenger = Arc::new(MockMessenger::new());
        let store = Arc::new(MemoryUserStore::new());
        let relay = relay(&messenger, &store);

        for id in 100..110 {
            let user = UserProfile {
                id: UserId(id),
                full_name: "User".into(),
            };
            relay.ensure_topic(&user).await.unwrap();
        }
        assert!(relay.creating.is_empty());

        messenger.fail_topic_creation(true).await;
        let user = UserProfile {
            id: UserId(200),
            full_name: "User".into(),
        };
        assert!(relay.ensure_topic(&user).await.is_err());
        assert!(relay.creating.is_empty());
    }

    #[tokio::test]
    #[traced_test]
    async fn forward_failure_is_swallowed() {
        let messenger = Arc::new(MockMessenger::new());
        messenger.fail_forwards(true).await;
        let store = Arc::new(MemoryUserStore::new());
        let relay = relay(&messenger, &store);

        let message = MessageRef {
            chat_id: 42,
            message_id: 5,
        };
        assert!(relay.relay_inbound(&alice(), message).await.is_some());
        assert!(logs_contain("failed to forward message to topic"));
    }

    #[tokio::test]
    async fn admin_reply_reaches_owner_or_is_dropped() {
        let messenger = Arc::new(MockMessenger::new());
        let store = Arc::new(MemoryUserStore::new());
        store.seed(UserId(42), 0, Some(TopicId(9))).await;
        let relay = relay(&messenger, &store);

        relay.relay_admin_reply(TopicId(9), "hi there").await;
        relay.relay_admin_reply(TopicId(99), "nobody").await;

        let sent = messenger.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target, ChatTarget::user(UserId(42)));
        assert_eq!(sent[0].reply.body(), Some("hi there"));
    }

    #[tokio::test]
    async fn mirror_without_topic_is_noop() {
        let messenger = Arc::new(MockMessenger::new());
        let store = Arc::new(MemoryUserStore::new());
        relay(&messenger, &store)
            .relay_outbound(None, &Reply::text("x"))
            .await;
        assert!(messenger.sent_messages().await.is_empty());
    }
}
