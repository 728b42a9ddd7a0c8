// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory user store with the same contract as the SQLite one.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use pixrelay_core::types::{
    AdapterType, HealthStatus, TopicChange, TopicId, UserId, UserRecord, UserUpdate,
};
use pixrelay_core::{PluginAdapter, RelayError, UserStore};

pub struct MemoryUserStore {
    users: Mutex<BTreeMap<UserId, UserRecord>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(BTreeMap::new()),
        }
    }

    /// Insert or overwrite a record.
    pub async fn seed(&self, user: UserId, usage_count: u64, topic_id: Option<TopicId>) {
        self.users.lock().await.insert(
            user,
            UserRecord {
                user_id: user,
                usage_count,
                topic_id,
            },
        );
    }

    pub async fn record(&self, user: UserId) -> Option<UserRecord> {
        self.users.lock().await.get(&user).cloned()
    }

    pub async fn len(&self) -> usize {
        self.users.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.lock().await.is_empty()
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MemoryUserStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get_or_create(&self, user: UserId) -> Result<UserRecord, RelayError> {
        Ok(self
            .users
            .lock()
            .await
            .entry(user)
            .or_insert_with(|| UserRecord::new(user))
            .clone())
    }

    async fn update(&self, user: UserId, update: UserUpdate) -> Result<(), RelayError> {
        let mut users = self.users.lock().await;
        let record = users.entry(user).or_insert_with(|| UserRecord::new(user));
        if let Some(count) = update.usage_count {
            record.usage_count = record.usage_count.max(count);
        }
        match update.topic {
            Some(TopicChange::Set(topic)) => record.topic_id = Some(topic),
            Some(TopicChange::Clear) => record.topic_id = None,
            None => {}
        }
        Ok(())
    }

    async fn increment_usage(&self, user: UserId) -> Result<u64, RelayError> {
        let mut users = self.users.lock().await;
        let record = users.entry(user).or_insert_with(|| UserRecord::new(user));
        record.usage_count += 1;
        Ok(record.usage_count)
    }

    async fn list_all(&self) -> Result<Vec<UserRecord>, RelayError> {
        Ok(self.users.lock().await.values().cloned().collect())
    }

    async fn find_by_topic(&self, topic: TopicId) -> Result<Option<UserId>, RelayError> {
        Ok(self
            .users
            .lock()
            .await
            .values()
            .find(|r| r.topic_id == Some(topic))
            .map(|r| r.user_id))
    }

    async fn insert_if_absent(&self, user: UserId) -> Result<bool, RelayError> {
        let mut users = self.users.lock().await;
        if users.contains_key(&user) {
            return Ok(false);
        }
        users.insert(user, UserRecord::new(user));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn usage_never_decreases() {
        let store = MemoryUserStore::new();
        store.update(UserId(1), UserUpdate::usage(5)).await.unwrap();
        store.update(UserId(1), UserUpdate::usage(2)).await.unwrap();
        assert_eq!(store.increment_usage(UserId(1)).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn topic_lookup_follows_updates() {
        let store = MemoryUserStore::new();
        store
            .update(UserId(1), UserUpdate::set_topic(TopicId(9)))
            .await
            .unwrap();
        assert_eq!(store.find_by_topic(TopicId(9)).await.unwrap(), Some(UserId(1)));

        store.update(UserId(1), UserUpdate::clear_topic()).await.unwrap();
        assert_eq!(store.find_by_topic(TopicId(9)).await.unwrap(), None);
        assert!(!store.insert_if_absent(UserId(1)).await.unwrap());
        assert!(store.insert_if_absent(UserId(2)).await.unwrap());
        assert_eq!(store.len().await, 2);
    }
}
