// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence trait for user records.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{TopicId, UserId, UserRecord, UserUpdate};

/// Durable mapping from user id to usage count and topic id.
///
/// Records are created on first contact and never deleted.
#[async_trait]
pub trait UserStore: PluginAdapter {
    /// Returns the record for `user`, inserting a fresh one if absent.
    async fn get_or_create(&self, user: UserId) -> Result<UserRecord, RelayError>;

    /// Applies a partial update, creating the record first if needed.
    async fn update(&self, user: UserId, update: UserUpdate) -> Result<(), RelayError>;

    /// Atomically adds one to the usage counter and returns the new value.
    async fn increment_usage(&self, user: UserId) -> Result<u64, RelayError>;

    /// Every known user, ordered by id.
    async fn list_all(&self) -> Result<Vec<UserRecord>, RelayError>;

    /// Reverse lookup of the user owning a thread.
    async fn find_by_topic(&self, topic: TopicId) -> Result<Option<UserId>, RelayError>;

    /// Inserts a fresh record unless one exists. Returns true when inserted.
    async fn insert_if_absent(&self, user: UserId) -> Result<bool, RelayError>;
}
