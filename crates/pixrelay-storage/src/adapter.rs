// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the UserStore trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use pixrelay_config::model::StorageConfig;
use pixrelay_core::types::{TopicId, UserId, UserRecord, UserUpdate};
use pixrelay_core::{AdapterType, HealthStatus, PluginAdapter, RelayError, UserStore};

use crate::database::Database;
use crate::queries;

/// SQLite-backed user store.
///
/// The database is opened lazily by [`SqliteUserStore::initialize`]; every
/// query before that fails with a storage error.
pub struct SqliteUserStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteUserStore {
    /// Create a new store for the configured path. Nothing is opened yet.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Open the database and apply migrations. Fails if called twice.
    pub async fn initialize(&self) -> Result<(), RelayError> {
        let db = Database::open(&self.config.database_path).await?;
        self.db.set(db).map_err(|_| RelayError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite user store initialized");
        Ok(())
    }

    /// Number of stored users.
    pub async fn count(&self) -> Result<u64, RelayError> {
        queries::users::count(self.db()?).await
    }

    fn db(&self) -> Result<&Database, RelayError> {
        self.db.get().ok_or_else(|| RelayError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteUserStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn get_or_create(&self, user: UserId) -> Result<UserRecord, RelayError> {
        queries::users::get_or_create(self.db()?, user).await
    }

    async fn update(&self, user: UserId, update: UserUpdate) -> Result<(), RelayError> {
        queries::users::update(self.db()?, user, update).await
    }

    async fn increment_usage(&self, user: UserId) -> Result<u64, RelayError> {
        queries::users::increment_usage(self.db()?, user).await
    }

    async fn list_all(&self) -> Result<Vec<UserRecord>, RelayError> {
        queries::users::list_all(self.db()?).await
    }

    async fn find_by_topic(&self, topic: TopicId) -> Result<Option<UserId>, RelayError> {
        queries::users::find_by_topic(self.db()?, topic).await
    }

    async fn insert_if_absent(&self, user: UserId) -> Result<bool, RelayError> {
        queries::users::insert_if_absent(self.db()?, user).await
    }
}
