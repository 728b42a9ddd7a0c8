// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use pixrelay_core::RelayError;
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::migrations;

const PRAGMAS: &str = "PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA busy_timeout = 5000;
PRAGMA foreign_keys = ON;";

/// Handle to the single SQLite connection.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path` and apply migrations.
    pub async fn open(path: &str) -> Result<Self, RelayError> {
        let parent = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| RelayError::Storage {
                    source: Box::new(e),
                })?;
        }

        let conn = Connection::open(path)
            .await
            .map_err(|e| RelayError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare().await?;
        debug!(path, "database opened");
        Ok(db)
    }

    /// In-memory database with the full schema, for tests and dry runs.
    pub async fn open_in_memory() -> Result<Self, RelayError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RelayError::Storage {
                source: Box::new(e),
            })?;
        let db = Self { conn };
        db.prepare().await?;
        Ok(db)
    }

    async fn prepare(&self) -> Result<(), RelayError> {
        self.conn
            .call(|conn| -> Result<Result<(), RelayError>, rusqlite::Error> {
                conn.execute_batch(PRAGMAS)?;
                Ok(migrations::run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Checkpoint the WAL so the main database file is self-contained.
    pub async fn checkpoint(&self) -> Result<(), RelayError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }
}

/// Map a tokio-rusqlite error into the storage variant of [`RelayError`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> RelayError {
    RelayError::Storage {
        source: Box::new(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_parent_dirs_and_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/deeper/users.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        assert!(path.exists());

        let tables: i64 = db
            .connection()
            .call(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'users'",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(map_tr_err)
            .unwrap();
        assert_eq!(tables, 1);
    }

    #[tokio::test]
    async fn reopening_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.db");
        let path = path.to_str().unwrap();
        Database::open(path).await.unwrap().checkpoint().await.unwrap();
        Database::open(path).await.unwrap();
    }
}
