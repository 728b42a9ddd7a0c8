// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User record queries.

use pixrelay_core::RelayError;
use pixrelay_core::types::{TopicChange, TopicId, UserId, UserRecord, UserUpdate};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};

const SELECT_USER: &str = "SELECT user_id, usage_count, topic_id FROM users";

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    let usage: i64 = row.get(1)?;
    Ok(UserRecord {
        user_id: UserId(row.get(0)?),
        usage_count: u64::try_from(usage).unwrap_or(0),
        topic_id: row.get::<_, Option<i32>>(2)?.map(TopicId),
    })
}

fn usage_to_sql(count: u64) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Fetch a user, inserting an empty record on first contact.
pub async fn get_or_create(db: &Database, user: UserId) -> Result<UserRecord, RelayError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO users (user_id) VALUES (?1)",
                params![user.0],
            )?;
            conn.query_row(
                &format!("{SELECT_USER} WHERE user_id = ?1"),
                params![user.0],
                row_to_record,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a user without creating it.
pub async fn get(db: &Database, user: UserId) -> Result<Option<UserRecord>, RelayError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("{SELECT_USER} WHERE user_id = ?1"),
                params![user.0],
                row_to_record,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a partial update in one transaction.
///
/// The usage counter only ever moves up: a smaller value than the stored
/// one is ignored.
pub async fn update(db: &Database, user: UserId, update: UserUpdate) -> Result<(), RelayError> {
    if update.is_empty() {
        return Ok(());
    }
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR IGNORE INTO users (user_id) VALUES (?1)",
                params![user.0],
            )?;
            if let Some(count) = update.usage_count {
                tx.execute(
                    "UPDATE users SET usage_count = MAX(usage_count, ?2) WHERE user_id = ?1",
                    params![user.0, usage_to_sql(count)],
                )?;
            }
            match update.topic {
                Some(TopicChange::Set(topic)) => {
                    tx.execute(
                        "UPDATE users SET topic_id = ?2 WHERE user_id = ?1",
                        params![user.0, topic.0],
                    )?;
                }
                Some(TopicChange::Clear) => {
                    tx.execute(
                        "UPDATE users SET topic_id = NULL WHERE user_id = ?1",
                        params![user.0],
                    )?;
                }
                None => {}
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

/// Add one to the usage counter and return the new value.
pub async fn increment_usage(db: &Database, user: UserId) -> Result<u64, RelayError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO users (user_id) VALUES (?1)",
                params![user.0],
            )?;
            let count: i64 = conn.query_row(
                "UPDATE users SET usage_count = usage_count + 1 WHERE user_id = ?1
                 RETURNING usage_count",
                params![user.0],
                |row| row.get(0),
            )?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
        .map_err(map_tr_err)
}

/// All users ordered by id.
pub async fn list_all(db: &Database) -> Result<Vec<UserRecord>, RelayError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_USER} ORDER BY user_id"))?;
            let rows = stmt.query_map([], row_to_record)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Owner of a thread, if any user currently points at it.
pub async fn find_by_topic(db: &Database, topic: TopicId) -> Result<Option<UserId>, RelayError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT user_id FROM users WHERE topic_id = ?1 ORDER BY user_id LIMIT 1",
                params![topic.0],
                |row| row.get(0).map(UserId),
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Insert an empty record unless the user is already known.
pub async fn insert_if_absent(db: &Database, user: UserId) -> Result<bool, RelayError> {
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO users (user_id) VALUES (?1)",
                params![user.0],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count(db: &Database) -> Result<u64, RelayError> {
    db.connection()
        .call(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
            Ok(u64::try_from(n).unwrap_or(0))
        })
        .await
        .map_err(map_tr_err)
}
