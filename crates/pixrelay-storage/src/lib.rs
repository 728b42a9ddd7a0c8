// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for pixrelay.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, typed queries over user records,
//! and the plain-text user id import/export formats.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;
pub mod transfer;

pub use adapter::SqliteUserStore;
pub use database::Database;
pub use transfer::{ImportReport, export_users, import_users, parse_user_ids, render_export};
