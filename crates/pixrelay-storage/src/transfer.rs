// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text user id lists.
//!
//! Export format:
//!
//! ```text
//! Number of users: 2
//!
//! User IDs:
//! 1001
//! 1002
//! ```
//!
//! Import reads every integer line after the `User IDs:` header; anything
//! before the header is ignored.

use std::path::Path;

use pixrelay_core::types::{UserId, UserRecord};
use pixrelay_core::{RelayError, UserStore};
use tracing::{debug, info, warn};

const HEADER: &str = "User IDs:";

/// Result of a bulk import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Valid ids found in the file.
    pub parsed: usize,
    /// Ids that were not yet known and got a fresh record.
    pub inserted: usize,
    /// Lines after the header that were not integers.
    pub skipped: usize,
}

/// Extract user ids from an import file, returning ids and the skipped line count.
pub fn parse_user_ids(content: &str) -> (Vec<UserId>, usize) {
    let mut ids = Vec::new();
    let mut skipped = 0;
    let mut collecting = false;

    for line in content.lines().map(str::trim) {
        if line == HEADER {
            collecting = true;
            continue;
        }
        if !collecting || line.is_empty() {
            continue;
        }
        match line.parse::<i64>() {
            Ok(id) => ids.push(UserId(id)),
            Err(_) => {
                warn!(line, "invalid user id in import file");
                skipped += 1;
            }
        }
    }

    (ids, skipped)
}

/// Render the export format for the given records.
pub fn render_export(users: &[UserRecord]) -> String {
    let ids = users
        .iter()
        .map(|u| u.user_id.to_string())
        .collect::<Vec<_>>()
        .join("\n");
    format!("Number of users: {}\n\n{HEADER}\n{ids}", users.len())
}

/// Insert every id listed in `path` that the store does not know yet.
///
/// A missing file is not an error and yields an empty report.
pub async fn import_users<S>(store: &S, path: &Path) -> Result<ImportReport, RelayError>
where
    S: UserStore + ?Sized,
{
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "no user list found, skipping import");
            return Ok(ImportReport::default());
        }
        Err(e) => {
            return Err(RelayError::Storage {
                source: Box::new(e),
            });
        }
    };

    let (ids, skipped) = parse_user_ids(&content);
    let mut report = ImportReport {
        parsed: ids.len(),
        skipped,
        ..ImportReport::default()
    };
    for id in ids {
        if store.insert_if_absent(id).await? {
            debug!(user_id = %id, "imported user");
            report.inserted += 1;
        }
    }

    info!(
        path = %path.display(),
        parsed = report.parsed,
        inserted = report.inserted,
        skipped = report.skipped,
        "user import complete"
    );
    Ok(report)
}

/// Write every known user to `path`, creating parent directories as needed.
/// Returns the number of users written.
pub async fn export_users<S>(store: &S, path: &Path) -> Result<usize, RelayError>
where
    S: UserStore + ?Sized,
{
    let users = store.list_all().await?;
    let io_err = |e: std::io::Error| RelayError::Storage {
        source: Box::new(e),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(path, render_export(&users))
        .await
        .map_err(io_err)?;

    info!(path = %path.display(), count = users.len(), "user list exported");
    Ok(users.len())
}
