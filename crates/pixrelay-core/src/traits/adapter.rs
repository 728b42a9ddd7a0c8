// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait shared by every adapter.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::types::{AdapterType, HealthStatus};

/// Identity, health and lifecycle hooks common to all adapters.
#[async_trait]
pub trait PluginAdapter: Send + Sync {
    /// Short adapter name used in logs (e.g. "telegram", "sqlite").
    fn name(&self) -> &str;

    /// Adapter implementation version.
    fn version(&self) -> semver::Version;

    /// The kind of adapter.
    fn adapter_type(&self) -> AdapterType;

    /// Reports whether the adapter can currently serve requests.
    async fn health_check(&self) -> Result<HealthStatus, RelayError>;

    /// Releases resources held by the adapter.
    async fn shutdown(&self) -> Result<(), RelayError>;
}
