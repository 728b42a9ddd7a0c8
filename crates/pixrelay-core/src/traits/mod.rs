// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod generator;
pub mod messenger;
pub mod storage;

pub use adapter::PluginAdapter;
pub use generator::ImageGenerator;
pub use messenger::Messenger;
pub use storage::UserStore;
