// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for pixrelay integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockMessenger`] - Records every outbound call, with injectable failures
//! - [`MemoryUserStore`] - In-memory [`UserStore`](pixrelay_core::UserStore)
//! - [`MockGenerator`] - Scripted generation outcomes
//! - [`TestHarness`] - A [`PixBot`](pixrelay_agent::PixBot) wired to the mocks

pub mod harness;
pub mod memory_store;
pub mod mock_generator;
pub mod mock_messenger;

pub use harness::TestHarness;
pub use memory_store::MemoryUserStore;
pub use mock_generator::MockGenerator;
pub use mock_messenger::MockMessenger;
