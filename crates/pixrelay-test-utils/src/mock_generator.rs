// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock image generator returning scripted outcomes.

use std::collections::VecDeque;

use async_trait::async_trait;
use tokio::sync::Mutex;

use pixrelay_core::types::{
    AdapterType, GenerationOutcome, GenerationRequest, HealthStatus,
};
use pixrelay_core::{ImageGenerator, PluginAdapter, RelayError};

/// Outcome returned once the script runs out.
pub fn delivered() -> GenerationOutcome {
    GenerationOutcome::Delivered {
        image_url: "https://images.test/generated.png".to_string(),
        elapsed_secs: 1.25,
        size_kb: 512.0,
    }
}

/// A generator that records requests and pops outcomes from a script.
pub struct MockGenerator {
    outcomes: Mutex<VecDeque<GenerationOutcome>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    /// Always delivers [`delivered()`].
    pub fn new() -> Self {
        Self::with_outcomes(Vec::new())
    }

    pub fn with_outcomes(outcomes: Vec<GenerationOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockGenerator {
    fn name(&self) -> &str {
        "mock-generator"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generator
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        Ok(())
    }
}

#[async_trait]
impl ImageGenerator for MockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        self.requests.lock().await.push(request.clone());
        self.outcomes
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(delivered)
    }
}
