// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Generation request pipeline.

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use pixrelay_config::model::ImageApiConfig;
use pixrelay_core::types::{GenerationOutcome, GenerationRequest, round2};
use pixrelay_core::{AdapterType, HealthStatus, ImageGenerator, PluginAdapter, RelayError};

use crate::client::ImageApiClient;
use crate::size::parse_size_kb;

/// Runs one generation request end to end and classifies the result.
pub struct GenerationPipeline {
    client: ImageApiClient,
    verify_image_url: bool,
}

impl GenerationPipeline {
    pub fn new(config: &ImageApiConfig) -> Result<Self, RelayError> {
        Ok(Self::with_client(
            ImageApiClient::new(config)?,
            config.verify_image_url,
        ))
    }

    pub fn with_client(client: ImageApiClient, verify_image_url: bool) -> Self {
        Self {
            client,
            verify_image_url,
        }
    }

    pub fn client(&self) -> &ImageApiClient {
        &self.client
    }

    pub fn verifies_urls(&self) -> bool {
        self.verify_image_url
    }

    /// Produce exactly one terminal outcome for `request`.
    pub async fn run(&self, request: &GenerationRequest) -> GenerationOutcome {
        let started = Instant::now();

        let reply = match self.client.request_image(request).await {
            Ok(reply) => reply,
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "image generation unavailable after retries");
                return GenerationOutcome::Unavailable;
            }
            Err(e) => {
                warn!(error = %e, "image generation failed");
                return GenerationOutcome::Unexpected(e.to_string());
            }
        };
        let elapsed_secs = round2(started.elapsed().as_secs_f64());

        let Some(image_url) = reply.image_url().map(str::to_owned) else {
            info!("image API reply carried no image URL");
            return GenerationOutcome::NoImage;
        };

        let mut size_kb = parse_size_kb(reply.image_size.as_deref().unwrap_or_default());
        if size_kb == 0.0 {
            debug!(image_url = %image_url, "size descriptor unusable, probing headers");
            size_kb = self.client.probe_size_kb(&image_url).await;
        }
        let size_kb = round2(size_kb);

        if self.verify_image_url && !self.client.is_reachable(&image_url).await {
            info!(image_url = %image_url, "generated image URL failed verification");
            return GenerationOutcome::Invalid;
        }

        GenerationOutcome::Delivered {
            image_url,
            elapsed_secs,
            size_kb,
        }
    }
}

#[async_trait]
impl PluginAdapter for GenerationPipeline {
    fn name(&self) -> &str {
        "image-api"
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
impl ImageGenerator for GenerationPipeline {
    async fn generate(&self, request: &GenerationRequest) -> GenerationOutcome {
        self.run(request).await
    }
}
