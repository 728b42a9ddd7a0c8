// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the image generation API.
//!
//! Provides [`ImageApiClient`] which builds the query, applies the retry
//! budget to transient failures, and issues the header-only probes used
//! for size fallback and URL verification.

use std::time::Duration;

use pixrelay_config::model::ImageApiConfig;
use pixrelay_core::RelayError;
use pixrelay_core::types::GenerationRequest;
use reqwest::header::CONTENT_LENGTH;
use tracing::{debug, warn};

use crate::types::ApiReply;

/// HTTP client for the generation endpoint.
#[derive(Debug, Clone)]
pub struct ImageApiClient {
    client: reqwest::Client,
    base_url: reqwest::Url,
    max_attempts: u32,
    retry_delay: Duration,
    request_timeout: Duration,
    probe_timeout: Duration,
}

impl ImageApiClient {
    /// Creates a client from the `[image_api]` configuration section.
    pub fn new(config: &ImageApiConfig) -> Result<Self, RelayError> {
        let base_url = reqwest::Url::parse(config.base_url.trim()).map_err(|e| {
            RelayError::Config(format!("invalid image_api.base_url: {e}"))
        })?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| RelayError::Upstream {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url,
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
        })
    }

    /// Overrides the per-request timeouts.
    pub fn with_timeouts(mut self, request: Duration, probe: Duration) -> Self {
        self.request_timeout = request;
        self.probe_timeout = probe;
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Full request URL carrying `prompt`, `improve` and `format`.
    pub fn request_url(&self, request: &GenerationRequest) -> Result<reqwest::Url, RelayError> {
        let improve = if request.improve { "true" } else { "false" };
        let format = request.dimension.to_string();
        reqwest::Url::parse_with_params(
            self.base_url.as_str(),
            [
                ("prompt", request.prompt.as_str()),
                ("improve", improve),
                ("format", format.as_str()),
            ],
        )
        .map_err(|e| RelayError::Config(format!("cannot build image API URL: {e}")))
    }

    /// Requests an image, retrying transient failures up to the attempt budget.
    ///
    /// Returns the last transient error once the budget is exhausted; any
    /// other error is returned immediately.
    pub async fn request_image(&self, request: &GenerationRequest) -> Result<ApiReply, RelayError> {
        let url = self.request_url(request)?;
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.retry_delay).await;
            }

            match self.attempt(url.clone()).await {
                Ok(reply) => {
                    debug!(attempt, "image API replied");
                    return Ok(reply);
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "image API attempt failed, will retry"
                    );
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| RelayError::TransientNetwork {
            message: "image request failed after retries".into(),
            source: None,
        }))
    }

    async fn attempt(&self, url: reqwest::Url) -> Result<ApiReply, RelayError> {
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = format!("image API returned {status}: {body}");
            return Err(if is_transient_status(status) {
                RelayError::TransientNetwork {
                    message,
                    source: None,
                }
            } else {
                RelayError::Upstream {
                    message,
                    source: None,
                }
            });
        }

        response
            .json::<ApiReply>()
            .await
            .map_err(classify_reqwest_error)
    }

    /// Image size in KB from a HEAD probe's `Content-Length`, or `0.0`.
    ///
    /// Only a `200 OK` with a parsable header counts; every failure is logged
    /// and yields zero.
    pub async fn probe_size_kb(&self, image_url: &str) -> f64 {
        match self.head(image_url).await {
            Ok(response) if response.status() == reqwest::StatusCode::OK => response
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(|bytes| bytes as f64 / 1024.0)
                .unwrap_or(0.0),
            Ok(response) => {
                debug!(status = %response.status(), "size probe returned non-200");
                0.0
            }
            Err(e) => {
                warn!(error = %e, "image size probe failed");
                0.0
            }
        }
    }

    /// True when a HEAD probe of `image_url` returns a success status.
    pub async fn is_reachable(&self, image_url: &str) -> bool {
        match self.head(image_url).await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                warn!(error = %e, "image URL verification failed");
                false
            }
        }
    }

    async fn head(&self, url: &str) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .head(url)
            .timeout(self.probe_timeout)
            .send()
            .await
    }
}

/// Returns true for HTTP status codes worth another attempt.
fn is_transient_status(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Sorts a transport failure into the retryable or the fatal bucket.
fn classify_reqwest_error(e: reqwest::Error) -> RelayError {
    if e.is_decode() || e.is_builder() || e.is_redirect() {
        return RelayError::Upstream {
            message: format!("image API response unusable: {e}"),
            source: Some(Box::new(e)),
        };
    }
    if e.is_timeout() || e.is_connect() || e.is_request() || e.is_body() {
        return RelayError::TransientNetwork {
            message: format!("image API request failed: {e}"),
            source: Some(Box::new(e)),
        };
    }
    RelayError::Upstream {
        message: format!("image API request failed: {e}"),
        source: Some(Box::new(e)),
    }
}
