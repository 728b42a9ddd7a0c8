// SPDX-FileCopyrightText: 2026 Pixrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outcome classification of the generation pipeline against a mock API.

use pixrelay_config::model::ImageApiConfig;
use pixrelay_core::ImageGenerator;
use pixrelay_core::types::{Dimension, GenerationOutcome, GenerationRequest};
use pixrelay_imagegen::GenerationPipeline;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pipeline(server: &MockServer, verify: bool) -> GenerationPipeline {
    let config = ImageApiConfig {
        base_url: format!("{}/generate", server.uri()),
        verify_image_url: verify,
        retry_delay_ms: 0,
        ..ImageApiConfig::default()
    };
    GenerationPipeline::new(&config).unwrap()
}

fn request() -> GenerationRequest {
    GenerationRequest {
        prompt: "a red fox".into(),
        dimension: Dimension::Square,
        improve: false,
    }
}

#[tokio::test]
async fn three_transient_failures_are_unavailable_after_three_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let outcome = pipeline(&server, false).generate(&request()).await;
    assert_eq!(outcome, GenerationOutcome::Unavailable);
}

#[tokio::test]
async fn two_transient_failures_then_success_is_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "image_url": "https://cdn.example.com/fox.png",
            "image_size": "1.5 MB"
        })))
        .expect(1)
        .mount(&server)
        .await;

    match pipeline(&server, false).generate(&request()).await {
        GenerationOutcome::Delivered {
            image_url,
            size_kb,
            elapsed_secs,
        } => {
            assert_eq!(image_url, "https://cdn.example.com/fox.png");
            assert_eq!(size_kb, 1536.0);
            assert!(elapsed_secs >= 0.0);
        }
        other => panic!("expected Delivered, got {other:?}"),
    }
}

#[tokio::test]
async fn non_transient_status_is_unexpected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = pipeline(&server, false).generate(&request()).await;
    assert!(matches!(outcome, GenerationOutcome::Unexpected(_)), "got {outcome:?}");
    assert_eq!(outcome.failure_reason(), Some("Unexpected error"));
}

#[tokio::test]
async fn missing_image_url_is_no_image() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"image_size": "10 KB"})))
        .mount(&server)
        .await;

    let outcome = pipeline(&server, false).generate(&request()).await;
    assert_eq!(outcome, GenerationOutcome::NoImage);
}

#[tokio::test]
async fn unknown_size_falls_back_to_head_probe() {
    let server = MockServer::start().await;
    let image_url = format!("{}/images/fox.png", server.uri());
    Mock::given(method("GET"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "image_url": image_url,
            "image_size": "unknown"
        })))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/images/fox.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-length", "1536")
                .set_body_bytes(vec![0u8; 1536]),
        )
        .expect(1)
        .mount(&server)
        .await;

    match pipeline(&server, false).generate(&request()).await {
        GenerationOutcome::Delivered { size_kb, .. } => assert_eq!(size_kb, 1.5),
        other => panic!("expected Delivered, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_verification_is_invalid() {
    let server = MockServer::start().await;
    let image_url = format!("{}/images/missing.png", server.uri());
    Mock::given(method("GET"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "image_url": image_url,
            "image_size": "20 KB"
        })))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/images/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = pipeline(&server, true).generate(&request()).await;
    assert_eq!(outcome, GenerationOutcome::Invalid);
}

#[tokio::test]
async fn successful_verification_is_delivered() {
    let server = MockServer::start().await;
    let image_url = format!("{}/images/ok.png", server.uri());
    Mock::given(method("GET"))
        .and(path("/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "image_url": image_url,
            "image_size": "20 KB"
        })))
        .mount(&server)
        .await;
    Mock::given(method("HEAD"))
        .and(path("/images/ok.png"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    match pipeline(&server, true).generate(&request()).await {
        GenerationOutcome::Delivered { size_kb, .. } => assert_eq!(size_kb, 20.0),
        other => panic!("expected Delivered, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_api_is_unavailable() {
    // Nothing listens on port 9 of the loopback interface.
    let config = ImageApiConfig {
        base_url: "http://127.0.0.1:9/".into(),
        retry_delay_ms: 0,
        ..ImageApiConfig::default()
    };
    let outcome = GenerationPipeline::new(&config)
        .unwrap()
        .generate(&request())
        .await;
    assert_eq!(outcome, GenerationOutcome::Unavailable);
}
