//! Integration tests for the Ollama vision backend against a mock HTTP server.

#![cfg(feature = "ollama")]

use image::DynamicImage;
use lumen_core::{Error, VisionProvider};
use lumen_inference::OllamaVisionBackend;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn generate_reply(answer: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "model": "qwen3-vl:8b",
        "response": answer.to_string(),
        "done": true
    }))
}

#[tokio::test]
async fn test_detect_objects_sends_json_mode_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(serde_json::json!({
            "model": "qwen3-vl:8b",
            "stream": false,
            "format": "json"
        })))
        .respond_with(generate_reply(serde_json::json!({
            "objects": [{"label": "laptop", "confidence": 0.87}, {"label": "mug", "confidence": 0.2}]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let backend = OllamaVisionBackend::new(mock_server.uri(), "qwen3-vl:8b".to_string());
    let objects = backend
        .detect_objects(&DynamicImage::new_rgb8(16, 16))
        .await
        .expect("detect_objects should succeed");

    assert_eq!(objects.len(), 2);
    assert_eq!(objects[0].label, "laptop");
    assert!((objects[1].confidence - 0.2).abs() < 1e-6);
}

#[tokio::test]
async fn test_recognize_text_returns_lines() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(generate_reply(serde_json::json!({
            "lines": ["ACME Corp", "Total 12.50"]
        })))
        .mount(&mock_server)
        .await;

    let backend = OllamaVisionBackend::new(mock_server.uri(), "llava".to_string());
    let lines = backend
        .recognize_text(&DynamicImage::new_rgb8(8, 8))
        .await
        .unwrap();

    assert_eq!(lines, vec!["ACME Corp", "Total 12.50"]);
}

#[tokio::test]
async fn test_server_error_maps_to_inference_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("model not loaded"))
        .mount(&mock_server)
        .await;

    let backend = OllamaVisionBackend::new(mock_server.uri(), "llava".to_string());
    let err = backend
        .classify_scene(&DynamicImage::new_rgb8(8, 8))
        .await
        .unwrap_err();

    match err {
        Error::Inference(msg) => assert!(msg.contains("model not loaded")),
        other => panic!("Expected Inference error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_health_check() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"models": []})))
        .mount(&mock_server)
        .await;

    let backend = OllamaVisionBackend::new(mock_server.uri(), "llava".to_string());
    assert!(backend.health_check().await.unwrap());

    let offline = OllamaVisionBackend::new("http://127.0.0.1:9".to_string(), "llava".to_string());
    assert!(!offline.health_check().await.unwrap());
}
