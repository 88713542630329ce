//! Generation operations against a mocked Gemini endpoint.

mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tokio_util::sync::CancellationToken;

use common::{fast_policy, RecordingRegistry};
use keyrotor::error::KeyRotorError;
use keyrotor::generation::Generator;
use keyrotor::retry::Orchestrator;
use keyrotor::types::{
    AspectRatio, EditRequest, ImageRequest, InlineImage, TextRequest, VideoRequest,
};

const PNG_B64: &str = "iVBORw0KGgo=";

fn generator(server: &MockServer, registry: &RecordingRegistry) -> Generator {
    let orchestrator = Orchestrator::new(registry.shared())
        .with_base_url(server.uri())
        .with_policy(fast_policy(5));
    Generator::new(orchestrator).with_poll_interval(Duration::from_millis(1))
}

fn image_content_response() -> serde_json::Value {
    json!({
        "candidates": [{
            "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": PNG_B64 } }
            ]},
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn image_uses_predict_on_the_primary_model() {
    let server = MockServer::start().await;
    let registry = RecordingRegistry::with_keys(&["key-AAAA"]);

    Mock::given(method("POST"))
        .and(path("/models/imagen-4.0-generate-001:predict"))
        .and(header("x-goog-api-key", "key-AAAA"))
        .and(body_string_contains("\"aspectRatio\":\"16:9\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [
                { "bytesBase64Encoded": PNG_B64, "mimeType": "image/png" },
                { "bytesBase64Encoded": PNG_B64, "mimeType": "image/png" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = ImageRequest::builder()
        .prompt("a lighthouse at dusk")
        .aspect_ratio(AspectRatio::Landscape)
        .count(2)
        .build();
    let result = generator(&server, &registry)
        .generate_image(&request)
        .await
        .unwrap();

    assert_eq!(result.images.len(), 2);
    assert_eq!(result.model, "imagen-4.0-generate-001");
    assert!(!result.fell_back);
}

#[tokio::test]
async fn image_rotates_keys_on_quota_errors() {
    let server = MockServer::start().await;
    let registry = RecordingRegistry::with_keys(&["key-AAAA", "key-BBBB"]);

    Mock::given(method("POST"))
        .and(path("/models/imagen-4.0-generate-001:predict"))
        .and(header("x-goog-api-key", "key-AAAA"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "message": "Resource has been exhausted (e.g. check quota).", "status": "RESOURCE_EXHAUSTED" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/models/imagen-4.0-generate-001:predict"))
        .and(header("x-goog-api-key", "key-BBBB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "predictions": [{ "bytesBase64Encoded": PNG_B64, "mimeType": "image/png" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = ImageRequest::builder().prompt("a red fox").build();
    let result = generator(&server, &registry)
        .generate_image(&request)
        .await
        .unwrap();

    assert_eq!(result.images.len(), 1);
    assert_eq!(registry.reports(), vec!["key-AAAA"]);
}

#[tokio::test]
async fn billing_restriction_falls_back_exactly_once() {
    let server = MockServer::start().await;
    let registry = RecordingRegistry::with_keys(&["key-AAAA", "key-BBBB"]);

    Mock::given(method("POST"))
        .and(path("/models/imagen-4.0-generate-001:predict"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "Imagen API is only accessible to billed users at this time.", "status": "INVALID_ARGUMENT" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash-image:generateContent"))
        .and(body_string_contains("\"responseModalities\":[\"IMAGE\"]"))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_content_response()))
        .expect(1)
        .mount(&server)
        .await;

    let request = ImageRequest::builder().prompt("a red fox").build();
    let result = generator(&server, &registry)
        .generate_image(&request)
        .await
        .unwrap();

    assert!(result.fell_back);
    assert_eq!(result.model, "gemini-2.5-flash-image");
    assert_eq!(result.images[0].data, PNG_B64);
    assert!(registry.reports().is_empty());
}

#[tokio::test]
async fn fallback_failure_is_returned_unchanged() {
    let server = MockServer::start().await;
    let registry = RecordingRegistry::with_keys(&["key-AAAA"]);

    Mock::given(method("POST"))
        .and(path("/models/imagen-4.0-generate-001:predict"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "Imagen API is only accessible to billed users at this time." }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash-image:generateContent"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": { "code": 400, "message": "Image generation requires billing to be enabled." }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = ImageRequest::builder().prompt("a red fox").build();
    let err = generator(&server, &registry)
        .generate_image(&request)
        .await
        .unwrap_err();

    assert!(matches!(err, KeyRotorError::BillingRestricted { .. }));
}

#[tokio::test]
async fn missing_primary_model_does_not_use_the_fallback() {
    let server = MockServer::start().await;
    let registry = RecordingRegistry::with_keys(&["key-AAAA"]);

    Mock::given(method("POST"))
        .and(path("/models/imagen-4.0-generate-001:predict"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": 404, "message": "models/imagen-4.0-generate-001 is not found for API version v1beta.", "status": "NOT_FOUND" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash-image:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_content_response()))
        .expect(0)
        .mount(&server)
        .await;

    let request = ImageRequest::builder().prompt("a red fox").build();
    let err = generator(&server, &registry)
        .generate_image(&request)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        KeyRotorError::Unclassified { status: Some(404), .. }
    ));
    assert!(registry.reports().is_empty());
}

#[tokio::test]
async fn exhausted_quota_does_not_use_the_fallback() {
    let server = MockServer::start().await;
    let registry = RecordingRegistry::with_keys(&["key-AAAA", "key-BBBB"]);

    Mock::given(method("POST"))
        .and(path("/models/imagen-4.0-generate-001:predict"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "code": 429, "message": "Resource has been exhausted (e.g. check quota).", "status": "RESOURCE_EXHAUSTED" }
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash-image:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(image_content_response()))
        .expect(0)
        .mount(&server)
        .await;

    let orchestrator = Orchestrator::new(registry.shared())
        .with_base_url(server.uri())
        .with_policy(fast_policy(2));
    let err = Generator::new(orchestrator)
        .generate_image(&ImageRequest::builder().prompt("a red fox").build())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        KeyRotorError::QuotaExceededRetriesExhausted { attempts: 2, .. }
    ));
    assert_eq!(registry.reports(), vec!["key-AAAA", "key-BBBB"]);
}

#[tokio::test]
async fn edit_sends_references_mask_and_prompt() {
    let server = MockServer::start().await;
    let registry = RecordingRegistry::with_keys(&["key-AAAA"]);
    let reference = InlineImage::from_bytes("image/png", b"living-room");
    let mask = InlineImage::from_bytes("image/png", b"sofa-mask");

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash-image:generateContent"))
        .and(body_string_contains(reference.data.as_str()))
        .and(body_string_contains(mask.data.as_str()))
        .and(body_string_contains("replace the sofa"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "Swapped the sofa." },
                    { "inlineData": { "mimeType": "image/png", "data": PNG_B64 } }
                ]}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = EditRequest::builder()
        .prompt("replace the sofa")
        .references(vec![reference])
        .mask(mask)
        .build();
    let result = generator(&server, &registry)
        .edit_image(&request)
        .await
        .unwrap();

    assert_eq!(result.images.len(), 1);
    assert_eq!(result.text.as_deref(), Some("Swapped the sofa."));
    assert!(!result.fell_back);
}

#[tokio::test]
async fn video_polls_until_done_and_downloads_with_the_same_key() {
    let server = MockServer::start().await;
    let registry = RecordingRegistry::with_keys(&["key-AAAA", "key-BBBB"]);
    let operation = "models/veo-3.0-generate-001/operations/op-1";
    let video_uri = format!("{}/files/clip.mp4:download", server.uri());

    Mock::given(method("POST"))
        .and(path("/models/veo-3.0-generate-001:predictLongRunning"))
        .and(header("x-goog-api-key", "key-AAAA"))
        .and(body_string_contains("\"negativePrompt\":\"captions\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": operation })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/{operation}")))
        .and(header("x-goog-api-key", "key-AAAA"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "name": operation, "done": false })),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/{operation}")))
        .and(header("x-goog-api-key", "key-AAAA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": operation,
            "done": true,
            "response": { "generateVideoResponse": {
                "generatedSamples": [{ "video": { "uri": video_uri } }]
            }}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/clip.mp4:download"))
        .and(header("x-goog-api-key", "key-AAAA"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"mp4-bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let request = VideoRequest::builder()
        .prompt("waves at sunrise")
        .negative_prompt("captions")
        .build();
    let video = generator(&server, &registry)
        .generate_video(&request)
        .await
        .unwrap();

    assert_eq!(video.bytes, b"mp4-bytes".to_vec());
    assert_eq!(video.mime_type, "video/mp4");
    assert_eq!(video.model, "veo-3.0-generate-001");
    assert_eq!(video.source_uri, video_uri);
}

#[tokio::test]
async fn long_running_video_job_is_polled_to_completion_without_resubmitting() {
    let server = MockServer::start().await;
    let registry = RecordingRegistry::with_keys(&["key-AAAA", "key-BBBB"]);
    let operation = "models/veo-3.0-generate-001/operations/op-slow";
    let video_uri = format!("{}/files/slow.mp4", server.uri());

    Mock::given(method("POST"))
        .and(path("/models/veo-3.0-generate-001:predictLongRunning"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": operation })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/{operation}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "name": operation, "done": false })),
        )
        .up_to_n_times(250)
        .expect(250)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/{operation}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": operation,
            "done": true,
            "response": { "generateVideoResponse": {
                "generatedSamples": [{ "video": { "uri": video_uri } }]
            }}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/slow.mp4"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"slow-clip".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let video = generator(&server, &registry)
        .generate_video(&VideoRequest::builder().prompt("glacier calving").build())
        .await
        .unwrap();

    assert_eq!(video.bytes, b"slow-clip".to_vec());
    assert!(registry.reports().is_empty());
}

#[tokio::test]
async fn cancellation_stops_a_pending_video_job() {
    let server = MockServer::start().await;
    let registry = RecordingRegistry::with_keys(&["key-AAAA"]);
    let operation = "models/veo-3.0-generate-001/operations/op-stuck";

    Mock::given(method("POST"))
        .and(path("/models/veo-3.0-generate-001:predictLongRunning"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": operation })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/{operation}")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "name": operation, "done": false })),
        )
        .mount(&server)
        .await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let err = generator(&server, &registry)
        .with_cancellation(cancel)
        .generate_video(&VideoRequest::builder().prompt("waves").build())
        .await
        .unwrap_err();

    assert!(matches!(err, KeyRotorError::Cancelled));
    assert!(registry.reports().is_empty());
}

#[tokio::test]
async fn video_operation_quota_error_rotates_to_a_new_key() {
    let server = MockServer::start().await;
    let registry = RecordingRegistry::with_keys(&["key-AAAA", "key-BBBB"]);
    let video_uri = format!("{}/files/clip.mp4", server.uri());

    Mock::given(method("POST"))
        .and(path("/models/veo-3.0-generate-001:predictLongRunning"))
        .and(header("x-goog-api-key", "key-AAAA"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "operations/op-a",
            "done": true,
            "error": { "code": 429, "message": "Quota exceeded for video generation" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/models/veo-3.0-generate-001:predictLongRunning"))
        .and(header("x-goog-api-key", "key-BBBB"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "operations/op-b",
            "done": true,
            "response": { "generateVideoResponse": {
                "generatedSamples": [{ "video": { "uri": video_uri } }]
            }}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/clip.mp4"))
        .and(header("x-goog-api-key", "key-BBBB"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"clip".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let request = VideoRequest::builder().prompt("waves").build();
    let video = generator(&server, &registry)
        .generate_video(&request)
        .await
        .unwrap();

    assert_eq!(video.bytes, b"clip".to_vec());
    assert_eq!(registry.reports(), vec!["key-AAAA"]);
}

#[tokio::test]
async fn text_and_enhance_use_the_text_model() {
    let server = MockServer::start().await;
    let registry = RecordingRegistry::with_keys(&["key-AAAA"]);

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.5-flash:generateContent"))
        .and(body_string_contains("systemInstruction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{ "content": { "parts": [{ "text": "  A detailed fox.\n" }] } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let enhanced = generator(&server, &registry)
        .enhance_prompt("fox")
        .await
        .unwrap();
    assert_eq!(enhanced, "A detailed fox.");

    let err = generator(&server, &registry)
        .generate_text(&TextRequest::builder().prompt("   ").build())
        .await
        .unwrap_err();
    assert!(matches!(err, KeyRotorError::InvalidArgument(_)));
}

#[tokio::test]
async fn empty_prompt_is_rejected_before_leasing() {
    let server = MockServer::start().await;
    let registry = RecordingRegistry::with_keys(&["key-AAAA"]);

    let err = generator(&server, &registry)
        .generate_image(&ImageRequest::builder().prompt("").build())
        .await
        .unwrap_err();

    assert!(matches!(err, KeyRotorError::InvalidArgument(_)));
    assert_eq!(registry.acquires(), 0);
}
