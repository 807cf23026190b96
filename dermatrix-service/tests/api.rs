use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use dermatrix_service::{
    AppConfig, AppState, Classifier, DetectionError, DetectionResult, NormalizedImage,
    ScriptedAssistant, build_router,
    assistant::{CANNED_REPLY, GREETING},
    conditions::{LABEL_COUNT, Label},
    service::sweep_idle_sessions,
};
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::{Value, json};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::ServiceExt;

const BOUNDARY: &str = "dermatrix-test-boundary";

struct StubClassifier {
    label: Label,
    calls: AtomicUsize,
}

impl Classifier for StubClassifier {
    fn classify(&self, _image: &NormalizedImage) -> DetectionResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut probabilities = vec![0.01; LABEL_COUNT];
        probabilities[self.label.index()] = 0.91;
        Ok(probabilities)
    }
}

struct MissingModel;

impl Classifier for MissingModel {
    fn classify(&self, _image: &NormalizedImage) -> DetectionResult<Vec<f32>> {
        Err(DetectionError::ModelLoad("model not found: skin.onnx".to_string()))
    }

    fn is_ready(&self) -> bool {
        false
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        input_size: 32,
        ..AppConfig::default()
    }
}

async fn state_with(config: AppConfig, classifier: Arc<dyn Classifier>) -> AppState {
    AppState::new(config, classifier, Arc::new(ScriptedAssistant::default()))
        .await
        .unwrap()
}

async fn app_with(classifier: Arc<dyn Classifier>) -> Router {
    build_router(state_with(test_config(), classifier).await)
}

fn stub(label: Label) -> Arc<StubClassifier> {
    Arc::new(StubClassifier {
        label,
        calls: AtomicUsize::new(0),
    })
}

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 120])
    });
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, ImageFormat::Png)
        .unwrap();
    buffer.into_inner()
}

fn upload_request(field: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"lesion.png\"\r\nContent-Type: image/png\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/detect")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_detect_melanoma() {
    let classifier = stub(Label::Melanoma);
    let app = app_with(classifier.clone()).await;

    let (status, report) = send(&app, upload_request("file", &png_bytes(120, 80))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["condition"], "Melanoma");
    assert_eq!(report["slug"], "melanoma");
    assert_eq!(report["contagious"], false);
    assert_eq!(report["confidence"], 91.0);
    assert_eq!(report["confidence_source"], "model");
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 1);

    let session_id = report["session_id"].as_str().unwrap();
    let (status, stored) = send(&app, get(&format!("/detections/{session_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored, report);
}

#[tokio::test]
async fn test_detect_rejects_non_image() {
    let classifier = stub(Label::Eczema);
    let app = app_with(classifier.clone()).await;

    let (status, body) = send(&app, upload_request("file", b"%PDF-1.4 not an image")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Error processing image");
    assert_eq!(body["kind"], "invalid_image");
    assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_detect_requires_file_field() {
    let app = app_with(stub(Label::Eczema)).await;
    let (status, _) = send(&app, upload_request("photo", &png_bytes(10, 10))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_model_is_unavailable() {
    let app = app_with(Arc::new(MissingModel)).await;

    let (status, body) = send(&app, upload_request("file", &png_bytes(40, 40))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "model_load");

    let (_, health) = send(&app, get("/health")).await;
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["model_loaded"], false);
}

#[tokio::test]
async fn test_unknown_detection_is_not_found() {
    let app = app_with(stub(Label::Eczema)).await;
    let (status, _) = send(&app, get("/detections/does-not-exist")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_conditions_listing_and_lookup() {
    let app = app_with(stub(Label::Eczema)).await;

    let (status, about) = send(&app, get("/conditions")).await;
    assert_eq!(status, StatusCode::OK);
    let conditions = about["conditions"].as_array().unwrap();
    assert_eq!(conditions.len(), LABEL_COUNT);
    assert_eq!(conditions[0]["name"], "Eczema");
    assert_eq!(conditions[2]["name"], "Melanoma");

    let (status, tinea) = send(&app, get("/conditions/tinea-ringworm")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tinea["contagious"], true);

    let (status, _) = send(&app, get("/conditions/sunburn")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chat_flow() {
    let app = app_with(stub(Label::Eczema)).await;

    let (status, started) = send(&app, post_json("/chat", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["messages"][0]["content"], GREETING);
    let session_id = started["session_id"].as_str().unwrap().to_string();
    let messages_uri = format!("/chat/{session_id}/messages");

    let (status, reply) = send(
        &app,
        post_json(&messages_uri, json!({ "content": "Is eczema contagious?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["reply"], CANNED_REPLY);
    assert_eq!(reply["message_count"], 3);

    let (status, _) = send(&app, post_json(&messages_uri, json!({ "content": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, transcript) = send(&app, get(&format!("/chat/{session_id}"))).await;
    let messages = transcript["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[1]["content"], "Is eczema contagious?");
    assert_eq!(messages[2]["role"], "assistant");
}

#[tokio::test]
async fn test_chat_sessions_are_isolated() {
    let app = app_with(stub(Label::Eczema)).await;

    let (_, first) = send(&app, post_json("/chat", json!({}))).await;
    let (_, second) = send(&app, post_json("/chat", json!({}))).await;
    let first_id = first["session_id"].as_str().unwrap();
    let second_id = second["session_id"].as_str().unwrap();

    send(
        &app,
        post_json(&format!("/chat/{first_id}/messages"), json!({ "content": "hi" })),
    )
    .await;

    let (_, transcript) = send(&app, get(&format!("/chat/{second_id}"))).await;
    assert_eq!(transcript["messages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_end_chat() {
    let app = app_with(stub(Label::Eczema)).await;

    let (_, started) = send(&app, post_json("/chat", json!({}))).await;
    let uri = format!("/chat/{}", started["session_id"].as_str().unwrap());

    let delete = Request::builder()
        .method("DELETE")
        .uri(&uri)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, delete).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ended");

    let (status, _) = send(&app, get(&uri)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_detection_session_is_not_a_chat() {
    let app = app_with(stub(Label::Melanoma)).await;

    let (_, report) = send(&app, upload_request("file", &png_bytes(64, 64))).await;
    let session_id = report["session_id"].as_str().unwrap();

    let (status, _) = send(&app, get(&format!("/chat/{session_id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_turns_are_all_logged() {
    let app = app_with(stub(Label::Eczema)).await;
    let (_, started) = send(&app, post_json("/chat", json!({}))).await;
    let session_id = started["session_id"].as_str().unwrap().to_string();
    let messages_uri = format!("/chat/{session_id}/messages");

    let turns: Vec<_> = (0..16)
        .map(|turn| {
            let app = app.clone();
            let uri = messages_uri.clone();
            tokio::spawn(async move {
                send(&app, post_json(&uri, json!({ "content": format!("question {turn}") }))).await
            })
        })
        .collect();
    for turn in turns {
        let (status, reply) = turn.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["reply"], CANNED_REPLY);
    }

    let (_, transcript) = send(&app, get(&format!("/chat/{session_id}"))).await;
    let messages = transcript["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 33);
    for pair in messages[1..].chunks(2) {
        assert_eq!(pair[0]["role"], "user");
        assert_eq!(pair[1]["role"], "assistant");
    }
    for turn in 0..16 {
        let question = format!("question {turn}");
        let count = messages.iter().filter(|m| m["content"] == question.as_str()).count();
        assert_eq!(count, 1, "{question} logged {count} times");
    }
}

#[tokio::test]
async fn test_full_chat_is_rejected_without_dropping_messages() {
    let config = AppConfig {
        max_chat_messages: 5,
        ..test_config()
    };
    let app = build_router(state_with(config, stub(Label::Eczema)).await);

    let (_, started) = send(&app, post_json("/chat", json!({}))).await;
    let session_id = started["session_id"].as_str().unwrap().to_string();
    let messages_uri = format!("/chat/{session_id}/messages");

    for question in ["first", "second"] {
        let (status, _) = send(&app, post_json(&messages_uri, json!({ "content": question }))).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = send(&app, post_json(&messages_uri, json!({ "content": "third" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, transcript) = send(&app, get(&format!("/chat/{session_id}"))).await;
    let messages = transcript["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0]["content"], GREETING);
}

#[tokio::test]
async fn test_idle_sessions_are_evicted() {
    let state = state_with(test_config(), stub(Label::Melanoma)).await;
    let app = build_router(state.clone());

    let (_, started) = send(&app, post_json("/chat", json!({}))).await;
    let (_, report) = send(&app, upload_request("file", &png_bytes(32, 32))).await;
    let chat_uri = format!("/chat/{}", started["session_id"].as_str().unwrap());
    let detection_uri = format!("/detections/{}", report["session_id"].as_str().unwrap());

    let storage = state.session_storage.as_ref();
    assert_eq!(sweep_idle_sessions(storage, Duration::from_secs(3600)).await, 0);
    assert_eq!(send(&app, get(&chat_uri)).await.0, StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(sweep_idle_sessions(storage, Duration::from_millis(10)).await, 2);

    assert_eq!(send(&app, get(&chat_uri)).await.0, StatusCode::NOT_FOUND);
    assert_eq!(send(&app, get(&detection_uri)).await.0, StatusCode::NOT_FOUND);
}
