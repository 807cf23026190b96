use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, Path, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::{Next, from_fn},
    response::{Json, Response},
    routing::{get, post},
};
use dermatrix_flow::{
    ExecutionStatus, FlowRunner, GraphError, InMemorySessionStorage, Session, SessionStorage,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::{
    assistant::{Assistant, CHAT_DISCLAIMER, ScriptedAssistant},
    classifier::{Classifier, LazyClassifier},
    conditions::{self, ABOUT_TEXT, MEDICAL_DISCLAIMER},
    config::AppConfig,
    error::DetectionError,
    models::{
        AboutResponse, ChatReplyResponse, ChatRequest, ChatSessionResponse, ConditionView,
        DetectionReport,
    },
    tasks::session_keys,
    workflow::{
        CHAT_GRAPH, DETECTION_GRAPH, create_chat_session, create_detection_session,
        create_flow_runner,
    },
};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

const PROCESSING_ERROR: &str = "Error processing image";

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

/// One user-visible message for every detection failure; the kind and status vary
fn detection_error(err: &GraphError) -> ApiError {
    let Some(detection) = err.downcast_ref::<DetectionError>() else {
        return internal_error(PROCESSING_ERROR, &err.to_string());
    };

    let status = match detection {
        DetectionError::InvalidImage(_) => StatusCode::BAD_REQUEST,
        DetectionError::ModelLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
        DetectionError::Inference(_) | DetectionError::UnknownLabel(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(json!({
            "error": PROCESSING_ERROR,
            "kind": detection.kind(),
            "details": detection.to_string()
        })),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub session_storage: Arc<dyn SessionStorage>,
    pub flow_runner: FlowRunner,
    pub classifier: Arc<dyn Classifier>,
    pub assistant: Arc<dyn Assistant>,
}

impl AppState {
    pub async fn new(
        config: AppConfig,
        classifier: Arc<dyn Classifier>,
        assistant: Arc<dyn Assistant>,
    ) -> anyhow::Result<Self> {
        let session_storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());
        let flow_runner = create_flow_runner(
            classifier.clone(),
            assistant.clone(),
            config.input_size,
            config.confidence,
            session_storage.clone(),
        )
        .await?;

        Ok(Self {
            config: Arc::new(config),
            session_storage,
            flow_runner,
            classifier,
            assistant,
        })
    }
}

pub async fn create_app(config: &AppConfig) -> anyhow::Result<Router> {
    let classifier = Arc::new(LazyClassifier::new(
        config.model_path.clone(),
        config.input_size,
    ));
    if config.preload_model {
        preload_model(classifier.clone()).await;
    }

    let state = AppState::new(
        config.clone(),
        classifier,
        Arc::new(ScriptedAssistant::default()),
    )
    .await?;
    spawn_session_sweeper(state.session_storage.clone(), config.session_ttl);
    Ok(build_router(state))
}

/// Evict sessions idle for longer than `ttl`; returns how many were removed
pub async fn sweep_idle_sessions(storage: &dyn SessionStorage, ttl: Duration) -> usize {
    let Ok(max_idle) = chrono::Duration::from_std(ttl) else {
        return 0;
    };
    match storage.evict_idle(chrono::Utc::now() - max_idle).await {
        Ok(0) => 0,
        Ok(evicted) => {
            info!("Evicted {} idle sessions", evicted);
            evicted
        }
        Err(e) => {
            error!("Session sweep failed: {}", e);
            0
        }
    }
}

fn spawn_session_sweeper(storage: Arc<dyn SessionStorage>, ttl: Duration) {
    let period = (ttl / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            sweep_idle_sessions(storage.as_ref(), ttl).await;
        }
    });
}

/// Warm the model at startup. A failure only logs; requests retry the load.
async fn preload_model(classifier: Arc<LazyClassifier>) {
    let path = classifier.source().to_string();
    match tokio::task::spawn_blocking(move || classifier.get().map(|_| ())).await {
        Ok(Ok(())) => info!("Model preloaded from {}", path),
        Ok(Err(e)) => warn!("Model preload failed: {}", e),
        Err(e) => error!("Model preload task panicked: {}", e),
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/detect", post(detect))
        .route("/detections/{session_id}", get(get_detection))
        .route("/conditions", get(list_conditions))
        .route("/conditions/{name}", get(get_condition))
        .route("/chat", post(start_chat))
        .route("/chat/{session_id}", get(get_chat).delete(end_chat))
        .route("/chat/{session_id}/messages", post(send_chat_message))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Tag each request with a correlation id, in a span and on the response
async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    let header = HeaderValue::from_str(&correlation_id).ok();

    if let Some(value) = header.clone() {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header {
        response.headers_mut().insert("x-correlation-id", value);
    }
    response
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Dermatrix Skin Condition Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Skin lesion classification with condition information and a help chat",
        "endpoints": {
            "POST /detect": "Upload a JPEG or PNG image (multipart field 'file')",
            "GET /detections/{session_id}": "Get a stored detection report",
            "GET /conditions": "List all detectable conditions",
            "GET /conditions/{name}": "Get one condition by name or slug",
            "POST /chat": "Start a chat session",
            "GET /chat/{session_id}": "Get the chat transcript",
            "POST /chat/{session_id}/messages": "Send a chat message",
            "DELETE /chat/{session_id}": "End a chat session",
            "GET /health": "Health check"
        },
        "disclaimer": MEDICAL_DISCLAIMER
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "model_loaded": state.classifier.is_ready(),
        "model_path": state.config.model_path.display().to_string(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn detect(State(state): State<AppState>, multipart: Multipart) -> ApiResult<DetectionReport> {
    let upload = read_upload(multipart).await?;
    info!("Received image upload of {} bytes", upload.len());

    let session = create_detection_session(&upload).await.map_err(|e| {
        error!("Failed to create detection session: {}", e);
        internal_error("Failed to create detection session", &e.to_string())
    })?;
    let session_id = session.id.clone();
    save_session(&state, session).await?;

    match state.flow_runner.run(&session_id).await {
        Ok(result) if result.status == ExecutionStatus::Completed => {
            info!("Detection {} completed", session_id);
            load_report(&state, &session_id).await
        }
        Ok(result) => {
            error!(
                "Detection {} stopped before completion: {:?}",
                session_id, result.status
            );
            discard_session(&state, &session_id).await;
            Err(internal_error(
                PROCESSING_ERROR,
                "detection workflow did not complete",
            ))
        }
        Err(e) => {
            warn!("Detection {} failed: {}", session_id, e);
            discard_session(&state, &session_id).await;
            Err(detection_error(&e))
        }
    }
}

/// Bytes of the multipart field named `file`
async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| (e.status(), Json(json!({ "error": e.body_text() }))))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| (e.status(), Json(json!({ "error": e.body_text() }))))?;
        if bytes.is_empty() {
            return Err(bad_request_error("Uploaded file is empty"));
        }
        return Ok(bytes.to_vec());
    }
    Err(bad_request_error("Multipart field 'file' is required"))
}

async fn save_session(state: &AppState, session: Session) -> Result<(), ApiError> {
    state.session_storage.save(session).await.map_err(|e| {
        error!("Failed to save session: {}", e);
        internal_error("Failed to save session", &e.to_string())
    })
}

async fn discard_session(state: &AppState, session_id: &str) {
    if let Err(e) = state.session_storage.delete(session_id).await {
        error!("Failed to discard session {}: {}", session_id, e);
    }
}

/// Load a session that belongs to `graph_id`; anything else is a 404
async fn load_session(
    state: &AppState,
    session_id: &str,
    graph_id: &str,
    not_found: &str,
) -> Result<Session, ApiError> {
    match state.session_storage.get(session_id).await {
        Ok(Some(session)) if session.graph_id == graph_id => Ok(session),
        Ok(_) => Err(not_found_error(not_found, session_id)),
        Err(e) => {
            error!("Failed to load session {}: {}", session_id, e);
            Err(internal_error("Failed to load session", &e.to_string()))
        }
    }
}

async fn load_report(state: &AppState, session_id: &str) -> ApiResult<DetectionReport> {
    let session = load_session(state, session_id, DETECTION_GRAPH, "Detection not found").await?;
    session
        .context
        .get::<DetectionReport>(session_keys::REPORT)
        .await
        .map(Json)
        .ok_or_else(|| not_found_error("Detection not found", session_id))
}

async fn get_detection(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<DetectionReport> {
    info!("Getting detection report: {}", session_id);
    load_report(&state, &session_id).await
}

async fn list_conditions() -> Json<AboutResponse> {
    Json(AboutResponse {
        about: ABOUT_TEXT.to_string(),
        conditions: conditions::all().iter().map(ConditionView::from).collect(),
        disclaimer: MEDICAL_DISCLAIMER.to_string(),
    })
}

async fn get_condition(Path(name): Path<String>) -> ApiResult<ConditionView> {
    conditions::lookup(&name)
        .map(|record| Json(ConditionView::from(record)))
        .map_err(|_| not_found_error("Condition not found", &name))
}

async fn start_chat(State(state): State<AppState>) -> ApiResult<ChatSessionResponse> {
    let session = create_chat_session(state.assistant.as_ref()).await;
    let session_id = session.id.clone();
    let messages = session.context.get_all_messages().await;
    save_session(&state, session).await?;

    info!("Chat session {} started", session_id);
    Ok(Json(ChatSessionResponse {
        session_id,
        messages,
        disclaimer: CHAT_DISCLAIMER.to_string(),
    }))
}

async fn get_chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<ChatSessionResponse> {
    let session = load_session(&state, &session_id, CHAT_GRAPH, "Chat session not found").await?;
    Ok(Json(ChatSessionResponse {
        messages: session.context.get_all_messages().await,
        session_id,
        disclaimer: CHAT_DISCLAIMER.to_string(),
    }))
}

async fn send_chat_message(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatReplyResponse> {
    if request.content.trim().is_empty() {
        return Err(bad_request_error("Message cannot be empty"));
    }

    let session = load_session(&state, &session_id, CHAT_GRAPH, "Chat session not found").await?;
    let _turn = session.context.lock_turn().await;

    if session.context.chat_len().await + 2 > state.config.max_chat_messages {
        return Err((
            StatusCode::CONFLICT,
            Json(json!({
                "error": "Chat session is full, start a new one",
                "id": session_id,
                "max_messages": state.config.max_chat_messages
            })),
        ));
    }

    session
        .context
        .set(session_keys::USER_INPUT, &request.content)
        .await
        .map_err(|e| internal_error("Failed to store message", &e.to_string()))?;
    save_session(&state, session.clone()).await?;

    let result = state
        .flow_runner
        .run(&session_id)
        .await
        .map_err(|e| match e {
            GraphError::SessionNotFound(_) => not_found_error("Chat session not found", &session_id),
            e => {
                error!("Chat turn failed for session {}: {}", session_id, e);
                internal_error("Failed to process message", &e.to_string())
            }
        })?;

    Ok(Json(ChatReplyResponse {
        reply: result.response.unwrap_or_default(),
        message_count: session.context.chat_len().await,
        session_id,
    }))
}

async fn end_chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    load_session(&state, &session_id, CHAT_GRAPH, "Chat session not found").await?;
    state
        .session_storage
        .delete(&session_id)
        .await
        .map_err(|e| internal_error("Failed to end chat session", &e.to_string()))?;

    info!("Chat session {} ended", session_id);
    Ok(Json(json!({
        "session_id": session_id,
        "status": "ended"
    })))
}
