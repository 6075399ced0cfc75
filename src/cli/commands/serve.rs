//! HTTP API server for the browser extension and other clients.
//!
//! `POST /ask` answers a question about a video; `GET /health` reports liveness.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Settings, TranscriptProvider};
use crate::error::FailureCategory;
use crate::orchestrator::Orchestrator;
use crate::rag::{ConversationTurn, HistoryEntry};
use crate::transcript::parse_video_id;
use crate::vector_store::ScoredChunk;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'spor doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let orchestrator = Arc::new(Orchestrator::connect(settings).await?);
    let model = orchestrator
        .generator()
        .model()
        .map(str::to_string)
        .unwrap_or_else(|| "none (answers will be apologies)".to_string());
    let app = router(orchestrator);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Spor API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    Output::kv("Model", &model);
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Ask", "POST /ask");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}

/// Build the API router around a shared orchestrator.
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ask", post(ask))
        .layer(cors)
        .with_state(orchestrator)
}

// === Request/Response Types ===

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct AskRequest {
    message: String,
    video: VideoInfo,
    conversation_history: Vec<HistoryEntry>,
}

/// Video details as sent by the extension. Only the ID (or URL) is used.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct VideoInfo {
    video_id: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct AskResponse {
    response: String,
    metadata: AskMetadata,
}

#[derive(Debug, Serialize)]
struct AskMetadata {
    confidence: f64,
    video_id: String,
    model: Option<String>,
    failure: Option<FailureCategory>,
    sources: Vec<ScoredChunk>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn bad_request(error: impl Into<String>) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// Pick the source ID out of the request's video details.
fn source_id_for(video: &VideoInfo, provider: &TranscriptProvider) -> Option<String> {
    let raw = video
        .video_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .or_else(|| video.url.as_deref().map(str::trim).filter(|u| !u.is_empty()))?;

    match provider {
        TranscriptProvider::Youtube => parse_video_id(raw),
        TranscriptProvider::File => Some(parse_video_id(raw).unwrap_or_else(|| raw.to_string())),
    }
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "service": "spor" }))
}

async fn ask(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(req): Json<AskRequest>,
) -> impl IntoResponse {
    let question = req.message.trim();
    if question.is_empty() {
        return bad_request("message is required");
    }

    let provider = &orchestrator.settings().transcript.provider;
    let Some(video_id) = source_id_for(&req.video, provider) else {
        return bad_request("video.videoId is missing or not a valid video ID");
    };

    let history: Vec<ConversationTurn> = req
        .conversation_history
        .into_iter()
        .map(ConversationTurn::from)
        .collect();

    let answer = orchestrator
        .answer_question(&video_id, question, &history)
        .await;

    Json(AskResponse {
        response: answer.answer,
        metadata: AskMetadata {
            confidence: answer.confidence,
            video_id,
            model: orchestrator.generator().model().map(str::to_string),
            failure: answer.failure,
            sources: answer.sources,
        },
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Prompts;
    use crate::embedding::HashingEmbedder;
    use crate::generation::{GenerationClient, Unconfigured};
    use crate::transcript::FileTranscripts;
    use axum::body::to_bytes;
    use axum::response::Response;

    fn orchestrator(dir: &std::path::Path) -> Arc<Orchestrator> {
        let mut settings = Settings::default();
        settings.transcript.provider = TranscriptProvider::File;
        settings.transcript.transcript_dir = dir.to_string_lossy().to_string();

        Arc::new(
            Orchestrator::with_components(
                settings,
                Prompts::default(),
                Arc::new(FileTranscripts::new(dir)),
                Arc::new(HashingEmbedder::new(64)),
                GenerationClient::disabled(Unconfigured::MissingApiKey),
            )
            .unwrap(),
        )
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request(json: serde_json::Value) -> Json<AskRequest> {
        Json(serde_json::from_value(json).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "spor");
    }

    #[tokio::test]
    async fn test_ask_returns_response_and_confidence() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("lecture1.txt"),
            "Today we talk about rust ownership and borrowing.",
        )
        .unwrap();

        let response = ask(
            State(orchestrator(dir.path())),
            request(serde_json::json!({
                "message": "What is this about?",
                "video": {"videoId": "lecture1", "title": "Lecture", "timestamp": 1700000000},
                "conversationHistory": [
                    {"text": "hi", "sender": "user", "timestamp": 1, "type": "message"},
                    {"text": "hello"}
                ]
            })),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body["response"],
            "Sorry, the language model is not configured properly. Please check your API key."
        );
        assert_eq!(body["metadata"]["confidence"], 0.7);
        assert_eq!(body["metadata"]["video_id"], "lecture1");
        assert_eq!(body["metadata"]["failure"], "generation_unconfigured");
    }

    #[tokio::test]
    async fn test_ask_missing_transcript_has_zero_confidence() {
        let dir = tempfile::tempdir().unwrap();

        let response = ask(
            State(orchestrator(dir.path())),
            request(serde_json::json!({
                "message": "Anything?",
                "video": {"videoId": "missing"}
            })),
        )
        .await
        .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["metadata"]["confidence"], 0.0);
        assert_eq!(body["metadata"]["failure"], "source_unavailable");
    }

    #[tokio::test]
    async fn test_ask_rejects_missing_video_or_message() {
        let dir = tempfile::tempdir().unwrap();
        let state = orchestrator(dir.path());

        let response = ask(
            State(state.clone()),
            request(serde_json::json!({"message": "Hi", "video": {}})),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"].is_string());

        let response = ask(
            State(state),
            request(serde_json::json!({"message": "  ", "video": {"videoId": "x"}})),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_source_id_for_youtube_requires_valid_id() {
        let video = VideoInfo {
            video_id: None,
            url: Some("https://youtube.com/watch?v=dQw4w9WgXcQ".to_string()),
        };
        assert_eq!(
            source_id_for(&video, &TranscriptProvider::Youtube),
            Some("dQw4w9WgXcQ".to_string())
        );

        let video = VideoInfo {
            video_id: Some("lecture1".to_string()),
            url: None,
        };
        assert_eq!(source_id_for(&video, &TranscriptProvider::Youtube), None);
        assert_eq!(
            source_id_for(&video, &TranscriptProvider::File),
            Some("lecture1".to_string())
        );
    }
}
