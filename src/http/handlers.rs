use super::state::AppState;
use crate::display::DisplaySink;
use crate::session::{spawn_session, SessionState, SessionStats, TranscriptMessage, KNOWN_VOICES};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StartSessionRequest {
    /// Voice identity (defaults to the configured voice)
    #[serde(default)]
    pub voice: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub voice: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub session_id: String,
    pub status: String,
    pub stats: SessionStats,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub state: SessionState,
    pub ai_speaking: bool,
    pub loudness: f32,
    pub speaking_now: bool,
    pub stats: Option<SessionStats>,
    pub last_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: String) -> axum::response::Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
/// Start a new session in the background
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    let mut active = state.active.lock().await;

    if let Some(handle) = active.as_ref() {
        if !handle.is_finished() {
            return error_response(
                StatusCode::CONFLICT,
                format!("Session {} is already running", handle.session_id()),
            );
        }
    }

    let mut config = state.base_config.renewed();
    if let Some(voice) = req.voice.filter(|v| !v.trim().is_empty()) {
        config.voice = voice;
    }

    info!("Starting session {} (voice: {})", config.session_id, config.voice);

    state.display.reset();
    let display: Arc<dyn DisplaySink> = state.display.clone();
    let handle = spawn_session(config.clone(), display);
    *active = Some(handle);

    (
        StatusCode::OK,
        Json(StartSessionResponse {
            session_id: config.session_id,
            voice: config.voice,
            status: "connecting".to_string(),
        }),
    )
        .into_response()
}

/// POST /session/stop
/// Stop the running session and return its final stats
pub async fn stop_session(State(state): State<AppState>) -> impl IntoResponse {
    // Held until the session has ended so a concurrent start waits for it
    let mut active = state.active.lock().await;

    let Some(handle) = active.take() else {
        return error_response(StatusCode::NOT_FOUND, "No session is running".to_string());
    };

    let session_id = handle.session_id().to_string();
    info!("Stopping session {}", session_id);

    handle.stop();
    let result = handle.join().await;
    drop(active);

    match result {
        Ok(stats) => (
            StatusCode::OK,
            Json(StopSessionResponse {
                session_id,
                status: "stopped".to_string(),
                stats,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Session {} ended with error: {:#}", session_id, e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Session {} failed: {:#}", session_id, e),
            )
        }
    }
}

/// GET /session/status
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let status = state.display.status();

    Json(StatusResponse {
        state: status.state,
        ai_speaking: status.ai_speaking,
        loudness: status.loudness,
        speaking_now: status.speaking_now,
        stats: state.display.stats(),
        last_error: state.display.last_error(),
    })
}

/// GET /session/transcript
/// Turns flushed so far in the current (or last) session
pub async fn get_transcript(State(state): State<AppState>) -> impl IntoResponse {
    let transcript: Vec<TranscriptMessage> = state.display.messages();
    Json(transcript)
}

/// GET /voices
pub async fn list_voices() -> impl IntoResponse {
    Json(KNOWN_VOICES)
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
