use super::state::AppState;
use crate::orchestrator::{Command, SessionView, StageKind};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;
use tracing::{error, info};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub accepted: bool,
    pub message: String,
    pub view: SessionView,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /interview/status
/// Current presentation view
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.interview.view()))
}

/// POST /interview/start
/// Start the interview from the instructions stage
pub async fn start_interview(State(state): State<AppState>) -> impl IntoResponse {
    let view = state.interview.view();
    if view.stage != StageKind::Instructions || view.is_busy {
        return conflict(format!("Cannot start the interview while {:?}", view.stage));
    }

    send(&state, Command::Start, "Interview starting")
}

/// POST /interview/stop
/// Stop the current recording early
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    let view = state.interview.view();
    if !view.is_recording {
        return conflict("No recording in progress".to_string());
    }

    send(&state, Command::Stop, "Recording stopping")
}

/// POST /interview/retry
/// Restart from loading after an error
pub async fn retry_interview(State(state): State<AppState>) -> impl IntoResponse {
    let view = state.interview.view();
    if view.stage != StageKind::Error {
        return conflict("Retry is only available after an error".to_string());
    }

    send(&state, Command::Retry, "Reloading interview")
}

/// POST /interview/leave
/// Leave the flow; every device and timer is released
pub async fn leave_interview(State(state): State<AppState>) -> impl IntoResponse {
    send(&state, Command::Leave, "Interview closed")
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

fn send(state: &AppState, command: Command, message: &str) -> axum::response::Response {
    match state.interview.send(command) {
        Ok(()) => {
            info!("Accepted {:?}", command);
            (
                StatusCode::ACCEPTED,
                Json(ActionResponse {
                    accepted: true,
                    message: message.to_string(),
                    view: state.interview.view(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to deliver {:?}: {}", command, e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

fn conflict(error: String) -> axum::response::Response {
    (StatusCode::CONFLICT, Json(ErrorResponse { error })).into_response()
}
