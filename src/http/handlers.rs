use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use super::state::AppState;
use crate::credential::Language;
use crate::error::{ActionError, FinalizeError, TransportError};
use crate::events::SpeakerRole;
use crate::session::{InterpreterSession, SessionConfig};
use crate::transport::{PeerFactory, RealtimeNegotiator, SessionTransport};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Optional session ID (if not provided, generate UUID)
    pub session_id: Option<String>,

    /// Which participant this device belongs to
    pub role: SpeakerRole,

    /// The participant's language
    pub language: Language,

    /// Patient identifier carried into the conversation record
    pub patient_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StopSessionResponse {
    pub session_id: String,
    pub status: String,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct MicRequest {
    pub recording: bool,
}

#[derive(Debug, Serialize)]
pub struct CancelActionResponse {
    pub action_id: Uuid,
    pub removed: bool,
}

#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub conversation_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions/start
/// Create a session and open its realtime transport
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    let session_id = req
        .session_id
        .unwrap_or_else(|| format!("session-{}", Uuid::new_v4()));

    info!("Starting interpreting session: {}", session_id);

    // Check for an existing session under this id
    {
        let sessions = state.sessions.read().await;
        if sessions.contains_key(&session_id) {
            return error_response(
                StatusCode::CONFLICT,
                format!("Session {} already exists", session_id),
            );
        }
    }

    let config = SessionConfig {
        session_id: session_id.clone(),
        human_role: req.role,
        language: req.language,
        patient_id: req.patient_id,
        ..SessionConfig::default()
    };

    let negotiator = RealtimeNegotiator::new(
        state.http_client.clone(),
        state.config.realtime.negotiation_url.clone(),
        state.config.realtime.model.clone(),
    );
    let transport = SessionTransport::new(
        negotiator,
        Duration::from_secs(state.config.realtime.handshake_timeout_secs),
    );

    let session = match InterpreterSession::new(
        config,
        transport,
        Arc::clone(&state.issuer),
        Arc::clone(&state.dispatcher),
        Arc::clone(&state.closer),
    ) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("Failed to create session: {}", e);
            return error_response(
                StatusCode::BAD_REQUEST,
                format!("Failed to create session: {}", e),
            );
        }
    };

    let peer = match PeerFactory::create(&state.config.realtime.peer) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to create media backend: {}", e);
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to create media backend: {}", e),
            );
        }
    };

    if let Err(e) = session.start(peer).await {
        error!("Failed to open realtime session: {}", e);
        let status = match e {
            TransportError::AlreadyOpen => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        return error_response(status, format!("Failed to open realtime session: {}", e));
    }

    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(session_id.clone(), session);
    }

    info!("Session {} connected", session_id);

    (
        StatusCode::OK,
        Json(StartSessionResponse {
            session_id: session_id.clone(),
            status: "connected".to_string(),
            message: format!("Realtime session {} opened", session_id),
        }),
    )
        .into_response()
}

/// POST /sessions/:session_id/stop
/// Close the realtime transport; transcript and actions stay for finalize
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = {
        let sessions = state.sessions.read().await;
        sessions.get(&session_id).cloned()
    };

    match session {
        Some(session) => {
            session.stop().await;
            (
                StatusCode::OK,
                Json(StopSessionResponse {
                    session_id: session_id.clone(),
                    status: "stopped".to_string(),
                    message: "Realtime session closed".to_string(),
                }),
            )
                .into_response()
        }
        None => session_not_found(&session_id),
    }
}

/// POST /sessions/:session_id/mic
/// Record the user's press-and-hold microphone intent
pub async fn set_mic(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<MicRequest>,
) -> impl IntoResponse {
    let session = {
        let sessions = state.sessions.read().await;
        sessions.get(&session_id).cloned()
    };

    match session {
        Some(session) => match session.set_recording(req.recording).await {
            Ok(()) => StatusCode::OK.into_response(),
            Err(e) => error_response(StatusCode::CONFLICT, e.to_string()),
        },
        None => session_not_found(&session_id),
    }
}

/// POST /sessions/:session_id/repeat
/// Ask the agent to repeat its last utterance
pub async fn request_repeat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = {
        let sessions = state.sessions.read().await;
        sessions.get(&session_id).cloned()
    };

    match session {
        Some(session) => match session.request_repeat().await {
            Ok(()) => StatusCode::OK.into_response(),
            Err(e) => error_response(StatusCode::CONFLICT, e.to_string()),
        },
        None => session_not_found(&session_id),
    }
}

/// GET /sessions/:session_id/status
pub async fn get_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;
    match sessions.get(&session_id) {
        Some(session) => (StatusCode::OK, Json(session.status().await)).into_response(),
        None => session_not_found(&session_id),
    }
}

/// GET /sessions/:session_id/turns
/// Transcript accumulated so far
pub async fn get_turns(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;
    match sessions.get(&session_id) {
        Some(session) => (StatusCode::OK, Json(session.turns().await)).into_response(),
        None => session_not_found(&session_id),
    }
}

/// GET /sessions/:session_id/actions
/// Actions awaiting a user response
pub async fn get_actions(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let sessions = state.sessions.read().await;
    match sessions.get(&session_id) {
        Some(session) => (StatusCode::OK, Json(session.pending_actions().await)).into_response(),
        None => session_not_found(&session_id),
    }
}

/// POST /sessions/:session_id/actions/:action_id/confirm
/// Confirm a pending action and dispatch it
pub async fn confirm_action(
    State(state): State<AppState>,
    Path((session_id, action_id)): Path<(String, Uuid)>,
) -> impl IntoResponse {
    let session = {
        let sessions = state.sessions.read().await;
        sessions.get(&session_id).cloned()
    };

    match session {
        Some(session) => match session.confirm_action(action_id).await {
            Ok(executed) => (StatusCode::OK, Json(executed)).into_response(),
            Err(ActionError::NotFound(id)) => {
                error_response(StatusCode::NOT_FOUND, format!("No pending action {}", id))
            }
            Err(e) => {
                error!("Action dispatch failed: {}", e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        },
        None => session_not_found(&session_id),
    }
}

/// POST /sessions/:session_id/actions/:action_id/cancel
/// Cancel a pending action; idempotent
pub async fn cancel_action(
    State(state): State<AppState>,
    Path((session_id, action_id)): Path<(String, Uuid)>,
) -> impl IntoResponse {
    let session = {
        let sessions = state.sessions.read().await;
        sessions.get(&session_id).cloned()
    };

    match session {
        Some(session) => {
            let removed = session.cancel_action(action_id).await;
            (
                StatusCode::OK,
                Json(CancelActionResponse {
                    action_id,
                    removed,
                }),
            )
                .into_response()
        }
        None => session_not_found(&session_id),
    }
}

/// POST /sessions/:session_id/finalize
/// Summarize the transcript and persist the conversation record
pub async fn finalize_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = {
        let sessions = state.sessions.read().await;
        sessions.get(&session_id).cloned()
    };

    match session {
        Some(session) => match session.finalize().await {
            Ok(conversation_id) => {
                (StatusCode::OK, Json(FinalizeResponse { conversation_id })).into_response()
            }
            Err(FinalizeError::SessionActive) => error_response(
                StatusCode::CONFLICT,
                FinalizeError::SessionActive.to_string(),
            ),
            Err(e) => {
                error!("Finalize failed for session {}: {}", session_id, e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        },
        None => session_not_found(&session_id),
    }
}

/// GET /conversations/:conversation_id
/// Read a persisted conversation record
pub async fn get_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.store.get(conversation_id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Conversation {} not found", conversation_id),
        ),
        Err(e) => {
            error!("Failed to read conversation {}: {}", conversation_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

fn session_not_found(session_id: &str) -> axum::response::Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Session {} not found", session_id),
    )
}
