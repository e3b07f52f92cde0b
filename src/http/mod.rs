//! HTTP API server driven by the conversation UI
//!
//! This module provides a REST API for controlling interpreting sessions:
//! - POST /sessions/start - Create a session and open its transport
//! - POST /sessions/:id/stop - Close the realtime transport
//! - POST /sessions/:id/mic - Press-and-hold microphone intent
//! - POST /sessions/:id/repeat - Ask the agent to repeat itself
//! - GET /sessions/:id/{status,turns,actions} - Session queries
//! - POST /sessions/:id/actions/:action_id/{confirm,cancel} - Action decisions
//! - POST /sessions/:id/finalize - Summarize and persist the conversation
//! - GET /conversations/:id - Read a persisted record
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
