use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::actions::ActionType;

/// Failures of the realtime transport lifecycle.
///
/// Setup failures (credential, negotiation, handshake) are fatal to the
/// current `open` attempt and require an explicit user-initiated retry.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("a realtime transport is already open; close it before opening another")]
    AlreadyOpen,

    #[error("no realtime transport is open")]
    NotOpen,

    #[error("credential issuance failed: {0}")]
    Credential(String),

    #[error("session negotiation rejected: {0}")]
    Negotiation(String),

    #[error("connectivity handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    #[error("connectivity handshake ended in `{0}` before the link came up")]
    HandshakeFailed(String),

    #[error("realtime peer failure: {0}")]
    Peer(#[source] anyhow::Error),
}

/// Failures around pending-action confirmation and dispatch.
///
/// `Delivery` is a transport-level failure of the external call and is
/// distinct from a remote endpoint answering with a non-success status;
/// the latter completes the dispatch and is recorded as `success: false`.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("no pending action with id {0}")]
    NotFound(Uuid),

    #[error("action {0} has not been confirmed")]
    NotConfirmed(Uuid),

    #[error("no delivery target configured for action type `{0}`")]
    Unrouted(ActionType),

    #[error("failed to deliver action {id} ({action_type}): {source}")]
    Delivery {
        id: Uuid,
        action_type: ActionType,
        #[source]
        source: reqwest::Error,
    },
}

/// Failures of the end-of-session wrap-up. None of these persist a partial
/// record; the in-memory transcript survives for a retry.
#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error("stop the realtime session before finalizing")]
    SessionActive,

    #[error("summarization failed: {0}")]
    Summarization(String),

    #[error("failed to persist conversation record: {0}")]
    Persistence(#[source] anyhow::Error),
}
