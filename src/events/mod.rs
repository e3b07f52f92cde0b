//! Conversation turns and inbound event interpretation
//!
//! This module provides the append-only transcript (`TurnLog`) and the
//! `EventInterpreter` that decodes raw agent events into turns:
//! - Completed agent utterances and local-speech transcriptions become turns
//! - Partial deltas never do (each turn is appended exactly once, final text)
//! - Transcription failures surface as recoverable errors
//! - Unknown event categories are logged and skipped

mod interpreter;
mod turn;

pub use interpreter::{EventInterpreter, Interpretation};
pub use turn::{ConversationTurn, SpeakerRole, TurnKind, TurnLog};
