use serde::Deserialize;
use tracing::{debug, warn};

use super::turn::{ConversationTurn, SpeakerRole, TurnKind, TurnLog};
use crate::actions::IntentHint;

/// Inbound agent events recognized on the session's event channel.
///
/// Turn creation is keyed off the completed variants only; partial deltas
/// are acknowledged but never become turns, so each utterance is appended
/// exactly once, with final text.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum AgentEvent {
    #[serde(rename = "response.audio_transcript.done")]
    AgentUtteranceDone {
        transcript: String,
        #[serde(default)]
        translation: Option<String>,
    },

    #[serde(rename = "response.audio_transcript.delta")]
    AgentUtteranceDelta {
        #[serde(default)]
        delta: String,
    },

    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted { transcript: String },

    #[serde(rename = "conversation.item.input_audio_transcription.delta")]
    TranscriptionDelta {
        #[serde(default)]
        delta: String,
    },

    #[serde(rename = "conversation.item.input_audio_transcription.failed")]
    TranscriptionFailed {
        #[serde(default)]
        error: Option<EventErrorDetail>,
    },

    #[serde(rename = "output_audio_buffer.started")]
    AgentSpeechStarted,

    #[serde(rename = "intent.detected")]
    IntentDetected(IntentHint),
}

#[derive(Debug, Clone, Deserialize)]
struct EventErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// Result of interpreting one raw inbound payload: at most one appended
/// turn and at most one recoverable error, plus side signals for the
/// surrounding session.
#[derive(Debug, Default)]
pub struct Interpretation {
    pub turn: Option<ConversationTurn>,

    /// Recoverable; surfaced to the user while the session stays open
    pub error: Option<String>,

    /// The agent is speaking; local capture intent must clear
    pub agent_speaking: bool,

    /// Structured clinical-intent hint attached to the event
    pub hint: Option<IntentHint>,
}

/// Decodes raw inbound payloads, one at a time and in arrival order.
///
/// Unknown event categories are logged and otherwise ignored; a malformed
/// payload of a recognized category is a recoverable error, never fatal to
/// the session.
#[derive(Debug, Clone)]
pub struct EventInterpreter {
    human_role: SpeakerRole,
}

impl EventInterpreter {
    /// `human_role` is the session's configured local participant; completed
    /// transcriptions of local speech are attributed to it.
    pub fn new(human_role: SpeakerRole) -> Self {
        Self { human_role }
    }

    pub fn interpret(&self, raw: &serde_json::Value, log: &mut TurnLog) -> Interpretation {
        let mut out = Interpretation::default();

        let event: AgentEvent = match serde_json::from_value(raw.clone()) {
            Ok(event) => event,
            Err(parse_err) => {
                match raw.get("type").and_then(|t| t.as_str()) {
                    Some(kind) if is_known(kind) => {
                        warn!("Malformed `{}` event: {}", kind, parse_err);
                        out.error = Some(format!("malformed `{kind}` event"));
                    }
                    Some(kind) => {
                        debug!("Ignoring unhandled event type `{}`", kind);
                    }
                    None => {
                        warn!("Inbound event without a type field");
                        out.error = Some("inbound event without a type field".to_string());
                    }
                }
                return out;
            }
        };

        match event {
            AgentEvent::AgentUtteranceDone {
                transcript,
                translation,
            } => {
                out.turn = Some(log.append_translated(
                    SpeakerRole::Agent,
                    transcript,
                    translation,
                    TurnKind::Translation,
                ));
                // The agent's audio accompanies its finished transcript.
                out.agent_speaking = true;
            }

            AgentEvent::TranscriptionCompleted { transcript } => {
                out.turn = Some(log.append(self.human_role, transcript, TurnKind::Original));
            }

            AgentEvent::AgentUtteranceDelta { .. } | AgentEvent::TranscriptionDelta { .. } => {
                // Partial text; the completed variant carries the turn.
            }

            AgentEvent::TranscriptionFailed { error } => {
                let message = error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| "Unknown error".to_string());
                warn!("Transcription failed: {}", message);
                out.error = Some(format!("Transcription failed: {message}"));
            }

            AgentEvent::AgentSpeechStarted => {
                out.agent_speaking = true;
            }

            AgentEvent::IntentDetected(hint) => {
                out.hint = Some(hint);
            }
        }

        out
    }
}

fn is_known(kind: &str) -> bool {
    matches!(
        kind,
        "response.audio_transcript.done"
            | "response.audio_transcript.delta"
            | "conversation.item.input_audio_transcription.completed"
            | "conversation.item.input_audio_transcription.delta"
            | "conversation.item.input_audio_transcription.failed"
            | "output_audio_buffer.started"
            | "intent.detected"
    )
}
