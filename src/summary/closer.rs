use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::store::{ConversationRecord, ConversationStore};
use super::summarizer::SummarizerClient;
use crate::actions::{ActionDetector, ExecutedAction, PendingAction};
use crate::error::FinalizeError;
use crate::events::ConversationTurn;
use crate::transport::SessionState;

/// Everything finalize needs from the live session.
pub struct FinalizeInput {
    pub turns: Vec<ConversationTurn>,
    pub executed_actions: Vec<ExecutedAction>,
    pub patient_id: Option<String>,
    pub duration_secs: f64,
}

/// The persisted record's id, plus intents the summarizer found that were
/// not raised live. Those still await user confirmation.
#[derive(Debug)]
pub struct FinalizeOutcome {
    pub conversation_id: Uuid,
    pub late_actions: Vec<PendingAction>,
}

/// Hands the accumulated transcript to the summarization service and
/// persists the conversation record.
pub struct SessionCloser {
    summarizer: SummarizerClient,
    store: Arc<dyn ConversationStore>,
}

impl SessionCloser {
    pub fn new(summarizer: SummarizerClient, store: Arc<dyn ConversationStore>) -> Self {
        Self { summarizer, store }
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Finalize a stopped session.
    ///
    /// Refuses while the transport is still connecting or connected.
    /// Summarization or persistence failure fails the whole call, persists
    /// no partial record, and leaves the caller's transcript for a retry.
    /// Intents the summarizer detects go back through the detector, so they
    /// still require confirmation before any dispatch.
    pub async fn finalize(
        &self,
        transport_state: SessionState,
        input: FinalizeInput,
        detector: &mut ActionDetector,
    ) -> Result<FinalizeOutcome, FinalizeError> {
        if transport_state.is_active() {
            return Err(FinalizeError::SessionActive);
        }

        let response = self.summarizer.summarize(&input.turns).await?;

        let mut late_actions = Vec::new();
        for hint in response.detected_intents.hints() {
            if detector.has_seen(hint.action_type) {
                continue;
            }
            if let Some(action) = detector.inspect_hint(&hint, None) {
                late_actions.push(action);
            }
        }

        let record = ConversationRecord {
            id: Uuid::new_v4(),
            transcript: input.turns,
            summary: response.summary,
            actionables: response.actionables,
            detected_intents: response.detected_intents,
            executed_actions: input.executed_actions,
            patient_id: input.patient_id,
            duration_secs: input.duration_secs,
            created_at: Utc::now(),
        };
        let conversation_id = record.id;

        self.store
            .insert(&record)
            .await
            .map_err(FinalizeError::Persistence)?;

        info!(
            "Persisted conversation record {} ({} turns, {} late intents)",
            conversation_id,
            record.transcript.len(),
            late_actions.len()
        );

        Ok(FinalizeOutcome {
            conversation_id,
            late_actions,
        })
    }
}
