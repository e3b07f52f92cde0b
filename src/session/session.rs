use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::config::SessionConfig;
use super::status::SessionStatus;
use crate::actions::{
    ActionDetector, ActionDispatcher, ExecutedAction, PendingAction, PendingActionSet,
};
use crate::credential::CredentialIssuer;
use crate::error::{ActionError, FinalizeError, TransportError};
use crate::events::{ConversationTurn, EventInterpreter, SpeakerRole, TurnLog};
use crate::summary::{FinalizeInput, SessionCloser};
use crate::transport::{AudioGate, RealtimePeer, SessionTransport};

/// An interpreting session: one conversation between a clinician and a
/// patient, mediated by the remote agent.
///
/// Owns the transport, the transcript, the pending-action set and the
/// audio gate. Inbound events are consumed by a single task in arrival
/// order, and detection for a turn completes before the next event is
/// processed, so the pending-action list a user sees is always consistent
/// with the turns already rendered.
pub struct InterpreterSession {
    config: SessionConfig,
    transport: Arc<SessionTransport>,
    issuer: Arc<CredentialIssuer>,
    dispatcher: Arc<ActionDispatcher>,
    closer: Arc<SessionCloser>,
    interpreter: EventInterpreter,
    started_at: DateTime<Utc>,
    inner: Arc<Mutex<SessionInner>>,
    pump_task: Mutex<Option<JoinHandle<()>>>,
    gate_task: Mutex<Option<JoinHandle<()>>>,
}

/// State mutated only by this session, read by the HTTP layer.
struct SessionInner {
    turns: TurnLog,
    detector: ActionDetector,
    pending: PendingActionSet,
    executed: Vec<ExecutedAction>,
    gate: AudioGate,
    conversation_id: Option<Uuid>,
}

impl InterpreterSession {
    pub fn new(
        config: SessionConfig,
        transport: SessionTransport,
        issuer: Arc<CredentialIssuer>,
        dispatcher: Arc<ActionDispatcher>,
        closer: Arc<SessionCloser>,
    ) -> Result<Self> {
        if !matches!(
            config.human_role,
            SpeakerRole::Clinician | SpeakerRole::Patient
        ) {
            anyhow::bail!("session role must be clinician or patient");
        }

        info!("Creating interpreting session: {}", config.session_id);

        let interpreter = EventInterpreter::new(config.human_role);

        Ok(Self {
            config,
            transport: Arc::new(transport),
            issuer,
            dispatcher,
            closer,
            interpreter,
            started_at: Utc::now(),
            inner: Arc::new(Mutex::new(SessionInner {
                turns: TurnLog::new(),
                detector: ActionDetector::new(),
                pending: PendingActionSet::new(),
                executed: Vec::new(),
                gate: AudioGate::new(),
                conversation_id: None,
            })),
            pump_task: Mutex::new(None),
            gate_task: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &SessionTransport {
        &self.transport
    }

    /// Connect to the remote agent and start consuming its events.
    pub async fn start(&self, peer: Box<dyn RealtimePeer>) -> Result<(), TransportError> {
        let credential = self.issuer.issue(self.config.language).await?;
        let agent = self.config.agent();
        let mut events = self.transport.open(peer, &credential, &agent).await?;

        // Single consumer: one event at a time, in arrival order.
        let inner = Arc::clone(&self.inner);
        let transport = Arc::clone(&self.transport);
        let interpreter = self.interpreter.clone();
        let session_id = self.config.session_id.clone();
        let pump = tokio::spawn(async move {
            info!("Event pump started for session {}", session_id);
            while let Some(raw) = events.recv().await {
                process_event(&interpreter, &inner, &transport, raw).await;
            }
            info!("Event pump stopped for session {}", session_id);
        });
        *self.pump_task.lock().await = Some(pump);

        // Force the gate shut the moment the transport leaves an active state.
        let mut states = self.transport.subscribe();
        let inner = Arc::clone(&self.inner);
        let transport = Arc::clone(&self.transport);
        let gate_task = tokio::spawn(async move {
            while states.changed().await.is_ok() {
                let state = *states.borrow_and_update();
                let toggle = { inner.lock().await.gate.on_state_change(state) };
                apply_gate(&transport, toggle).await;
            }
        });
        *self.gate_task.lock().await = Some(gate_task);

        Ok(())
    }

    /// Record the user's press-and-hold microphone intent.
    pub async fn set_recording(&self, intent: bool) -> Result<(), TransportError> {
        let state = self.transport.state();
        let toggle = { self.inner.lock().await.gate.set_intent(intent, state) };
        if let Some(enabled) = toggle {
            self.transport.set_audio_enabled(enabled).await?;
        }
        Ok(())
    }

    /// Ask the agent to repeat its last utterance.
    pub async fn request_repeat(&self) -> Result<(), TransportError> {
        self.transport
            .send_command(serde_json::json!({ "type": "response.repeat" }))
            .await
    }

    /// Confirm a pending action and dispatch it.
    ///
    /// A completed dispatch, whatever the remote status, records exactly
    /// one `ExecutedAction` and removes the action from the pending set. A
    /// delivery failure leaves it confirmed for manual retry; confirming
    /// again re-runs the dispatch without touching its status.
    pub async fn confirm_action(&self, id: Uuid) -> Result<ExecutedAction, ActionError> {
        let action = { self.inner.lock().await.pending.confirm(id)? };

        match self.dispatcher.execute(&action).await {
            Ok(executed) => {
                let mut inner = self.inner.lock().await;
                inner.pending.remove(id);
                let note = if executed.success {
                    format!("{} sent to the system.", action.action_type.label())
                } else {
                    format!(
                        "{} was delivered but declined by the receiving system.",
                        action.action_type.label()
                    )
                };
                inner.turns.append_info(note);
                inner.executed.push(executed.clone());
                Ok(executed)
            }
            Err(e) => {
                error!("Dispatch failed for action {}: {}", id, e);
                let mut inner = self.inner.lock().await;
                inner.turns.append_info(format!(
                    "{} could not be delivered; it stays confirmed for retry.",
                    action.action_type.label()
                ));
                Err(e)
            }
        }
    }

    /// Cancel a pending action. No external call is made and no outcome is
    /// recorded; cancelling twice, or an unknown id, is a no-op.
    pub async fn cancel_action(&self, id: Uuid) -> bool {
        let mut inner = self.inner.lock().await;
        let removed = inner.pending.cancel(id);
        if removed {
            info!("Cancelled pending action {}", id);
        }
        removed
    }

    /// Stop the realtime session. The transcript and any pending actions
    /// survive for finalize.
    pub async fn stop(&self) {
        self.transport.close().await;

        if let Some(task) = self.gate_task.lock().await.take() {
            task.abort();
        }
        if let Some(task) = self.pump_task.lock().await.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!("Event pump task panicked: {}", e);
                }
            }
        }

        info!("Session {} stopped", self.config.session_id);
    }

    /// Close out the conversation: summarize, persist, return the durable
    /// conversation id. Refuses while the transport is live. Once a record
    /// exists, repeated calls return the same id without re-summarizing.
    pub async fn finalize(&self) -> Result<Uuid, FinalizeError> {
        let state = self.transport.state();

        let mut inner = self.inner.lock().await;
        if let Some(id) = inner.conversation_id {
            return Ok(id);
        }

        let input = FinalizeInput {
            turns: inner.turns.snapshot(),
            executed_actions: inner.executed.clone(),
            patient_id: self.config.patient_id.clone(),
            duration_secs: elapsed_secs(self.started_at),
        };

        let detector = &mut inner.detector;
        let outcome = self.closer.finalize(state, input, detector).await?;

        inner.conversation_id = Some(outcome.conversation_id);
        for action in outcome.late_actions {
            inner.pending.push(action);
        }

        Ok(outcome.conversation_id)
    }

    /// Current snapshot.
    pub async fn status(&self) -> SessionStatus {
        let inner = self.inner.lock().await;
        SessionStatus {
            state: self.transport.state(),
            started_at: self.started_at,
            duration_secs: elapsed_secs(self.started_at),
            turn_count: inner.turns.len(),
            pending_action_count: inner.pending.pending().len(),
            executed_action_count: inner.executed.len(),
            conversation_id: inner.conversation_id,
        }
    }

    /// Transcript accumulated so far.
    pub async fn turns(&self) -> Vec<ConversationTurn> {
        self.inner.lock().await.turns.snapshot()
    }

    /// Actions awaiting a user response.
    pub async fn pending_actions(&self) -> Vec<PendingAction> {
        self.inner.lock().await.pending.pending()
    }

    /// Dispatch outcomes recorded so far.
    pub async fn executed_actions(&self) -> Vec<ExecutedAction> {
        self.inner.lock().await.executed.clone()
    }
}

/// Handle one inbound event completely before the caller takes the next:
/// interpretation, turn append, gate side effects and action detection all
/// happen under a single lock scope.
async fn process_event(
    interpreter: &EventInterpreter,
    inner: &Arc<Mutex<SessionInner>>,
    transport: &Arc<SessionTransport>,
    raw: serde_json::Value,
) {
    let state = transport.state();
    let toggle;
    {
        let mut guard = inner.lock().await;
        let SessionInner {
            turns,
            detector,
            pending,
            gate,
            ..
        } = &mut *guard;

        let interpretation = interpreter.interpret(&raw, turns);

        toggle = if interpretation.agent_speaking {
            gate.on_agent_speech(state)
        } else {
            None
        };

        if let Some(message) = interpretation.error {
            warn!("Recoverable session event error: {}", message);
            turns.append_info(format!("Interpretation issue: {message}"));
        }

        let turn_id = interpretation.turn.as_ref().map(|t| t.id);
        // The structured hint wins over the keyword fallback for this turn.
        if let Some(hint) = interpretation.hint {
            if let Some(action) = detector.inspect_hint(&hint, turn_id) {
                pending.push(action);
            }
        }
        if let Some(turn) = interpretation.turn {
            for action in detector.inspect(&turn) {
                pending.push(action);
            }
        }
    }
    apply_gate(transport, toggle).await;
}

async fn apply_gate(transport: &Arc<SessionTransport>, toggle: Option<bool>) {
    if let Some(enabled) = toggle {
        if let Err(e) = transport.set_audio_enabled(enabled).await {
            warn!("Failed to apply audio gate change: {}", e);
        }
    }
}

fn elapsed_secs(since: DateTime<Utc>) -> f64 {
    (Utc::now() - since).num_milliseconds() as f64 / 1000.0
}
