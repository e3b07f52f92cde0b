use tracing::debug;

use super::state::SessionState;

/// Gates locally captured audio onto the transport.
///
/// Capture is live iff the user holds the mic (intent) and the transport is
/// connecting or connected. The gate remembers the last applied value so
/// every change produces exactly one underlying toggle; callers apply the
/// returned toggle, if any, to the transport.
#[derive(Debug, Default)]
pub struct AudioGate {
    intent: bool,
    applied: bool,
}

impl AudioGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether capture should be live for the given inputs.
    pub fn decide(intent: bool, state: SessionState) -> bool {
        intent && state.is_active()
    }

    /// Record the user's press-and-hold intent.
    pub fn set_intent(&mut self, intent: bool, state: SessionState) -> Option<bool> {
        self.intent = intent;
        self.resolve(state)
    }

    /// Re-evaluate after a transport state change; leaving an active state
    /// forces capture off.
    pub fn on_state_change(&mut self, state: SessionState) -> Option<bool> {
        self.resolve(state)
    }

    /// The agent started speaking: drop local intent so the mic never talks
    /// over the interpretation.
    pub fn on_agent_speech(&mut self, state: SessionState) -> Option<bool> {
        self.intent = false;
        self.resolve(state)
    }

    pub fn intent(&self) -> bool {
        self.intent
    }

    pub fn is_capturing(&self) -> bool {
        self.applied
    }

    fn resolve(&mut self, state: SessionState) -> Option<bool> {
        let desired = Self::decide(self.intent, state);
        if desired == self.applied {
            return None;
        }
        self.applied = desired;
        debug!(
            "Audio gate -> {}",
            if desired { "capturing" } else { "muted" }
        );
        Some(desired)
    }
}
