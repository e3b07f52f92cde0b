// Exhaustive tests for the audio gate invariant:
// capture is live iff intent is true and the transport is connecting or
// connected, with exactly one underlying toggle per change.

use medinterp::transport::{AudioGate, SessionState};

const ALL_STATES: [SessionState; 6] = [
    SessionState::Idle,
    SessionState::Connecting,
    SessionState::Connected,
    SessionState::Disconnected,
    SessionState::Failed,
    SessionState::Closed,
];

#[test]
fn test_decision_table() {
    for state in ALL_STATES {
        for intent in [false, true] {
            let expected = intent
                && matches!(state, SessionState::Connecting | SessionState::Connected);
            assert_eq!(
                AudioGate::decide(intent, state),
                expected,
                "decide({intent}, {state})"
            );
        }
    }
}

#[test]
fn test_one_toggle_per_intent_change() {
    let mut gate = AudioGate::new();

    assert_eq!(gate.set_intent(true, SessionState::Connected), Some(true));
    // Same intent again: no second toggle.
    assert_eq!(gate.set_intent(true, SessionState::Connected), None);

    assert_eq!(gate.set_intent(false, SessionState::Connected), Some(false));
    assert_eq!(gate.set_intent(false, SessionState::Connected), None);
}

#[test]
fn test_intent_while_disconnected_never_enables() {
    let mut gate = AudioGate::new();

    for state in [
        SessionState::Idle,
        SessionState::Disconnected,
        SessionState::Failed,
        SessionState::Closed,
    ] {
        assert_eq!(gate.set_intent(true, state), None);
        assert!(!gate.is_capturing());
        gate.set_intent(false, state);
    }
}

#[test]
fn test_leaving_active_state_forces_capture_off() {
    let mut gate = AudioGate::new();

    assert_eq!(gate.set_intent(true, SessionState::Connected), Some(true));
    assert!(gate.is_capturing());

    assert_eq!(
        gate.on_state_change(SessionState::Disconnected),
        Some(false)
    );
    assert!(!gate.is_capturing());

    // Already off: a repeated state change produces no second toggle.
    assert_eq!(gate.on_state_change(SessionState::Disconnected), None);
}

#[test]
fn test_intent_survives_reconnect() {
    let mut gate = AudioGate::new();

    gate.set_intent(true, SessionState::Connected);
    gate.on_state_change(SessionState::Disconnected);
    assert!(gate.intent(), "intent is user state, not connection state");

    // User still holding the mic when the link comes back.
    assert_eq!(gate.on_state_change(SessionState::Connected), Some(true));
}

#[test]
fn test_agent_speech_clears_intent() {
    let mut gate = AudioGate::new();

    gate.set_intent(true, SessionState::Connected);
    assert!(gate.is_capturing());

    assert_eq!(gate.on_agent_speech(SessionState::Connected), Some(false));
    assert!(!gate.intent(), "agent speech drops the press-and-hold intent");
    assert!(!gate.is_capturing());

    // Idempotent while the agent keeps talking.
    assert_eq!(gate.on_agent_speech(SessionState::Connected), None);
}

#[test]
fn test_capture_allowed_while_connecting() {
    let mut gate = AudioGate::new();

    assert_eq!(gate.set_intent(true, SessionState::Connecting), Some(true));
    assert_eq!(gate.on_state_change(SessionState::Connected), None);
}
