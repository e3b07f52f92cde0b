// Tests for the action detector: keyword rule table, structured hint
// precedence, and (turn, type) de-duplication.

use medinterp::actions::{ActionDetector, ActionType, ConfirmationStatus, IntentHint};
use medinterp::events::{SpeakerRole, TurnKind, TurnLog};

fn turn(text: &str) -> (TurnLog, medinterp::events::ConversationTurn) {
    let mut log = TurnLog::new();
    let turn = log.append(SpeakerRole::Clinician, text, TurnKind::Original);
    (log, turn)
}

#[test]
fn test_blood_test_order_raises_lab_order() {
    let (_log, turn) = turn("I would like to order a blood test");
    let mut detector = ActionDetector::new();

    let raised = detector.inspect(&turn);

    assert_eq!(raised.len(), 1);
    let action = &raised[0];
    assert_eq!(action.action_type, ActionType::LabOrder);
    assert_eq!(action.description, "Blood test order detected");
    assert_eq!(action.status, ConfirmationStatus::Pending);
    assert_eq!(action.turn_id, Some(turn.id));
    assert_eq!(
        action.payload.details.as_deref(),
        Some("I would like to order a blood test")
    );
}

#[test]
fn test_matching_is_case_insensitive() {
    let (_log, turn) = turn("Please ORDER a Blood Test for this patient");
    let mut detector = ActionDetector::new();

    let raised = detector.inspect(&turn);
    assert_eq!(raised.len(), 1);
    assert_eq!(raised[0].action_type, ActionType::LabOrder);
}

#[test]
fn test_schedule_follow_up_raises_follow_up() {
    let (_log, turn) = turn("Let's schedule a follow-up for next week");
    let mut detector = ActionDetector::new();

    let raised = detector.inspect(&turn);
    assert_eq!(raised.len(), 1);
    assert_eq!(raised[0].action_type, ActionType::FollowUp);
}

#[test]
fn test_order_alone_is_not_enough() {
    let (_log, turn) = turn("I will order lunch after the visit");
    let mut detector = ActionDetector::new();

    // "order" without a lab/blood-test term must not fire.
    assert!(detector.inspect(&turn).is_empty());
}

#[test]
fn test_one_turn_can_fire_multiple_rules() {
    let (_log, turn) = turn("Order a lab panel and schedule a follow-up visit");
    let mut detector = ActionDetector::new();

    let raised = detector.inspect(&turn);
    let mut types: Vec<ActionType> = raised.iter().map(|a| a.action_type).collect();
    types.sort_by_key(|t| t.as_str());

    assert_eq!(types, vec![ActionType::FollowUp, ActionType::LabOrder]);
}

#[test]
fn test_same_turn_never_raises_twice() {
    let (_log, turn) = turn("order a blood test");
    let mut detector = ActionDetector::new();

    assert_eq!(detector.inspect(&turn).len(), 1);
    assert!(
        detector.inspect(&turn).is_empty(),
        "re-inspecting a turn is a no-op"
    );
}

#[test]
fn test_distinct_turns_raise_independently() {
    let mut log = TurnLog::new();
    let first = log.append(SpeakerRole::Clinician, "order a blood test", TurnKind::Original);
    let second = log.append(SpeakerRole::Clinician, "order another blood test", TurnKind::Original);
    let mut detector = ActionDetector::new();

    assert_eq!(detector.inspect(&first).len(), 1);
    assert_eq!(detector.inspect(&second).len(), 1);
}

#[test]
fn test_structured_hint_carries_fields() {
    let mut detector = ActionDetector::new();
    let hint = IntentHint {
        action_type: ActionType::LabOrder,
        date: None,
        test_type: Some("CBC".to_string()),
        notes: Some("fasting".to_string()),
    };

    let action = detector.inspect_hint(&hint, Some(3)).expect("hint raises");

    assert_eq!(action.action_type, ActionType::LabOrder);
    assert_eq!(action.status, ConfirmationStatus::Pending);
    assert_eq!(action.payload.test_type.as_deref(), Some("CBC"));
    assert_eq!(action.payload.notes.as_deref(), Some("fasting"));
    assert_eq!(action.turn_id, Some(3));
}

#[test]
fn test_hint_takes_precedence_over_keyword_fallback() {
    let (_log, turn) = turn("I would like to order a blood test");
    let mut detector = ActionDetector::new();

    let hint = IntentHint {
        action_type: ActionType::LabOrder,
        date: None,
        test_type: Some("CBC".to_string()),
        notes: None,
    };

    // Hint processed first claims the (turn, type) slot...
    let hinted = detector.inspect_hint(&hint, Some(turn.id)).expect("hint raises");
    assert_eq!(hinted.payload.test_type.as_deref(), Some("CBC"));

    // ...so the keyword fallback for the same turn raises nothing.
    assert!(detector.inspect(&turn).is_empty());
}

#[test]
fn test_duplicate_hint_is_dropped() {
    let mut detector = ActionDetector::new();
    let hint = IntentHint {
        action_type: ActionType::FollowUp,
        date: Some("next week".to_string()),
        test_type: None,
        notes: None,
    };

    assert!(detector.inspect_hint(&hint, None).is_some());
    assert!(detector.inspect_hint(&hint, None).is_none());
}

#[test]
fn test_has_seen_tracks_types_across_paths() {
    let (_log, turn) = turn("order a blood test");
    let mut detector = ActionDetector::new();

    assert!(!detector.has_seen(ActionType::LabOrder));
    detector.inspect(&turn);
    assert!(detector.has_seen(ActionType::LabOrder));
    assert!(!detector.has_seen(ActionType::FollowUp));
}
