use std::collections::HashSet;

use tracing::info;

use super::types::{ActionPayload, ActionType, IntentHint, PendingAction};
use crate::events::ConversationTurn;

/// One keyword fallback rule: a turn matches when its text contains every
/// `all` term and at least one `any` term (case-insensitive containment).
#[derive(Debug, Clone, Copy)]
pub struct DetectionRule {
    pub action_type: ActionType,
    pub description: &'static str,
    pub all: &'static [&'static str],
    pub any: &'static [&'static str],
}

impl DetectionRule {
    fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.all.iter().all(|term| text.contains(term))
            && (self.any.is_empty() || self.any.iter().any(|term| text.contains(term)))
    }
}

/// Fallback rules applied when no structured hint accompanies a turn.
/// Additive: a new clinical action gets a new row here, not inline string
/// matching in turn handling.
pub const DETECTION_RULES: &[DetectionRule] = &[
    DetectionRule {
        action_type: ActionType::LabOrder,
        description: "Blood test order detected",
        all: &["order"],
        any: &["lab", "blood test"],
    },
    DetectionRule {
        action_type: ActionType::FollowUp,
        description: "Follow-up appointment requested",
        all: &["schedule"],
        any: &["follow-up", "follow up"],
    },
];

/// Scans interpreted turns and structured hints for clinical-action
/// intents. Candidates always start pending and are surfaced to the user;
/// nothing is ever auto-confirmed.
#[derive(Debug, Default)]
pub struct ActionDetector {
    /// (turn, type) pairs already raised, so the hint path and the keyword
    /// fallback never duplicate one another for a single turn
    seen: HashSet<(Option<u64>, ActionType)>,
    types_seen: HashSet<ActionType>,
}

impl ActionDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keyword fallback over a turn's text. At most one candidate per rule;
    /// distinct rules may fire independently on the same turn.
    pub fn inspect(&mut self, turn: &ConversationTurn) -> Vec<PendingAction> {
        let mut raised = Vec::new();
        for rule in DETECTION_RULES {
            if !rule.matches(&turn.text) {
                continue;
            }
            if !self.seen.insert((Some(turn.id), rule.action_type)) {
                continue;
            }
            self.types_seen.insert(rule.action_type);
            info!("Detected `{}` intent on turn {}", rule.action_type, turn.id);
            raised.push(PendingAction::new(
                rule.action_type,
                rule.description,
                ActionPayload {
                    details: Some(turn.text.clone()),
                    ..ActionPayload::default()
                },
                Some(turn.id),
            ));
        }
        raised
    }

    /// Structured hint path. Processed before the keyword fallback for the
    /// same turn, it claims the (turn, type) slot the fallback would
    /// otherwise fill.
    pub fn inspect_hint(&mut self, hint: &IntentHint, turn_id: Option<u64>) -> Option<PendingAction> {
        if !self.seen.insert((turn_id, hint.action_type)) {
            return None;
        }
        self.types_seen.insert(hint.action_type);
        info!("Structured `{}` intent hint accepted", hint.action_type);
        Some(PendingAction::new(
            hint.action_type,
            format!("{} requested by the interpreting agent", hint.action_type.label()),
            ActionPayload {
                details: None,
                date: hint.date.clone(),
                test_type: hint.test_type.clone(),
                notes: hint.notes.clone(),
            },
            turn_id,
        ))
    }

    /// Whether any intent of this type was raised during the session.
    pub fn has_seen(&self, action_type: ActionType) -> bool {
        self.types_seen.contains(&action_type)
    }
}
