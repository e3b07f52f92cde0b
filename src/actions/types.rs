use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ActionError;

/// Clinical action kinds the system can dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    LabOrder,
    FollowUp,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::LabOrder => "lab_order",
            ActionType::FollowUp => "follow_up",
        }
    }

    /// Human-readable label for user-facing surfaces.
    pub fn label(&self) -> &'static str {
        match self {
            ActionType::LabOrder => "Lab Order",
            ActionType::FollowUp => "Follow-up Appointment",
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Data carried from detection through dispatch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionPayload {
    /// Free-text detail, e.g. the triggering utterance
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default, rename = "testType")]
    pub test_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
}

/// Structured clinical-intent hint, supplied by the agent alongside an
/// event or by the summarizer after the fact. Preferred over the keyword
/// fallback when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentHint {
    #[serde(rename = "intent")]
    pub action_type: ActionType,

    #[serde(default)]
    pub date: Option<String>,

    #[serde(default, rename = "testType")]
    pub test_type: Option<String>,

    #[serde(default)]
    pub notes: Option<String>,
}

/// Confirmation lifecycle of a pending action. Leaves `Pending` at most
/// once; nothing rewrites the status afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationStatus {
    Pending,
    Confirmed,
    Cancelled,
}

/// A clinical-intent candidate awaiting human confirmation. Never
/// auto-confirmed; no external effect happens before the user says yes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: Uuid,
    pub action_type: ActionType,
    pub description: String,
    pub status: ConfirmationStatus,
    pub payload: ActionPayload,

    /// Turn that triggered detection, when one did
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub turn_id: Option<u64>,
}

impl PendingAction {
    pub fn new(
        action_type: ActionType,
        description: impl Into<String>,
        payload: ActionPayload,
        turn_id: Option<u64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action_type,
            description: description.into(),
            status: ConfirmationStatus::Pending,
            payload,
            turn_id,
        }
    }
}

/// Durable outcome of a confirmed action whose dispatch completed.
/// `success` mirrors the remote status class; a transport-level delivery
/// failure never produces one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutedAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub success: bool,
    pub metadata: ActionPayload,
}

/// Actions awaiting a user response, in detection order. Mutated only by
/// the owning session.
#[derive(Debug, Default)]
pub struct PendingActionSet {
    actions: Vec<PendingAction>,
}

impl PendingActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: PendingAction) {
        self.actions.push(action);
    }

    pub fn get(&self, id: Uuid) -> Option<&PendingAction> {
        self.actions.iter().find(|a| a.id == id)
    }

    /// Mark an action confirmed. The status is written once; confirming an
    /// already-confirmed action returns it unchanged, so a failed dispatch
    /// can be retried without reversing the confirmation.
    pub fn confirm(&mut self, id: Uuid) -> Result<PendingAction, ActionError> {
        let action = self
            .actions
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ActionError::NotFound(id))?;
        if action.status == ConfirmationStatus::Pending {
            action.status = ConfirmationStatus::Confirmed;
        }
        Ok(action.clone())
    }

    /// Cancel a pending action: it leaves the set and nothing is ever
    /// dispatched for it. A missing id or a repeated cancel is a no-op, and
    /// confirmed actions are not cancellable.
    pub fn cancel(&mut self, id: Uuid) -> bool {
        let before = self.actions.len();
        self.actions
            .retain(|a| !(a.id == id && a.status == ConfirmationStatus::Pending));
        before != self.actions.len()
    }

    /// Remove an action whose dispatch completed.
    pub fn remove(&mut self, id: Uuid) {
        self.actions.retain(|a| a.id != id);
    }

    /// Actions still waiting for a user response.
    pub fn pending(&self) -> Vec<PendingAction> {
        self.actions
            .iter()
            .filter(|a| a.status == ConfirmationStatus::Pending)
            .cloned()
            .collect()
    }

    pub fn all(&self) -> &[PendingAction] {
        &self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
