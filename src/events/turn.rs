use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced an utterance or notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerRole {
    Clinician,
    Patient,
    /// The remote interpreting agent
    Agent,
    Tool,
    SystemInfo,
}

/// What a turn records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnKind {
    Original,
    Translation,
    Info,
}

/// One utterance or system notice in the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Unique within the session, monotonically increasing
    pub id: u64,

    pub role: SpeakerRole,

    pub text: String,

    /// Explicit rendering in the other participant's language, when the
    /// agent supplies one
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub translation: Option<String>,

    pub timestamp: DateTime<Utc>,

    pub kind: TurnKind,
}

/// Append-only turn list. Turns are never mutated or reordered once
/// created; identifiers are allocated here and never reused.
#[derive(Debug, Default)]
pub struct TurnLog {
    turns: Vec<ConversationTurn>,
    next_id: u64,
}

impl TurnLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn, allocating its identifier. Returns a copy of the
    /// appended turn.
    pub fn append(
        &mut self,
        role: SpeakerRole,
        text: impl Into<String>,
        kind: TurnKind,
    ) -> ConversationTurn {
        self.append_translated(role, text, None, kind)
    }

    pub fn append_translated(
        &mut self,
        role: SpeakerRole,
        text: impl Into<String>,
        translation: Option<String>,
        kind: TurnKind,
    ) -> ConversationTurn {
        let turn = ConversationTurn {
            id: self.next_id,
            role,
            text: text.into(),
            translation,
            timestamp: Utc::now(),
            kind,
        };
        self.next_id += 1;
        self.turns.push(turn.clone());
        turn
    }

    /// Informational notice attributed to the system.
    pub fn append_info(&mut self, text: impl Into<String>) -> ConversationTurn {
        self.append(SpeakerRole::SystemInfo, text, TurnKind::Info)
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn snapshot(&self) -> Vec<ConversationTurn> {
        self.turns.clone()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
