use std::collections::HashMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::summarizer::{DetectedIntents, VisitSummary};
use crate::actions::ExecutedAction;
use crate::events::ConversationTurn;

/// Persisted outcome of one conversation. Created once by the session
/// closer; read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub id: Uuid,
    pub transcript: Vec<ConversationTurn>,
    pub summary: VisitSummary,
    pub actionables: Vec<serde_json::Value>,
    pub detected_intents: DetectedIntents,
    pub executed_actions: Vec<ExecutedAction>,
    pub patient_id: Option<String>,
    pub duration_secs: f64,
    pub created_at: DateTime<Utc>,
}

/// Storage boundary for conversation records.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn insert(&self, record: &ConversationRecord) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<ConversationRecord>>;
}

/// In-memory store. Rows are kept JSON-text-encoded, the way the backing
/// database keeps them, and decoded on every read.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<Uuid, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn insert(&self, record: &ConversationRecord) -> Result<()> {
        let row = serde_json::to_string(record).context("Failed to encode conversation record")?;
        self.rows.write().await.insert(record.id, row);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<ConversationRecord>> {
        let rows = self.rows.read().await;
        match rows.get(&id) {
            Some(row) => {
                let record =
                    serde_json::from_str(row).context("Failed to decode conversation record")?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}
