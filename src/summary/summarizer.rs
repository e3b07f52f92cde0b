use serde::{Deserialize, Serialize};
use tracing::info;

use crate::actions::{ActionType, IntentHint};
use crate::error::FinalizeError;
use crate::events::ConversationTurn;

/// Structured clinical summary returned by the summarization service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitSummary {
    pub visit_summary: String,
    pub chief_complaint: String,
    #[serde(default)]
    pub key_findings: Vec<String>,
    pub diagnosis: String,
    pub treatment_plan: String,
    pub follow_up: String,
    #[serde(default)]
    pub medications: Vec<String>,
}

/// Intents the summarizer found in the full transcript, beyond what was
/// caught live.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedIntents {
    #[serde(default)]
    pub schedule_followup: FollowupIntent,
    #[serde(default)]
    pub send_lab_order: LabOrderIntent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowupIntent {
    #[serde(default)]
    pub detected: bool,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabOrderIntent {
    #[serde(default)]
    pub detected: bool,
    #[serde(default)]
    pub test_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DetectedIntents {
    /// Hints carried by this response, for replay through the detector.
    pub fn hints(&self) -> Vec<IntentHint> {
        let mut hints = Vec::new();
        if self.send_lab_order.detected {
            hints.push(IntentHint {
                action_type: ActionType::LabOrder,
                date: None,
                test_type: self.send_lab_order.test_type.clone(),
                notes: self.send_lab_order.notes.clone(),
            });
        }
        if self.schedule_followup.detected {
            hints.push(IntentHint {
                action_type: ActionType::FollowUp,
                date: self.schedule_followup.date.clone(),
                test_type: None,
                notes: self.schedule_followup.notes.clone(),
            });
        }
        hints
    }
}

/// Full summarizer response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub summary: VisitSummary,
    #[serde(default)]
    pub actionables: Vec<serde_json::Value>,
    #[serde(default)]
    pub detected_intents: DetectedIntents,
}

#[derive(Debug, Serialize)]
struct SummaryRequest<'a> {
    transcript: &'a [ConversationTurn],
    instruction: &'a str,
}

/// Client for the external summarization service. The service's prompt
/// internals are not this crate's concern; only the request/response
/// contract is.
pub struct SummarizerClient {
    client: reqwest::Client,
    url: String,
    instruction: String,
}

impl SummarizerClient {
    pub fn new(client: reqwest::Client, url: String, instruction: String) -> Self {
        Self {
            client,
            url,
            instruction,
        }
    }

    /// Turn the full transcript into a structured summary. Any failure here
    /// fails the surrounding finalize as a whole.
    pub async fn summarize(
        &self,
        turns: &[ConversationTurn],
    ) -> Result<SummaryResponse, FinalizeError> {
        info!("Summarizing transcript of {} turns", turns.len());

        let response = self
            .client
            .post(&self.url)
            .json(&SummaryRequest {
                transcript: turns,
                instruction: &self.instruction,
            })
            .send()
            .await
            .map_err(|e| FinalizeError::Summarization(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FinalizeError::Summarization(format!(
                "service returned status {status}"
            )));
        }

        response
            .json::<SummaryResponse>()
            .await
            .map_err(|e| FinalizeError::Summarization(format!("malformed summary response: {e}")))
    }
}
