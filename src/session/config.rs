use serde::{Deserialize, Serialize};

use crate::credential::Language;
use crate::events::SpeakerRole;
use crate::transport::AgentConfig;

/// Configuration for one interpreting session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier (e.g. "session-7f9c…")
    pub session_id: String,

    /// Which human participant this device belongs to
    pub human_role: SpeakerRole,

    /// The human participant's language
    pub language: Language,

    /// Patient identifier carried into the conversation record
    pub patient_id: Option<String>,

    /// Agent voice preset
    pub voice: String,

    /// Whether the agent streams back transcriptions of local speech
    pub transcription: bool,
}

impl SessionConfig {
    /// Agent configuration sent with the negotiation request.
    pub fn agent(&self) -> AgentConfig {
        AgentConfig {
            language: self.language,
            voice: self.voice.clone(),
            transcription: self.transcription,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("session-{}", uuid::Uuid::new_v4()),
            human_role: SpeakerRole::Clinician,
            language: Language::En,
            patient_id: None,
            voice: "verse".to_string(),
            transcription: true,
        }
    }
}
