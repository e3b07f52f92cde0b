use tracing::{debug, info};

use super::peer::AgentConfig;
use crate::credential::EphemeralCredential;
use crate::error::TransportError;

/// Client for the realtime negotiation endpoint: a one-shot exchange of the
/// local session description for the agent's answer, authenticated with the
/// ephemeral bearer credential.
pub struct RealtimeNegotiator {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl RealtimeNegotiator {
    pub fn new(client: reqwest::Client, url: String, model: String) -> Self {
        Self { client, url, model }
    }

    /// Exchange the offer for the agent's answer. Any non-handshake
    /// response is a hard failure.
    pub async fn negotiate(
        &self,
        offer: &str,
        credential: &EphemeralCredential,
        agent: &AgentConfig,
    ) -> Result<String, TransportError> {
        debug!("Sending session offer to {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .query(&[
                ("model", self.model.as_str()),
                ("language", agent.language.locale()),
                ("voice", agent.voice.as_str()),
                (
                    "transcription",
                    if agent.transcription { "enabled" } else { "disabled" },
                ),
            ])
            .bearer_auth(&credential.value)
            .header(reqwest::header::CONTENT_TYPE, "application/sdp")
            .body(offer.to_string())
            .send()
            .await
            .map_err(|e| TransportError::Negotiation(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(TransportError::Negotiation(format!(
                "endpoint returned {status}: {detail}"
            )));
        }

        let answer = response
            .text()
            .await
            .map_err(|e| TransportError::Negotiation(e.to_string()))?;

        if !answer.contains("v=0") {
            return Err(TransportError::Negotiation(
                "response is not a session description".to_string(),
            ));
        }

        info!("Received session answer ({} bytes)", answer.len());

        Ok(answer)
    }
}
