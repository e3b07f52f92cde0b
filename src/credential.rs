use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::TransportError;

/// Language of the human participant on this device. Drives the locale the
/// interpreting agent is provisioned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Es,
    Zh,
}

impl Language {
    pub fn locale(&self) -> &'static str {
        match self {
            Language::En => "en-US",
            Language::Es => "es-ES",
            Language::Zh => "zh-CN",
        }
    }
}

/// Short-lived bearer credential for the realtime agent.
#[derive(Debug, Clone, Deserialize)]
pub struct EphemeralCredential {
    pub value: String,
    pub expires_at: i64,
}

#[derive(Debug, Deserialize)]
struct IssuerResponse {
    ephemeral_key: Option<EphemeralCredential>,
}

/// Client for the external credential issuance service.
pub struct CredentialIssuer {
    client: reqwest::Client,
    url: String,
}

impl CredentialIssuer {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }

    /// Obtain a fresh credential for the given participant language.
    ///
    /// The transport must not open without one; any issuance failure is a
    /// hard failure for the surrounding `open`.
    pub async fn issue(&self, language: Language) -> Result<EphemeralCredential, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .header("Language", language.locale())
            .send()
            .await
            .map_err(|e| TransportError::Credential(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Credential(format!(
                "issuer returned status {status}"
            )));
        }

        let body: IssuerResponse = response
            .json()
            .await
            .map_err(|e| TransportError::Credential(format!("malformed issuer response: {e}")))?;

        let credential = body
            .ephemeral_key
            .filter(|c| !c.value.is_empty())
            .ok_or_else(|| {
                TransportError::Credential("issuer response carried no ephemeral key".to_string())
            })?;

        info!(
            "Issued ephemeral credential (expires at {})",
            credential.expires_at
        );

        Ok(credential)
    }
}
