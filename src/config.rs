use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub realtime: RealtimeConfig,
    pub webhooks: WebhookConfig,
    pub summarizer: SummarizerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Credential issuance endpoint
    pub credential_url: String,

    /// Negotiation endpoint accepting a session-description offer
    pub negotiation_url: String,

    /// Agent model identifier sent with the negotiation request
    pub model: String,

    /// Bounded wait for the connectivity handshake
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_secs: u64,

    /// Media backend used for new sessions
    pub peer: PeerConfig,
}

/// Selects the media backend a session's transport is built on.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum PeerConfig {
    /// Platform WebRTC stack (not bundled; see `PeerFactory`)
    Native,
    /// Scripted agent for local development and tests
    Replay { script: String },
}

/// Per-action delivery targets. Statically configured by deployment,
/// never by user input.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    pub lab_order_url: String,
    pub follow_up_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizerConfig {
    pub url: String,

    /// System instruction forwarded verbatim with every request
    #[serde(default = "default_instruction")]
    pub instruction: String,
}

fn default_handshake_timeout() -> u64 {
    10
}

fn default_instruction() -> String {
    "Summarize the visit and list every detected clinical intent.".to_string()
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("MEDINTERP").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
