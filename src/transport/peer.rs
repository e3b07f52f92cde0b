use anyhow::Result;
use serde::Serialize;
use tokio::sync::mpsc;

use super::replay::ReplayPeer;
use super::state::LinkState;
use crate::config::PeerConfig;
use crate::credential::Language;

/// Remote agent configuration sent along with the negotiation request.
#[derive(Debug, Clone, Serialize)]
pub struct AgentConfig {
    pub language: Language,
    pub voice: String,
    /// Whether the agent streams back transcriptions of the local speaker
    pub transcription: bool,
}

/// Streams handed out by a peer once the media session is negotiated.
pub struct PeerStreams {
    /// Raw structured events from the agent's event channel, in arrival order
    pub events: mpsc::Receiver<serde_json::Value>,
    /// Connectivity changes of the underlying link
    pub link: mpsc::Receiver<LinkState>,
}

/// Media layer of the realtime session.
///
/// `SessionTransport` drives negotiation, the bounded handshake wait and
/// teardown around this seam. Implementations own the local capture track
/// (created disabled), the event channel and the playback sink, and must
/// release all three on `close` in order: event channel first, then the
/// connection, then playback, dropping the stream senders with them.
#[async_trait::async_trait]
pub trait RealtimePeer: Send {
    /// Acquire local capture (track disabled) and produce the local
    /// session description.
    async fn create_offer(&mut self) -> Result<String>;

    /// Apply the remote session description returned by negotiation.
    async fn apply_answer(&mut self, answer: &str) -> Result<()>;

    /// Take the inbound streams. Valid once per negotiated connection.
    fn take_streams(&mut self) -> Result<PeerStreams>;

    /// Toggle the local capture track.
    async fn set_audio_enabled(&mut self, enabled: bool) -> Result<()>;

    /// Send a structured command to the agent over the event channel.
    async fn send_command(&mut self, command: serde_json::Value) -> Result<()>;

    /// Release every owned resource.
    async fn close(&mut self) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Peer backend factory.
pub struct PeerFactory;

impl PeerFactory {
    /// Create a media backend from configuration.
    pub fn create(config: &PeerConfig) -> Result<Box<dyn RealtimePeer>> {
        match config {
            PeerConfig::Replay { script } => {
                let peer = ReplayPeer::from_script(script)?;
                Ok(Box::new(peer))
            }

            PeerConfig::Native => {
                anyhow::bail!(
                    "no native media backend is bundled with this build; \
                     use the replay backend or embed a custom RealtimePeer"
                )
            }
        }
    }
}
