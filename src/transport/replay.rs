use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::peer::{PeerStreams, RealtimePeer};
use super::state::LinkState;

/// One scripted step: wait, then emit the event.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayStep {
    #[serde(default)]
    pub delay_ms: u64,
    pub event: serde_json::Value,
}

/// Scripted media backend.
///
/// Reports the link as connected and replays a fixed sequence of agent
/// events. Used for local development and tests; no audio leaves the
/// process, so the capture toggle is tracked but otherwise inert.
pub struct ReplayPeer {
    steps: Vec<ReplayStep>,
    streams: Option<PeerStreams>,
    pump: Option<JoinHandle<()>>,
    audio_enabled: bool,
    negotiated: bool,
}

// Minimal but well-formed local description; nothing parses it beyond the
// `v=0` check the real endpoints apply.
const REPLAY_OFFER: &str =
    "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=replay\r\nt=0 0\r\nm=audio 9 UDP/TLS/RTP/SAVPF 111\r\n";

impl ReplayPeer {
    pub fn new(steps: Vec<ReplayStep>) -> Self {
        Self {
            steps,
            streams: None,
            pump: None,
            audio_enabled: false,
            negotiated: false,
        }
    }

    /// Load a script: a JSON array of `{delay_ms?, event}` steps.
    pub fn from_script(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read replay script {:?}", path.as_ref()))?;
        let steps: Vec<ReplayStep> =
            serde_json::from_str(&raw).context("Malformed replay script")?;
        Ok(Self::new(steps))
    }
}

#[async_trait::async_trait]
impl RealtimePeer for ReplayPeer {
    async fn create_offer(&mut self) -> Result<String> {
        Ok(REPLAY_OFFER.to_string())
    }

    async fn apply_answer(&mut self, answer: &str) -> Result<()> {
        if !answer.contains("v=0") {
            anyhow::bail!("replay peer received a non-SDP answer");
        }

        let (event_tx, event_rx) = mpsc::channel(64);
        let (link_tx, link_rx) = mpsc::channel(8);

        let steps = self.steps.clone();
        let pump = tokio::spawn(async move {
            if link_tx.send(LinkState::Connected).await.is_err() {
                return;
            }
            for step in steps {
                if step.delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(step.delay_ms)).await;
                }
                if event_tx.send(step.event).await.is_err() {
                    return;
                }
            }
            // Script exhausted; the link stays up until the transport
            // closes us.
            std::future::pending::<()>().await;
        });

        self.pump = Some(pump);
        self.streams = Some(PeerStreams {
            events: event_rx,
            link: link_rx,
        });
        self.negotiated = true;

        Ok(())
    }

    fn take_streams(&mut self) -> Result<PeerStreams> {
        self.streams
            .take()
            .ok_or_else(|| anyhow::anyhow!("replay peer streams already taken or not negotiated"))
    }

    async fn set_audio_enabled(&mut self, enabled: bool) -> Result<()> {
        self.audio_enabled = enabled;
        Ok(())
    }

    async fn send_command(&mut self, command: serde_json::Value) -> Result<()> {
        if !self.negotiated {
            anyhow::bail!("replay peer is not connected");
        }
        info!("Replay peer swallowed command: {}", command);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.audio_enabled = false;
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.streams = None;
        self.negotiated = false;
        Ok(())
    }

    fn name(&self) -> &str {
        "replay"
    }
}
