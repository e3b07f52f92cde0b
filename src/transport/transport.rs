use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{info, warn};

use super::negotiate::RealtimeNegotiator;
use super::peer::{PeerStreams, RealtimePeer};
use super::state::{LinkState, SessionState};
use crate::credential::EphemeralCredential;
use crate::error::TransportError;

/// Owns the single realtime connection of a conversation.
///
/// All connection state flows through one watch channel, reported
/// immediately and monotonically; inbound agent events are handed to the
/// caller as an ordered mpsc stream from `open`. The transport never
/// reconnects on its own; recovery after a drop is a manual `close()`
/// followed by a fresh `open()`.
pub struct SessionTransport {
    negotiator: RealtimeNegotiator,
    handshake_timeout: Duration,
    state_tx: watch::Sender<SessionState>,
    link: Mutex<Option<LiveLink>>,
}

struct LiveLink {
    peer: Box<dyn RealtimePeer>,
    link_task: JoinHandle<()>,
}

impl SessionTransport {
    pub fn new(negotiator: RealtimeNegotiator, handshake_timeout: Duration) -> Self {
        let (state_tx, _) = watch::channel(SessionState::Idle);
        Self {
            negotiator,
            handshake_timeout,
            state_tx,
            link: Mutex::new(None),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    /// Observe connection state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Open the realtime session: acquire the peer's local capture
    /// (disabled), negotiate with the bearer credential, and wait, bounded,
    /// for the connectivity handshake. Returns the ordered stream of raw
    /// agent events.
    ///
    /// A second `open` while a transport is live fails fast without
    /// disturbing the first.
    pub async fn open(
        &self,
        mut peer: Box<dyn RealtimePeer>,
        credential: &EphemeralCredential,
        agent: &super::peer::AgentConfig,
    ) -> Result<mpsc::Receiver<serde_json::Value>, TransportError> {
        let mut link = self.link.lock().await;
        if link.is_some() || self.state().is_active() {
            return Err(TransportError::AlreadyOpen);
        }

        info!("Opening realtime session via `{}` peer", peer.name());
        if self.state().is_terminal() {
            // Manual reconnect passes through idle.
            self.state_tx.send_replace(SessionState::Idle);
        }
        self.state_tx.send_replace(SessionState::Connecting);

        match self.establish(peer.as_mut(), credential, agent).await {
            Ok(streams) => {
                let PeerStreams { events, link: link_rx } = streams;
                self.state_tx.send_replace(SessionState::Connected);
                let link_task = tokio::spawn(watch_link(link_rx, self.state_tx.clone()));
                *link = Some(LiveLink { peer, link_task });
                info!("Realtime session connected");
                Ok(events)
            }
            Err(e) => {
                // Release whatever the peer acquired before the failure.
                if let Err(close_err) = peer.close().await {
                    warn!("Peer cleanup after failed open also failed: {}", close_err);
                }
                self.state_tx.send_replace(SessionState::Failed);
                Err(e)
            }
        }
    }

    async fn establish(
        &self,
        peer: &mut dyn RealtimePeer,
        credential: &EphemeralCredential,
        agent: &super::peer::AgentConfig,
    ) -> Result<PeerStreams, TransportError> {
        let offer = peer.create_offer().await.map_err(TransportError::Peer)?;
        let answer = self.negotiator.negotiate(&offer, credential, agent).await?;
        peer.apply_answer(&answer).await.map_err(TransportError::Peer)?;

        let mut streams = peer.take_streams().map_err(TransportError::Peer)?;

        // Bounded wait for the media link to come up.
        loop {
            let next = timeout(self.handshake_timeout, streams.link.recv())
                .await
                .map_err(|_| TransportError::HandshakeTimeout(self.handshake_timeout))?;
            match next {
                Some(LinkState::Connected) => break,
                Some(other) => return Err(TransportError::HandshakeFailed(other.to_string())),
                None => {
                    return Err(TransportError::HandshakeFailed(
                        "link stream ended".to_string(),
                    ))
                }
            }
        }

        Ok(streams)
    }

    /// Enable or disable the locally captured audio track. Disabling a
    /// torn-down transport is a no-op; enabling one is an error.
    pub async fn set_audio_enabled(&self, enabled: bool) -> Result<(), TransportError> {
        let mut link = self.link.lock().await;
        match link.as_mut() {
            Some(live) => live
                .peer
                .set_audio_enabled(enabled)
                .await
                .map_err(TransportError::Peer),
            None if !enabled => Ok(()),
            None => Err(TransportError::NotOpen),
        }
    }

    /// Send a structured command (e.g. a repeat request) to the agent.
    pub async fn send_command(&self, command: serde_json::Value) -> Result<(), TransportError> {
        let mut link = self.link.lock().await;
        let live = link.as_mut().ok_or(TransportError::NotOpen)?;
        live.peer.send_command(command).await.map_err(TransportError::Peer)
    }

    /// Close the session and release every owned resource in a fixed order
    /// (audio off first, then the peer's event channel, connection and
    /// playback sink) so a fresh `open` never observes a half-torn-down
    /// predecessor. Idempotent; always lands on `idle`.
    pub async fn close(&self) {
        let mut link = self.link.lock().await;
        if let Some(mut live) = link.take() {
            if let Err(e) = live.peer.set_audio_enabled(false).await {
                warn!("Failed to disable audio during close: {}", e);
            }
            live.link_task.abort();
            if let Err(e) = live.peer.close().await {
                warn!("Peer close reported an error: {}", e);
            }
            info!("Realtime session closed");
        }
        if self.state().is_active() {
            self.state_tx.send_replace(SessionState::Closed);
        }
        self.state_tx.send_replace(SessionState::Idle);
    }
}

/// Map post-handshake link drops onto the published session state. A drop
/// always forces a terminal value; nothing here retries.
async fn watch_link(mut link_rx: mpsc::Receiver<LinkState>, state_tx: watch::Sender<SessionState>) {
    while let Some(state) = link_rx.recv().await {
        let mapped = match state {
            LinkState::Connected => SessionState::Connected,
            LinkState::Disconnected => SessionState::Disconnected,
            LinkState::Failed => SessionState::Failed,
            LinkState::Closed => SessionState::Closed,
        };
        if mapped.is_terminal() {
            warn!("Realtime link dropped: {}", mapped);
        }
        state_tx.send_replace(mapped);
        if mapped.is_terminal() {
            break;
        }
    }
}
