//! Realtime session transport
//!
//! One bidirectional audio+event connection to the remote interpreting
//! agent per conversation:
//! - Credential-authenticated offer/answer negotiation
//! - A bounded connectivity handshake
//! - A watch stream of connection states and an ordered stream of inbound
//!   agent events
//! - Fixed-order teardown, and an audio gate over the local capture track
//!
//! The media layer itself sits behind the `RealtimePeer` trait; the crate
//! bundles the scripted `ReplayPeer` backend.

mod gate;
mod negotiate;
mod peer;
mod replay;
mod state;
mod transport;

pub use gate::AudioGate;
pub use negotiate::RealtimeNegotiator;
pub use peer::{AgentConfig, PeerFactory, PeerStreams, RealtimePeer};
pub use replay::{ReplayPeer, ReplayStep};
pub use state::{LinkState, SessionState};
pub use transport::SessionTransport;
