pub mod actions;
pub mod config;
pub mod credential;
pub mod error;
pub mod events;
pub mod http;
pub mod session;
pub mod summary;
pub mod transport;

pub use actions::{
    ActionDetector, ActionDispatcher, ActionPayload, ActionType, ConfirmationStatus,
    ExecutedAction, IntentHint, PendingAction, PendingActionSet,
};
pub use config::Config;
pub use credential::{CredentialIssuer, EphemeralCredential, Language};
pub use error::{ActionError, FinalizeError, TransportError};
pub use events::{ConversationTurn, EventInterpreter, SpeakerRole, TurnKind, TurnLog};
pub use http::{create_router, AppState};
pub use session::{InterpreterSession, SessionConfig, SessionStatus};
pub use summary::{
    ConversationRecord, ConversationStore, MemoryStore, SessionCloser, SummarizerClient,
    VisitSummary,
};
pub use transport::{
    AgentConfig, AudioGate, PeerFactory, RealtimePeer, ReplayPeer, SessionState, SessionTransport,
};
