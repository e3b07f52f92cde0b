use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::actions::ActionDispatcher;
use crate::config::Config;
use crate::credential::CredentialIssuer;
use crate::session::InterpreterSession;
use crate::summary::{ConversationStore, MemoryStore, SessionCloser, SummarizerClient};

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active interpreting sessions (session_id → session)
    pub sessions: Arc<RwLock<HashMap<String, Arc<InterpreterSession>>>>,

    pub issuer: Arc<CredentialIssuer>,
    pub dispatcher: Arc<ActionDispatcher>,
    pub closer: Arc<SessionCloser>,
    pub store: Arc<dyn ConversationStore>,
    pub http_client: reqwest::Client,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the shared service clients from configuration.
    pub fn from_config(config: Config) -> Self {
        let http_client = reqwest::Client::new();

        let issuer = Arc::new(CredentialIssuer::new(
            http_client.clone(),
            config.realtime.credential_url.clone(),
        ));

        let dispatcher = Arc::new(ActionDispatcher::from_urls(
            http_client.clone(),
            config.webhooks.lab_order_url.clone(),
            config.webhooks.follow_up_url.clone(),
        ));

        let store: Arc<dyn ConversationStore> = Arc::new(MemoryStore::new());

        let summarizer = SummarizerClient::new(
            http_client.clone(),
            config.summarizer.url.clone(),
            config.summarizer.instruction.clone(),
        );
        let closer = Arc::new(SessionCloser::new(summarizer, Arc::clone(&store)));

        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            issuer,
            dispatcher,
            closer,
            store,
            http_client,
            config: Arc::new(config),
        }
    }
}
