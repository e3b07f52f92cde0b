use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::types::{ActionPayload, ActionType, ConfirmationStatus, ExecutedAction, PendingAction};
use crate::error::ActionError;

/// Normalized envelope delivered to an action's external endpoint.
#[derive(Debug, Serialize)]
pub struct ActionEnvelope<'a> {
    #[serde(rename = "actionType")]
    pub action_type: ActionType,
    pub data: &'a ActionPayload,
    pub timestamp: String,
}

/// Delivers confirmed actions to their statically configured endpoints.
///
/// One blocking call per action, no automatic retry. Any HTTP response
/// counts as delivery for accounting, with `success` mirroring the status
/// class; a transport-level failure (unreachable endpoint) surfaces as an
/// error and records nothing.
pub struct ActionDispatcher {
    client: reqwest::Client,
    routes: HashMap<ActionType, String>,
}

impl ActionDispatcher {
    pub fn new(client: reqwest::Client, routes: HashMap<ActionType, String>) -> Self {
        Self { client, routes }
    }

    /// Route table covering the built-in action set.
    pub fn from_urls(client: reqwest::Client, lab_order_url: String, follow_up_url: String) -> Self {
        let mut routes = HashMap::new();
        routes.insert(ActionType::LabOrder, lab_order_url);
        routes.insert(ActionType::FollowUp, follow_up_url);
        Self::new(client, routes)
    }

    /// Execute a confirmed action. Never called for cancelled actions; an
    /// unconfirmed one is rejected outright.
    pub async fn execute(&self, action: &PendingAction) -> Result<ExecutedAction, ActionError> {
        if action.status != ConfirmationStatus::Confirmed {
            return Err(ActionError::NotConfirmed(action.id));
        }

        let url = self
            .routes
            .get(&action.action_type)
            .ok_or(ActionError::Unrouted(action.action_type))?;

        let envelope = ActionEnvelope {
            action_type: action.action_type,
            data: &action.payload,
            timestamp: Utc::now().to_rfc3339(),
        };

        info!(
            "Dispatching `{}` action {} to {}",
            action.action_type, action.id, url
        );

        let response = self
            .client
            .post(url)
            .json(&envelope)
            .send()
            .await
            .map_err(|source| ActionError::Delivery {
                id: action.id,
                action_type: action.action_type,
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                "Action endpoint for `{}` returned status {}",
                action.action_type, status
            );
        }

        Ok(ExecutedAction {
            action_type: action.action_type,
            success: status.is_success(),
            metadata: action.payload.clone(),
        })
    }
}
