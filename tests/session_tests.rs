// End-to-end session tests driven through the scripted replay peer:
// credential issuance, negotiation, the event pump, live detection,
// confirm/cancel dispatch accounting and finalization.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, routing::post, Json, Router};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use medinterp::actions::{ActionDispatcher, ActionType, ConfirmationStatus};
use medinterp::credential::CredentialIssuer;
use medinterp::error::{FinalizeError, TransportError};
use medinterp::session::{InterpreterSession, SessionConfig};
use medinterp::summary::{ConversationStore, MemoryStore, SessionCloser, SummarizerClient};
use medinterp::config::PeerConfig;
use medinterp::transport::{
    PeerFactory, RealtimeNegotiator, ReplayPeer, ReplayStep, SessionState, SessionTransport,
};
use medinterp::SpeakerRole;

const STUB_ANSWER: &str = "v=0\r\no=- stub 0 IN IP4 127.0.0.1\r\ns=answer\r\n";

type Hits = Arc<Mutex<Vec<serde_json::Value>>>;

struct Stubs {
    credential_url: String,
    negotiation_url: String,
    negotiation_hits: Arc<AtomicUsize>,
    webhook_url: String,
    webhook_hits: Hits,
    summarizer_url: String,
}

async fn spawn_stubs(credential_status: StatusCode) -> Stubs {
    let negotiation_hits = Arc::new(AtomicUsize::new(0));
    let webhook_hits: Hits = Arc::new(Mutex::new(Vec::new()));

    let neg_hits = Arc::clone(&negotiation_hits);
    let hook_hits = Arc::clone(&webhook_hits);

    let app = Router::new()
        .route(
            "/ephemeral-key",
            post(move || async move {
                (
                    credential_status,
                    Json(serde_json::json!({
                        "ephemeral_key": {"value": "stub-credential", "expires_at": 4102444800i64}
                    })),
                )
            }),
        )
        .route(
            "/negotiate",
            post(move || {
                let neg_hits = Arc::clone(&neg_hits);
                async move {
                    neg_hits.fetch_add(1, Ordering::SeqCst);
                    STUB_ANSWER
                }
            }),
        )
        .route(
            "/hook",
            post(move |Json(body): Json<serde_json::Value>| {
                let hook_hits = Arc::clone(&hook_hits);
                async move {
                    hook_hits.lock().await.push(body);
                    StatusCode::OK
                }
            }),
        )
        .route(
            "/summarize",
            post(|| async {
                Json(serde_json::json!({
                    "summary": {
                        "visitSummary": "Patient reported a headache; labs ordered.",
                        "chiefComplaint": "Headache",
                        "keyFindings": [],
                        "diagnosis": "Pending labs",
                        "treatmentPlan": "Blood work",
                        "followUp": "1 week",
                        "medications": []
                    },
                    "actionables": [],
                    "detectedIntents": {
                        "scheduleFollowup": {"detected": true, "date": "next week"},
                        "sendLabOrder": {"detected": true, "testType": "CBC"}
                    }
                }))
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    Stubs {
        credential_url: format!("http://{}/ephemeral-key", addr),
        negotiation_url: format!("http://{}/negotiate", addr),
        negotiation_hits,
        webhook_url: format!("http://{}/hook", addr),
        webhook_hits,
        summarizer_url: format!("http://{}/summarize", addr),
    }
}

fn build_session(stubs: &Stubs, store: Arc<MemoryStore>) -> InterpreterSession {
    let client = reqwest::Client::new();

    let issuer = Arc::new(CredentialIssuer::new(
        client.clone(),
        stubs.credential_url.clone(),
    ));
    let dispatcher = Arc::new(ActionDispatcher::from_urls(
        client.clone(),
        stubs.webhook_url.clone(),
        stubs.webhook_url.clone(),
    ));
    let dyn_store: Arc<dyn ConversationStore> = store;
    let closer = Arc::new(SessionCloser::new(
        SummarizerClient::new(
            client.clone(),
            stubs.summarizer_url.clone(),
            "summarize the visit".to_string(),
        ),
        dyn_store,
    ));

    let negotiator =
        RealtimeNegotiator::new(client, stubs.negotiation_url.clone(), "test-model".to_string());
    let transport = SessionTransport::new(negotiator, Duration::from_secs(2));

    let config = SessionConfig {
        session_id: "session-under-test".to_string(),
        patient_id: Some("P-1042".to_string()),
        ..SessionConfig::default()
    };

    InterpreterSession::new(
        config,
        transport,
        issuer,
        dispatcher,
        closer,
    )
    .unwrap()
}

fn scripted_peer(events: Vec<serde_json::Value>) -> Box<ReplayPeer> {
    let steps = events
        .into_iter()
        .map(|event| ReplayStep { delay_ms: 0, event })
        .collect();
    Box::new(ReplayPeer::new(steps))
}

async fn wait_for_turns(session: &InterpreterSession, count: usize) {
    for _ in 0..200 {
        if session.turns().await.len() >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("transcript never reached {count} turns");
}

async fn wait_for_pending(session: &InterpreterSession) {
    for _ in 0..200 {
        if !session.pending_actions().await.is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no pending action surfaced within 2s");
}

#[tokio::test]
async fn test_scripted_conversation_builds_ordered_transcript() {
    let stubs = spawn_stubs(StatusCode::OK).await;
    let session = build_session(&stubs, Arc::new(MemoryStore::new()));

    let peer = scripted_peer(vec![
        serde_json::json!({
            "type": "conversation.item.input_audio_transcription.completed",
            "transcript": "Hello, how are you feeling today?"
        }),
        serde_json::json!({
            "type": "response.audio_transcript.done",
            "transcript": "Hola, ¿cómo se siente hoy?",
            "translation": "Hello, how are you feeling today?"
        }),
        serde_json::json!({
            "type": "conversation.item.input_audio_transcription.completed",
            "transcript": "Me duele mucho la cabeza."
        }),
    ]);

    session.start(peer).await.unwrap();
    assert_eq!(session.transport().state(), SessionState::Connected);

    wait_for_turns(&session, 3).await;

    let turns = session.turns().await;
    assert_eq!(turns[0].role, SpeakerRole::Clinician);
    assert_eq!(turns[0].text, "Hello, how are you feeling today?");
    assert_eq!(turns[1].role, SpeakerRole::Agent);
    assert_eq!(turns[2].text, "Me duele mucho la cabeza.");
    let ids: Vec<u64> = turns.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);

    session.stop().await;
    assert_eq!(session.transport().state(), SessionState::Idle);
}

#[tokio::test]
async fn test_keyword_detection_confirm_and_dispatch() {
    let stubs = spawn_stubs(StatusCode::OK).await;
    let session = build_session(&stubs, Arc::new(MemoryStore::new()));

    // The agent relays the clinician's wish to order a blood test.
    let peer = scripted_peer(vec![serde_json::json!({
        "type": "response.audio_transcript.done",
        "transcript": "I would like to order a blood test"
    })]);
    session.start(peer).await.unwrap();

    wait_for_pending(&session).await;

    let pending = session.pending_actions().await;
    assert_eq!(pending.len(), 1);
    let action = &pending[0];
    assert_eq!(action.action_type, ActionType::LabOrder);
    assert_eq!(action.status, ConfirmationStatus::Pending);
    assert_eq!(action.description, "Blood test order detected");

    let executed = session.confirm_action(action.id).await.unwrap();
    assert!(executed.success);
    assert_eq!(executed.action_type, ActionType::LabOrder);

    // Exactly one delivery, carrying the normalized envelope.
    let hits = stubs.webhook_hits.lock().await;
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["actionType"], "lab_order");
    assert!(hits[0]["timestamp"].is_string());
    drop(hits);

    // The action left the pending set and the outcome is on the record.
    assert!(session.pending_actions().await.is_empty());
    assert_eq!(session.executed_actions().await.len(), 1);
    let turns = session.turns().await;
    let last = turns.last().unwrap();
    assert_eq!(last.role, SpeakerRole::SystemInfo);
    assert!(last.text.contains("Lab Order sent to the system."));

    session.stop().await;
}

#[tokio::test]
async fn test_cancelled_action_never_reaches_the_wire() {
    let stubs = spawn_stubs(StatusCode::OK).await;
    let session = build_session(&stubs, Arc::new(MemoryStore::new()));

    let peer = scripted_peer(vec![serde_json::json!({
        "type": "conversation.item.input_audio_transcription.completed",
        "transcript": "I would like to order a blood test"
    })]);
    session.start(peer).await.unwrap();

    wait_for_pending(&session).await;
    let action_id = session.pending_actions().await[0].id;

    assert!(session.cancel_action(action_id).await);
    assert!(session.pending_actions().await.is_empty());
    assert!(session.executed_actions().await.is_empty());
    assert!(stubs.webhook_hits.lock().await.is_empty());

    // Cancelling again, or an unknown id, is a no-op.
    assert!(!session.cancel_action(action_id).await);
    assert!(!session.cancel_action(uuid::Uuid::new_v4()).await);

    session.stop().await;
}

#[tokio::test]
async fn test_structured_hint_carries_fields_into_the_pending_action() {
    let stubs = spawn_stubs(StatusCode::OK).await;
    let session = build_session(&stubs, Arc::new(MemoryStore::new()));

    let peer = scripted_peer(vec![
        serde_json::json!({
            "type": "intent.detected",
            "intent": "lab_order",
            "testType": "CBC"
        }),
        serde_json::json!({
            "type": "conversation.item.input_audio_transcription.completed",
            "transcript": "Nothing actionable here"
        }),
    ]);
    session.start(peer).await.unwrap();

    wait_for_pending(&session).await;

    let pending = session.pending_actions().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].action_type, ActionType::LabOrder);
    assert_eq!(pending[0].payload.test_type.as_deref(), Some("CBC"));

    session.stop().await;
}

#[tokio::test]
async fn test_finalize_lifecycle() {
    let stubs = spawn_stubs(StatusCode::OK).await;
    let store = Arc::new(MemoryStore::new());
    let session = build_session(&stubs, Arc::clone(&store));

    let peer = scripted_peer(vec![serde_json::json!({
        "type": "conversation.item.input_audio_transcription.completed",
        "transcript": "I would like to order a blood test"
    })]);
    session.start(peer).await.unwrap();
    wait_for_pending(&session).await;

    // Still connected: finalize must refuse rather than stop the session.
    let err = session.finalize().await.unwrap_err();
    assert!(matches!(err, FinalizeError::SessionActive));
    assert_eq!(session.transport().state(), SessionState::Connected);

    let action_id = session.pending_actions().await[0].id;
    session.confirm_action(action_id).await.unwrap();

    session.stop().await;
    assert_eq!(session.transport().state(), SessionState::Idle);

    let conversation_id = session.finalize().await.unwrap();

    let record = store.get(conversation_id).await.unwrap().expect("persisted");
    assert_eq!(record.patient_id.as_deref(), Some("P-1042"));
    assert_eq!(record.executed_actions.len(), 1);
    assert!(!record.transcript.is_empty());

    // A lab order was seen live, so only the follow-up intent surfaces,
    // pending, never auto-dispatched.
    let pending = session.pending_actions().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].action_type, ActionType::FollowUp);
    assert_eq!(pending[0].status, ConfirmationStatus::Pending);
    assert_eq!(stubs.webhook_hits.lock().await.len(), 1, "no extra dispatch");

    // Finalize is idempotent once a record exists.
    let again = session.finalize().await.unwrap();
    assert_eq!(again, conversation_id);
    assert_eq!(store.len().await, 1);
    assert!(store.get(conversation_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_credential_failure_fails_open_before_negotiation() {
    let stubs = spawn_stubs(StatusCode::INTERNAL_SERVER_ERROR).await;
    let session = build_session(&stubs, Arc::new(MemoryStore::new()));

    let err = session.start(scripted_peer(vec![])).await.unwrap_err();

    assert!(matches!(err, TransportError::Credential(_)));
    assert_eq!(
        stubs.negotiation_hits.load(Ordering::SeqCst),
        0,
        "no negotiation attempt without a credential"
    );
    assert_eq!(session.transport().state(), SessionState::Idle);
}

#[tokio::test]
async fn test_mic_intent_is_safe_in_every_transport_state() {
    let stubs = spawn_stubs(StatusCode::OK).await;
    let session = build_session(&stubs, Arc::new(MemoryStore::new()));

    // Idle: intent is recorded but nothing can be enabled.
    session.set_recording(true).await.unwrap();
    session.set_recording(false).await.unwrap();

    session.start(scripted_peer(vec![])).await.unwrap();
    session.set_recording(true).await.unwrap();
    session.set_recording(false).await.unwrap();

    session.stop().await;
    session.set_recording(false).await.unwrap();
}

#[test]
fn test_replay_script_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("script.json");
    std::fs::write(
        &path,
        r#"[{"delay_ms": 5, "event": {"type": "output_audio_buffer.started"}}]"#,
    )
    .unwrap();
    assert!(ReplayPeer::from_script(&path).is_ok());

    // Malformed or missing scripts are rejected up front.
    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "{not json").unwrap();
    assert!(ReplayPeer::from_script(&bad).is_err());
    assert!(ReplayPeer::from_script(dir.path().join("missing.json")).is_err());
}

#[test]
fn test_peer_factory_backend_selection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("script.json");
    std::fs::write(&path, "[]").unwrap();

    let replay = PeerConfig::Replay {
        script: path.to_string_lossy().into_owned(),
    };
    assert!(PeerFactory::create(&replay).is_ok());

    // No native media backend is bundled with this build.
    assert!(PeerFactory::create(&PeerConfig::Native).is_err());
}
