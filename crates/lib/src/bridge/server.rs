use std::mem;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;

use crate::config::{self, Config};
use crate::event::{self, ActionEvent, HomeOpenedEvent, InboundEvent, MessageEvent};
use crate::inbox::{InboxStore, MessageRecord};
use crate::metadata::MetadataCache;
use crate::slack::{SlackClient, SlackError, SocketModeConnector};
use crate::status::{StatusChoice, StatusValue};
use crate::view;

const SIGNATURE_MAX_AGE_SECS: u64 = 300;

/// Shared state for the processor task and the HTTP handlers.
#[derive(Clone)]
pub struct BridgeState {
    pub config: Arc<Config>,
    pub slack: SlackClient,
    pub inbox: Arc<InboxStore>,
    pub metadata: Arc<MetadataCache>,
    pub inbound_tx: mpsc::Sender<InboundEvent>,
    pub connector_tasks: Arc<RwLock<Vec<JoinHandle<()>>>>,
    pub signing_secret: Option<String>,
}

impl BridgeState {
    pub fn new(config: Config, slack: SlackClient, inbound_tx: mpsc::Sender<InboundEvent>) -> Self {
        let signing_secret = config::resolve_signing_secret(&config);
        BridgeState {
            config: Arc::new(config),
            metadata: Arc::new(MetadataCache::new(slack.clone())),
            slack,
            inbox: Arc::new(InboxStore::new()),
            inbound_tx,
            connector_tasks: Arc::new(RwLock::new(Vec::new())),
            signing_secret,
        }
    }
}

/// Applies one inbound event to the bridge state. The single consumer task
/// runs each event to completion before taking the next.
pub async fn process_event(state: BridgeState, event: InboundEvent) {
    let outcome = match event {
        InboundEvent::Message(message) => handle_message(&state, message).await,
        InboundEvent::HomeOpened(opened) => handle_home_opened(&state, opened).await,
        InboundEvent::Action(action) => handle_action(&state, action).await,
    };
    if let Err(e) = outcome {
        log::warn!("event processing failed: {}", e);
    }
}

async fn handle_message(state: &BridgeState, event: MessageEvent) -> Result<(), SlackError> {
    let host = state.slack.host_team().await?;
    let sender = state.slack.user_info(&event.user).await?;
    let channel_id = event.channel.clone();

    if sender.team_id == host.id {
        log::debug!(
            "ignoring message {} from host team member {}",
            event.ts,
            sender.id
        );
    } else {
        log::info!(
            "storing external message {} from {} (team {})",
            event.ts,
            sender.id,
            sender.team_id
        );
        state
            .inbox
            .put(MessageRecord::admit(&host.id, &sender, event))
            .await;
    }

    // Metadata is cached even when the message is dropped.
    state.metadata.ensure_channel(&host.id, &channel_id).await?;
    state.metadata.ensure_team(&host.id).await?;
    Ok(())
}

async fn handle_home_opened(state: &BridgeState, event: HomeOpenedEvent) -> Result<(), SlackError> {
    publish_home(state, &event.view.team_id, &event.user).await
}

async fn handle_action(state: &BridgeState, action: ActionEvent) -> Result<(), SlackError> {
    let Some(value) = StatusValue::parse(&action.value) else {
        log::debug!("ignoring unparsable status value {:?}", action.value);
        return Ok(());
    };
    match value.choice {
        StatusChoice::Open => {
            // Open is the item's resting state; selecting it changes nothing.
            log::debug!("message {} left open by {}", value.message_ts, action.user);
            Ok(())
        }
        StatusChoice::Complete => {
            if !state.inbox.contains_team(&value.team_id).await {
                log::debug!("completion for unknown team {}", value.team_id);
                return Ok(());
            }
            state.inbox.remove(&value.team_id, &value.message_ts).await;
            log::info!("completed message {} for {}", value.message_ts, action.user);
            publish_home(state, &value.team_id, &action.user).await
        }
    }
}

async fn publish_home(state: &BridgeState, team_id: &str, user_id: &str) -> Result<(), SlackError> {
    let records = state.inbox.list_for(team_id).await;
    let channels = state.metadata.channels_for(team_id).await;
    let team = state.metadata.team(team_id).await;
    let view = view::render_home(user_id, &records, &channels, team.as_ref());
    state.slack.publish_home(user_id, &view).await
}

/// Runs the bridge until shutdown: resolves credentials, starts the chosen
/// ingress, and serves the HTTP routes.
pub async fn run_bridge(config: Config) -> Result<()> {
    let bot_token = config::resolve_bot_token(&config)
        .context("missing bot token (set SLACK_BOT_TOKEN or slack.botToken in the config)")?;
    let app_token = config::resolve_app_token(&config);
    let signing_secret = config::resolve_signing_secret(&config);
    if app_token.is_none() && signing_secret.is_none() {
        anyhow::bail!(
            "no ingress configured: set slack.appToken (socket mode) or slack.signingSecret (events webhook)"
        );
    }

    let slack = SlackClient::new(bot_token, app_token.clone(), config::resolve_api_base(&config));
    let (inbound_tx, mut inbound_rx) = mpsc::channel::<InboundEvent>(64);
    let state = BridgeState::new(config, slack, inbound_tx.clone());

    let state_events = state.clone();
    tokio::spawn(async move {
        while let Some(event) = inbound_rx.recv().await {
            process_event(state_events.clone(), event).await;
        }
    });

    let socket_connector = if app_token.is_some() {
        let connector = Arc::new(SocketModeConnector::new(state.slack.clone()));
        let handle = connector.clone().start(inbound_tx.clone());
        state.connector_tasks.write().await.push(handle);
        log::info!("socket mode ingress started");
        Some(connector)
    } else {
        log::info!("events webhook ingress: POST /slack/events and /slack/interactions");
        None
    };

    let app = Router::new()
        .route("/", get(health_http))
        .route("/slack/events", post(slack_events))
        .route("/slack/interactions", post(slack_interactions))
        .with_state(state.clone());

    let bind_addr = format!(
        "{}:{}",
        state.config.server.bind.trim(),
        state.config.server.port
    );
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("bridge listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(
            socket_connector,
            state.connector_tasks.clone(),
        ))
        .await
        .context("bridge server exited")?;

    log::info!("bridge stopped");
    Ok(())
}

async fn shutdown_signal(
    connector: Option<Arc<SocketModeConnector>>,
    tasks: Arc<RwLock<Vec<JoinHandle<()>>>>,
) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::info!("shutdown signal received, stopping ingress");
    if let Some(connector) = connector {
        connector.stop();
    }

    let handles = mem::take(&mut *tasks.write().await);
    for handle in handles {
        let _ = handle.await;
    }
    log::info!("connector tasks finished");
}

async fn slack_events(
    State(state): State<BridgeState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    // Without a signing secret the webhook ingress is not configured; only
    // signed requests may feed the pipeline.
    let Some(secret) = &state.signing_secret else {
        return StatusCode::FORBIDDEN.into_response();
    };
    if !verify_slack_request(secret, &headers, &body, now_unix()) {
        return StatusCode::FORBIDDEN.into_response();
    }

    let Ok(callback) = serde_json::from_slice::<Value>(&body) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    if callback.get("type").and_then(Value::as_str) == Some("url_verification") {
        let challenge = callback.get("challenge").cloned().unwrap_or(Value::Null);
        return Json(json!({ "challenge": challenge })).into_response();
    }

    match event::parse_event_callback(&callback) {
        Ok(Some(event)) => {
            if state.inbound_tx.send(event).await.is_err() {
                return StatusCode::SERVICE_UNAVAILABLE.into_response();
            }
        }
        Ok(None) => {}
        Err(e) => log::debug!("dropping invalid event: {}", e),
    }
    StatusCode::OK.into_response()
}

#[derive(Debug, Deserialize)]
struct InteractionForm {
    payload: String,
}

async fn slack_interactions(
    State(state): State<BridgeState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let Some(secret) = &state.signing_secret else {
        return StatusCode::FORBIDDEN;
    };
    if !verify_slack_request(secret, &headers, &body, now_unix()) {
        return StatusCode::FORBIDDEN;
    }

    let Ok(form) = serde_urlencoded::from_bytes::<InteractionForm>(&body) else {
        return StatusCode::BAD_REQUEST;
    };
    let Ok(payload) = serde_json::from_str::<Value>(&form.payload) else {
        return StatusCode::BAD_REQUEST;
    };

    match event::parse_interaction(&payload) {
        Ok(Some(event)) => {
            if state.inbound_tx.send(event).await.is_err() {
                return StatusCode::SERVICE_UNAVAILABLE;
            }
        }
        Ok(None) => {}
        Err(e) => log::debug!("dropping invalid interaction: {}", e),
    }
    StatusCode::OK
}

async fn health_http(State(state): State<BridgeState>) -> Json<Value> {
    let socket = !state.connector_tasks.read().await.is_empty();
    Json(json!({
        "bridge": "running",
        "ingress": if socket { "socket" } else { "events" },
        "port": state.config.server.port,
    }))
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Checks the `v0` request signature and rejects timestamps more than five
/// minutes away from `now` in either direction.
fn verify_slack_request(secret: &str, headers: &HeaderMap, body: &[u8], now: u64) -> bool {
    let Some(timestamp) = headers
        .get("x-slack-request-timestamp")
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let Some(signature) = headers
        .get("x-slack-signature")
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let Ok(ts) = timestamp.parse::<u64>() else {
        return false;
    };
    if now.abs_diff(ts) > SIGNATURE_MAX_AGE_SECS {
        return false;
    }
    verify_signature(secret, timestamp, signature, body)
}

fn verify_signature(secret: &str, timestamp: &str, provided: &str, body: &[u8]) -> bool {
    let Some(hex_sig) = provided.strip_prefix("v0=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(b"v0:");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: &str, body: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(b"v0:");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(body);
        format!("v0={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"type":"url_verification"}"#;
        let signature = sign("shhh", "1700000000", body);
        assert!(verify_signature("shhh", "1700000000", &signature, body));
    }

    #[test]
    fn rejects_tampered_body_and_wrong_secret() {
        let body = br#"{"ok":true}"#;
        let signature = sign("shhh", "1700000000", body);

        assert!(!verify_signature(
            "shhh",
            "1700000000",
            &signature,
            br#"{"ok":false}"#
        ));
        assert!(!verify_signature("other", "1700000000", &signature, body));
        assert!(!verify_signature("shhh", "1700000001", &signature, body));
        assert!(!verify_signature("shhh", "1700000000", "v0=nothex", body));
        assert!(!verify_signature(
            "shhh",
            "1700000000",
            "missing-prefix",
            body
        ));
    }

    #[test]
    fn rejects_stale_and_missing_headers() {
        let secret = "shhh";
        let ts = 1_700_000_000u64;
        let body = b"payload=%7B%7D";

        let mut headers = HeaderMap::new();
        headers.insert("x-slack-request-timestamp", ts.to_string().parse().unwrap());
        headers.insert(
            "x-slack-signature",
            sign(secret, &ts.to_string(), body).parse().unwrap(),
        );

        assert!(verify_slack_request(secret, &headers, body, ts + 10));
        assert!(!verify_slack_request(
            secret,
            &headers,
            body,
            ts + SIGNATURE_MAX_AGE_SECS + 1
        ));
        assert!(!verify_slack_request(secret, &HeaderMap::new(), body, ts));
    }
}
