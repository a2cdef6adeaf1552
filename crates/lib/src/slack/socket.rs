//! Socket mode connector.
//!
//! Opens a websocket via `apps.connections.open`, acks every envelope, and
//! forwards events and interactions to the bridge's inbound queue. The loop
//! reconnects until stopped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::event::{self, EventError, InboundEvent};

use super::SlackClient;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Deserialize)]
struct SocketFrame {
    #[serde(rename = "type", default)]
    typ: String,
    #[serde(default)]
    envelope_id: Option<String>,
    #[serde(default)]
    payload: Value,
}

pub struct SocketModeConnector {
    slack: SlackClient,
    running: AtomicBool,
}

impl SocketModeConnector {
    pub fn new(slack: SlackClient) -> Self {
        SocketModeConnector {
            slack,
            running: AtomicBool::new(false),
        }
    }

    pub fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Spawns the connector loop. It keeps reconnecting until [`stop`] is
    /// called.
    ///
    /// [`stop`]: SocketModeConnector::stop
    pub fn start(self: Arc<Self>, inbound_tx: mpsc::Sender<InboundEvent>) -> JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        log::info!("socket mode: starting connector loop");
        tokio::spawn(run_socket_loop(self, inbound_tx))
    }
}

async fn run_socket_loop(
    connector: Arc<SocketModeConnector>,
    inbound_tx: mpsc::Sender<InboundEvent>,
) {
    while connector.running() {
        let url = match connector.slack.connections_open().await {
            Ok(url) => url,
            Err(e) => {
                log::warn!("socket mode: failed to open connection: {}", e);
                sleep(RECONNECT_DELAY).await;
                continue;
            }
        };
        if let Err(e) = run_socket_session(&connector, &url, &inbound_tx).await {
            log::debug!("socket mode: session ended: {}", e);
            if connector.running() {
                sleep(RECONNECT_DELAY).await;
            }
        }
    }
    log::info!("socket mode: connector loop stopped");
}

async fn run_socket_session(
    connector: &SocketModeConnector,
    url: &str,
    inbound_tx: &mpsc::Sender<InboundEvent>,
) -> Result<(), String> {
    let (stream, _) = connect_async(url).await.map_err(|e| e.to_string())?;
    let (mut sink, mut source) = stream.split();

    loop {
        if !connector.running() {
            return Ok(());
        }
        tokio::select! {
            message = source.next() => {
                let Some(message) = message else {
                    return Err("connection closed".to_string());
                };
                let message = message.map_err(|e| e.to_string())?;
                let text = match message {
                    WsMessage::Text(text) => text,
                    WsMessage::Close(_) => return Err("server sent a close frame".to_string()),
                    _ => continue,
                };
                let frame: SocketFrame = match serde_json::from_str(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        log::debug!("socket mode: unreadable frame: {}", e);
                        continue;
                    }
                };
                if let Some(envelope_id) = &frame.envelope_id {
                    let ack = json!({ "envelope_id": envelope_id }).to_string();
                    sink.send(WsMessage::Text(ack)).await.map_err(|e| e.to_string())?;
                }
                match frame.typ.as_str() {
                    "hello" => log::info!("socket mode: connected"),
                    "disconnect" => {
                        log::info!("socket mode: server asked us to reconnect");
                        return Ok(());
                    }
                    "events_api" => {
                        forward(event::parse_event_callback(&frame.payload), inbound_tx).await?;
                    }
                    "interactive" => {
                        forward(event::parse_interaction(&frame.payload), inbound_tx).await?;
                    }
                    other => log::debug!("socket mode: ignoring frame type {:?}", other),
                }
            }
            _ = sleep(Duration::from_secs(1)) => {}
        }
    }
}

async fn forward(
    parsed: Result<Option<InboundEvent>, EventError>,
    inbound_tx: &mpsc::Sender<InboundEvent>,
) -> Result<(), String> {
    match parsed {
        Ok(Some(event)) => inbound_tx
            .send(event)
            .await
            .map_err(|_| "inbound queue closed".to_string()),
        Ok(None) => Ok(()),
        Err(e) => {
            log::debug!("socket mode: dropping invalid event: {}", e);
            Ok(())
        }
    }
}
