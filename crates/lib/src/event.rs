//! Parsing of inbound Slack payloads into the events the bridge acts on.
//!
//! Both ingress paths (socket mode and the events webhook) funnel raw JSON
//! through the functions here, so validation happens once at the boundary
//! regardless of transport.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::richtext::RichTextNode;
use crate::view;

/// A Slack payload reduced to the cases the bridge handles.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Message(MessageEvent),
    HomeOpened(HomeOpenedEvent),
    Action(ActionEvent),
}

/// A payload matched a handled type but its body was missing required fields.
#[derive(Debug, Error)]
#[error("invalid {kind} event: {source}")]
pub struct EventError {
    pub kind: &'static str,
    #[source]
    pub source: serde_json::Error,
}

/// A channel message from the Events API. Deserialization fails for subtypes
/// without a human sender (bot posts, join notices), which keeps them out of
/// the admission path entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageEvent {
    pub user: String,
    /// Team the sender posted from.
    pub team: String,
    pub client_msg_id: String,
    pub ts: String,
    pub channel: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub blocks: Vec<RichTextNode>,
}

/// A user opened the app's Home tab.
#[derive(Debug, Clone, Deserialize)]
pub struct HomeOpenedEvent {
    pub user: String,
    pub view: OpenedView,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenedView {
    /// Workspace whose Home tab was opened.
    pub team_id: String,
}

/// One selection from the status select on an inbox item.
#[derive(Debug, Clone)]
pub struct ActionEvent {
    pub user: String,
    /// Raw option value, decoded by [`crate::status::StatusValue::parse`].
    pub value: String,
}

/// Extracts a handled event from an `event_callback` envelope.
///
/// Returns `Ok(None)` for envelope or event types the bridge does not act on
/// and `Err` only when a handled type fails validation.
pub fn parse_event_callback(callback: &Value) -> Result<Option<InboundEvent>, EventError> {
    if callback.get("type").and_then(Value::as_str) != Some("event_callback") {
        return Ok(None);
    }
    let Some(event) = callback.get("event") else {
        return Ok(None);
    };
    match event.get("type").and_then(Value::as_str) {
        Some("message") => serde_json::from_value(event.clone())
            .map(|message| Some(InboundEvent::Message(message)))
            .map_err(|source| EventError {
                kind: "message",
                source,
            }),
        Some("app_home_opened") => serde_json::from_value(event.clone())
            .map(|opened| Some(InboundEvent::HomeOpened(opened)))
            .map_err(|source| EventError {
                kind: "app_home_opened",
                source,
            }),
        _ => Ok(None),
    }
}

#[derive(Debug, Deserialize)]
struct InteractionPayload {
    user: InteractionUser,
    #[serde(default)]
    actions: Vec<InteractionAction>,
}

#[derive(Debug, Deserialize)]
struct InteractionUser {
    id: String,
}

#[derive(Debug, Deserialize)]
struct InteractionAction {
    #[serde(default)]
    action_id: String,
    #[serde(default)]
    selected_option: Option<SelectedOption>,
}

#[derive(Debug, Deserialize)]
struct SelectedOption {
    value: String,
}

/// Extracts a status selection from a `block_actions` interaction payload.
///
/// Other interaction types and actions belonging to other elements come back
/// as `Ok(None)`.
pub fn parse_interaction(payload: &Value) -> Result<Option<InboundEvent>, EventError> {
    if payload.get("type").and_then(Value::as_str) != Some("block_actions") {
        return Ok(None);
    }
    let parsed: InteractionPayload =
        serde_json::from_value(payload.clone()).map_err(|source| EventError {
            kind: "block_actions",
            source,
        })?;
    let selected = parsed.actions.into_iter().find_map(|action| {
        if action.action_id != view::STATUS_ACTION_ID {
            return None;
        }
        action.selected_option
    });
    let Some(option) = selected else {
        return Ok(None);
    };
    Ok(Some(InboundEvent::Action(ActionEvent {
        user: parsed.user.id,
        value: option.value,
    })))
}
