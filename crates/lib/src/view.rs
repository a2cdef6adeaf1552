//! App Home view construction.
//!
//! Builds the Block Kit JSON for a user's inbox: a welcome line, a fixed
//! header, then one divider/section/select group per stored message, or an
//! empty state when the inbox is clear.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::inbox::MessageRecord;
use crate::richtext;
use crate::slack::{ChannelInfo, TeamInfo};
use crate::status::{StatusChoice, StatusValue};

/// Action id carried by every status select. Interactions are matched on it.
pub const STATUS_ACTION_ID: &str = "static_select-action";

const HEADER_TEXT: &str = "Please find the messages from external teams below :smile:";
const EMPTY_TEXT: &str = "*There are no messages yet* :cry:";
const STATUS_PLACEHOLDER: &str = "Select an option";
const STATUS_LABEL: &str = "Status";

/// A Block Kit text object, either `mrkdwn` or `plain_text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Text {
    #[serde(rename = "type")]
    pub typ: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<bool>,
}

impl Text {
    fn mrkdwn(text: impl Into<String>) -> Self {
        Text {
            typ: "mrkdwn".to_string(),
            text: text.into(),
            emoji: None,
        }
    }

    fn plain(text: impl Into<String>) -> Self {
        Text {
            typ: "plain_text".to_string(),
            text: text.into(),
            emoji: Some(true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub text: Text,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticSelect {
    #[serde(rename = "type")]
    pub typ: String,
    pub placeholder: Text,
    pub options: Vec<SelectOption>,
    pub action_id: String,
}

impl StaticSelect {
    /// The Open/Complete select for one inbox item. Option values carry the
    /// item's team and timestamp.
    fn status(team_id: &str, ts: &str) -> Self {
        StaticSelect {
            typ: "static_select".to_string(),
            placeholder: Text::plain(STATUS_PLACEHOLDER),
            options: vec![
                SelectOption {
                    text: Text::plain("Open"),
                    value: StatusValue::encode(team_id, ts, StatusChoice::Open),
                },
                SelectOption {
                    text: Text::plain("Complete"),
                    value: StatusValue::encode(team_id, ts, StatusChoice::Complete),
                },
            ],
            action_id: STATUS_ACTION_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
        text: Text,
    },
    Divider,
    Input {
        dispatch_action: bool,
        element: StaticSelect,
        label: Text,
    },
}

impl Block {
    fn section(text: Text) -> Self {
        Block::Section {
            block_id: None,
            text,
        }
    }
}

/// The App Home view payload for `views.publish`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeView {
    #[serde(rename = "type")]
    pub typ: String,
    pub blocks: Vec<Block>,
}

/// Renders one user's App Home from their team's records.
pub fn render_home(
    user_id: &str,
    records: &[MessageRecord],
    channels: &HashMap<String, ChannelInfo>,
    team: Option<&TeamInfo>,
) -> HomeView {
    let mut blocks = vec![
        Block::section(Text::mrkdwn(format!(
            "*Welcome home, <@{}> :house:*",
            user_id
        ))),
        Block::Section {
            block_id: Some("header".to_string()),
            text: Text::mrkdwn(HEADER_TEXT),
        },
    ];

    if records.is_empty() {
        blocks.push(Block::Divider);
        blocks.push(Block::section(Text::mrkdwn(EMPTY_TEXT)));
    } else {
        for record in records {
            blocks.push(Block::Divider);
            blocks.push(Block::section(Text::mrkdwn(message_line(
                record, channels, team,
            ))));
            blocks.push(Block::Input {
                dispatch_action: true,
                element: StaticSelect::status(&record.team_id, &record.ts),
                label: Text::plain(STATUS_LABEL),
            });
        }
    }

    HomeView {
        typ: "home".to_string(),
        blocks,
    }
}

/// One inbox line. Falls back to the raw channel id when its metadata was
/// never cached, and to an unlinked `#name` when the team url is unknown.
fn message_line(
    record: &MessageRecord,
    channels: &HashMap<String, ChannelInfo>,
    team: Option<&TeamInfo>,
) -> String {
    let channel_name = channels
        .get(&record.channel_id)
        .map(|info| info.name.as_str())
        .unwrap_or(record.channel_id.as_str());
    let conversation = match team {
        Some(team) => format!(
            "<{}archives/{}|#{}>",
            team.url, record.channel_id, channel_name
        ),
        None => format!("#{}", channel_name),
    };
    let body = richtext::first_leaf_text(&record.event.blocks).unwrap_or("");
    format!("*<@{}>* in *{}* \n {}", record.sender_id, conversation, body)
}
