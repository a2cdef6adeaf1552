//! In-memory inbox of admitted external messages.
//!
//! Records are grouped by host team and keyed by message timestamp. Within a
//! team the map keeps insertion order, and re-admitting the same timestamp
//! (an edited message) replaces the record without moving it.

use std::collections::HashMap;

use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::event::MessageEvent;
use crate::slack::UserInfo;

/// Stock Slack avatar used when a sender has no profile image.
pub const DEFAULT_AVATAR_URL: &str =
    "https://a.slack-edge.com/df10d/img/avatars/ava_0002-72.png";

/// One admitted message, as shown in the host team's App Home.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    /// Host team whose members see this record.
    pub team_id: String,
    /// Message timestamp, unique within a channel.
    pub ts: String,
    /// The external sender.
    pub sender_id: String,
    pub sender_avatar: String,
    /// Fallback plain text from the event.
    pub text: String,
    pub channel_id: String,
    /// The validated event as received, kept for rich text rendering.
    pub event: MessageEvent,
}

impl MessageRecord {
    /// Builds a record for a message that passed admission, attributing it to
    /// the host team whose inbox it lands in.
    pub fn admit(team_id: impl Into<String>, sender: &UserInfo, event: MessageEvent) -> Self {
        MessageRecord {
            team_id: team_id.into(),
            ts: event.ts.clone(),
            sender_id: sender.id.clone(),
            sender_avatar: sender
                .profile
                .image_72
                .clone()
                .unwrap_or_else(|| DEFAULT_AVATAR_URL.to_string()),
            text: event.text.clone(),
            channel_id: event.channel.clone(),
            event,
        }
    }
}

/// Shared store of inbox records, one ordered map per host team.
#[derive(Debug)]
pub struct InboxStore {
    inner: RwLock<HashMap<String, IndexMap<String, MessageRecord>>>,
}

impl InboxStore {
    pub fn new() -> Self {
        InboxStore {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts or replaces the record for its `(team, ts)` slot. A replaced
    /// record keeps its position in the team's inbox.
    pub async fn put(&self, record: MessageRecord) {
        let team_id = record.team_id.clone();
        let ts = record.ts.clone();
        let mut inner = self.inner.write().await;
        inner.entry(team_id).or_default().insert(ts, record);
    }

    /// Removes one record if present. The team entry itself stays, so a team
    /// that has ever received a message remains known to [`contains_team`].
    ///
    /// [`contains_team`]: InboxStore::contains_team
    pub async fn remove(&self, team_id: &str, ts: &str) {
        let mut inner = self.inner.write().await;
        if let Some(records) = inner.get_mut(team_id) {
            records.shift_remove(ts);
        }
    }

    /// Snapshot of a team's records in insertion order.
    pub async fn list_for(&self, team_id: &str) -> Vec<MessageRecord> {
        let inner = self.inner.read().await;
        inner
            .get(team_id)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether this team has ever had a record admitted.
    pub async fn contains_team(&self, team_id: &str) -> bool {
        let inner = self.inner.read().await;
        inner.contains_key(team_id)
    }
}

impl Default for InboxStore {
    fn default() -> Self {
        Self::new()
    }
}
