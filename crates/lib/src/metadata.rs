//! Fetch-once cache of channel and team metadata used to render inbox lines.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::slack::{ChannelInfo, SlackClient, SlackError, TeamInfo};

/// Channel and team details, fetched on first sight and kept for the process
/// lifetime.
pub struct MetadataCache {
    slack: SlackClient,
    channels: RwLock<HashMap<(String, String), ChannelInfo>>,
    teams: RwLock<HashMap<String, TeamInfo>>,
}

impl MetadataCache {
    pub fn new(slack: SlackClient) -> Self {
        MetadataCache {
            slack,
            channels: RwLock::new(HashMap::new()),
            teams: RwLock::new(HashMap::new()),
        }
    }

    /// Caches `conversations.info` for a channel under the given host team.
    /// Fetches only when the entry is new.
    pub async fn ensure_channel(&self, team_id: &str, channel_id: &str) -> Result<(), SlackError> {
        let key = (team_id.to_string(), channel_id.to_string());
        {
            let channels = self.channels.read().await;
            if channels.contains_key(&key) {
                return Ok(());
            }
        }
        let info = self.slack.conversation_info(channel_id).await?;
        log::debug!("cached channel metadata for {} in {}", channel_id, team_id);
        let mut channels = self.channels.write().await;
        channels.entry(key).or_insert(info);
        Ok(())
    }

    /// Caches `team.info` for a team. Fetches only when the entry is new.
    pub async fn ensure_team(&self, team_id: &str) -> Result<(), SlackError> {
        {
            let teams = self.teams.read().await;
            if teams.contains_key(team_id) {
                return Ok(());
            }
        }
        let info = self.slack.team_info(team_id).await?;
        log::debug!("cached team metadata for {}", team_id);
        let mut teams = self.teams.write().await;
        teams.entry(team_id.to_string()).or_insert(info);
        Ok(())
    }

    pub async fn channel(&self, team_id: &str, channel_id: &str) -> Option<ChannelInfo> {
        let channels = self.channels.read().await;
        channels
            .get(&(team_id.to_string(), channel_id.to_string()))
            .cloned()
    }

    pub async fn team(&self, team_id: &str) -> Option<TeamInfo> {
        let teams = self.teams.read().await;
        teams.get(team_id).cloned()
    }

    /// All cached channels for one host team, keyed by channel id.
    pub async fn channels_for(&self, team_id: &str) -> HashMap<String, ChannelInfo> {
        let channels = self.channels.read().await;
        channels
            .iter()
            .filter(|((team, _), _)| team == team_id)
            .map(|((_, channel), info)| (channel.clone(), info.clone()))
            .collect()
    }
}
