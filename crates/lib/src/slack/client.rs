//! Thin client for the handful of Slack Web API methods the bridge calls.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use crate::view::HomeView;

const DEFAULT_API_BASE: &str = "https://slack.com/api";

/// Web API client. Cheap to clone; clones share the underlying connection
/// pool.
#[derive(Clone)]
pub struct SlackClient {
    api_base: String,
    bot_token: String,
    app_token: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("slack request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("slack api error: {0}")]
    Api(String),
    #[error("slack client misconfigured: {0}")]
    Config(&'static str),
}

/// One workspace from `auth.teams.list`.
#[derive(Debug, Clone, Deserialize)]
pub struct TeamSummary {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub id: String,
    /// Workspace the user belongs to, the basis for admission.
    pub team_id: String,
    #[serde(default)]
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub image_72: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamInfo {
    pub id: String,
    pub name: String,
    /// Workspace base url, ends with a slash.
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct ApiAck {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeamsListResponse {
    ok: bool,
    #[serde(default)]
    teams: Vec<TeamSummary>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    ok: bool,
    #[serde(default)]
    user: Option<UserInfo>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelInfoResponse {
    ok: bool,
    #[serde(default)]
    channel: Option<ChannelInfo>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TeamInfoResponse {
    ok: bool,
    #[serde(default)]
    team: Option<TeamInfo>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConnectionsOpenResponse {
    ok: bool,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

fn api_error(error: Option<String>, method: &str) -> SlackError {
    SlackError::Api(format!(
        "{} returned ok: false ({})",
        method,
        error.unwrap_or_else(|| "unknown error".to_string())
    ))
}

impl SlackClient {
    /// `api_base` overrides `https://slack.com/api`, mainly for tests.
    pub fn new(
        bot_token: impl Into<String>,
        app_token: Option<String>,
        api_base: Option<String>,
    ) -> Self {
        let api_base = api_base
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        SlackClient {
            api_base,
            bot_token: bot_token.into(),
            app_token,
            client: reqwest::Client::new(),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, &str)],
    ) -> Result<T, SlackError> {
        let url = format!("{}/{}", self.api_base, method);
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.bot_token)
            .query(query)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SlackError::Api(format!("{} {} {}", method, status, body)));
        }
        Ok(res.json().await?)
    }

    /// The workspace the bot is installed in, taken as the first entry of
    /// `auth.teams.list`.
    pub async fn host_team(&self) -> Result<TeamSummary, SlackError> {
        let res: TeamsListResponse = self.get_json("auth.teams.list", &[]).await?;
        if !res.ok {
            return Err(api_error(res.error, "auth.teams.list"));
        }
        res.teams
            .into_iter()
            .next()
            .ok_or_else(|| SlackError::Api("auth.teams.list returned no teams".to_string()))
    }

    pub async fn user_info(&self, user_id: &str) -> Result<UserInfo, SlackError> {
        let res: UserInfoResponse = self.get_json("users.info", &[("user", user_id)]).await?;
        if !res.ok {
            return Err(api_error(res.error, "users.info"));
        }
        res.user
            .ok_or_else(|| SlackError::Api("users.info returned no user".to_string()))
    }

    pub async fn conversation_info(&self, channel_id: &str) -> Result<ChannelInfo, SlackError> {
        let res: ChannelInfoResponse = self
            .get_json("conversations.info", &[("channel", channel_id)])
            .await?;
        if !res.ok {
            return Err(api_error(res.error, "conversations.info"));
        }
        res.channel
            .ok_or_else(|| SlackError::Api("conversations.info returned no channel".to_string()))
    }

    pub async fn team_info(&self, team_id: &str) -> Result<TeamInfo, SlackError> {
        let res: TeamInfoResponse = self.get_json("team.info", &[("team", team_id)]).await?;
        if !res.ok {
            return Err(api_error(res.error, "team.info"));
        }
        res.team
            .ok_or_else(|| SlackError::Api("team.info returned no team".to_string()))
    }

    /// Replaces a user's App Home tab via `views.publish`.
    pub async fn publish_home(&self, user_id: &str, view: &HomeView) -> Result<(), SlackError> {
        let url = format!("{}/views.publish", self.api_base);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.bot_token)
            .json(&json!({ "user_id": user_id, "view": view }))
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SlackError::Api(format!(
                "views.publish {} {}",
                status, body
            )));
        }
        let ack: ApiAck = res.json().await?;
        if !ack.ok {
            return Err(api_error(ack.error, "views.publish"));
        }
        Ok(())
    }

    /// Requests a fresh socket mode url via `apps.connections.open`. Requires
    /// the app-level token.
    pub async fn connections_open(&self) -> Result<String, SlackError> {
        let app_token = self
            .app_token
            .as_ref()
            .ok_or(SlackError::Config("app-level token not set"))?;
        let url = format!("{}/apps.connections.open", self.api_base);
        let res = self.client.post(&url).bearer_auth(app_token).send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SlackError::Api(format!(
                "apps.connections.open {} {}",
                status, body
            )));
        }
        let opened: ConnectionsOpenResponse = res.json().await?;
        if !opened.ok {
            return Err(api_error(opened.error, "apps.connections.open"));
        }
        opened
            .url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| SlackError::Api("apps.connections.open returned no url".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_base_trailing_slash_is_trimmed() {
        let client = SlackClient::new("xoxb-test", None, Some("https://mock.test/api/".to_string()));
        assert_eq!(client.api_base, "https://mock.test/api");

        let default = SlackClient::new("xoxb-test", None, None);
        assert_eq!(default.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn api_errors_name_the_method() {
        let err = api_error(Some("not_authed".to_string()), "users.info");
        assert_eq!(
            err.to_string(),
            "slack api error: users.info returned ok: false (not_authed)"
        );

        let err = api_error(None, "team.info");
        assert_eq!(
            err.to_string(),
            "slack api error: team.info returned ok: false (unknown error)"
        );
    }
}
