//! Slack-facing plumbing: the Web API client and the socket mode connector.

mod client;
mod socket;

pub use client::{
    ChannelInfo, SlackClient, SlackError, TeamInfo, TeamSummary, UserInfo, UserProfile,
};
pub use socket::SocketModeConnector;
