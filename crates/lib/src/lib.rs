//! Frontdesk core library: Slack ingress, admission filtering, the in-memory
//! inbox, and App Home view publishing used by the CLI binary.

pub mod bridge;
pub mod config;
pub mod event;
pub mod inbox;
pub mod metadata;
pub mod richtext;
pub mod slack;
pub mod status;
pub mod view;
