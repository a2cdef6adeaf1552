//! Bridge runtime: one consumer task applying inbound events to the inbox,
//! plus the HTTP server exposing health and the events webhook.

mod server;

pub use server::{process_event, run_bridge, BridgeState};
