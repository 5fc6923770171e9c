// Cinescope video bridge
// Player registry, per-instance lifecycle and the serialized command path

pub mod bridge;
pub mod config;
pub mod instance;
pub mod lifecycle;
pub mod protocol;
pub mod registry;
mod worker;

pub use bridge::VideoBridge;
pub use config::BridgeConfig;
pub use lifecycle::HostLifecycle;
pub use protocol::{error_payload, Command, Responder, ViewArgs};
pub use worker::PendingReply;
