// Error handling for the video bridge

use crate::PlayerHandle;
use std::fmt;

/// Bridge error types
///
/// Every variant is surfaced to the caller through the asynchronous command
/// result; none cross the command boundary as a panic.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Missing, malformed or out-of-range input, detected before any state change
    InvalidArgument(String),

    /// The source URL is not an absolute URI
    InvalidUrl(String),

    /// Unknown or already disposed handle
    InstanceNotFound(PlayerHandle),

    /// Operation requires the instance to be Ready or later
    NotReady(String),

    /// The asset has no usable video track or the engine reported a load error
    InitializationFailed(String),

    /// Unknown command
    NotImplemented(String),

    /// Synchronous failure reported by the underlying engine
    Engine(String),
}

impl BridgeError {
    /// Stable wire code reported to the host alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::InvalidArgument(_) => "INVALID_ARGS",
            BridgeError::InvalidUrl(_) => "INVALID_URL",
            BridgeError::InstanceNotFound(_) => "PLAYER_NOT_FOUND",
            BridgeError::NotReady(_) => "NOT_READY",
            BridgeError::InitializationFailed(_) => "INIT_FAILED",
            BridgeError::NotImplemented(_) => "NOT_IMPLEMENTED",
            BridgeError::Engine(_) => "ENGINE_ERROR",
        }
    }

    /// Human readable message without the code prefix.
    pub fn message(&self) -> String {
        match self {
            BridgeError::InvalidArgument(msg)
            | BridgeError::InvalidUrl(msg)
            | BridgeError::NotReady(msg)
            | BridgeError::InitializationFailed(msg)
            | BridgeError::NotImplemented(msg)
            | BridgeError::Engine(msg) => msg.clone(),
            BridgeError::InstanceNotFound(handle) => format!("Player {} not found", handle),
        }
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BridgeError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            BridgeError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            BridgeError::InstanceNotFound(handle) => write!(f, "Player not found: {}", handle),
            BridgeError::NotReady(msg) => write!(f, "Not ready: {}", msg),
            BridgeError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BridgeError::NotImplemented(method) => write!(f, "Not implemented: {}", method),
            BridgeError::Engine(msg) => write!(f, "Engine error: {}", msg),
        }
    }
}

impl std::error::Error for BridgeError {}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<url::ParseError> for BridgeError {
    fn from(err: url::ParseError) -> Self {
        BridgeError::InvalidUrl(err.to_string())
    }
}
