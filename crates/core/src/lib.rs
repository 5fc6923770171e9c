// Core types and traits for the Cinescope video bridge

pub mod callback;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod state;
pub mod surface;

/// Caller-assigned opaque identifier of one player instance.
/// The bridge never generates handles; uniqueness among live instances is the caller's job.
pub type PlayerHandle = i64;

// Re-export commonly used types
pub use callback::{EventHub, PlayerEvent, PlayerEventListener};
pub use engine::{
    AssetInfo, EngineError, EngineFactory, EngineResult, LoadCompletion, LoadOptions,
    PlaybackEngine, SeekTolerance, TrackInfo, TrackKind,
};
pub use error::{BridgeError, Result};
pub use metadata::VideoMetadata;
pub use state::LifecycleState;
pub use surface::{RenderSurface, VideoGravity};
