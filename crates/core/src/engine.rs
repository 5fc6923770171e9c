// Playback engine adapter contract
//
// One engine wraps exactly one underlying hardware player bound to one asset.
// Platform implementations (native AVPlayer shims, the headless probe engine,
// test doubles) all implement `PlaybackEngine`.

use crate::PlayerHandle;
use std::fmt;
use url::Url;

/// Error reported by an underlying engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for EngineError {}

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
    Other,
}

/// One track as reported by asset inspection
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub kind: TrackKind,
    /// Natural size in pixels, before any preferred transform
    pub natural_width: f64,
    pub natural_height: f64,
}

impl TrackInfo {
    pub fn video(natural_width: f64, natural_height: f64) -> Self {
        Self {
            kind: TrackKind::Video,
            natural_width,
            natural_height,
        }
    }

    pub fn audio() -> Self {
        Self {
            kind: TrackKind::Audio,
            natural_width: 0.0,
            natural_height: 0.0,
        }
    }
}

/// Result of asynchronous asset inspection (tracks + duration)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssetInfo {
    pub tracks: Vec<TrackInfo>,
    /// Seconds; NaN or infinity for indefinite (live) assets
    pub duration_secs: f64,
}

/// Options applied when an engine opens its asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Ask for an exact duration rather than an estimate
    pub precise_timing: bool,
    /// Let the engine delay playback start to avoid stalls
    pub wait_to_minimize_stalling: bool,
    /// Peak bitrate cap in bits per second, 0 for unlimited
    pub preferred_peak_bitrate: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            precise_timing: true,
            wait_to_minimize_stalling: true,
            preferred_peak_bitrate: 0,
        }
    }
}

/// Seek tolerance window around the requested position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekTolerance {
    /// Exact-position seek, no coalescing window
    Zero,
    /// Engine may land on any position within the given window (milliseconds)
    Window { before_ms: u64, after_ms: u64 },
}

/// Completion for asynchronous asset inspection
///
/// Engines invoke it exactly once, from any thread.
pub type LoadCompletion = Box<dyn FnOnce(EngineResult<AssetInfo>) + Send + 'static>;

/// Core playback engine trait
///
/// `load` must not block the calling thread. The synchronous playback calls are
/// only invoked once the owning instance has reached Ready.
pub trait PlaybackEngine: Send {
    /// Begin asynchronous asset inspection (tracks, duration)
    fn load(&mut self, completion: LoadCompletion);

    /// Start or resume playback, pinning the rate to 1.0
    fn play(&mut self) -> EngineResult<()>;

    /// Pause playback
    fn pause(&mut self) -> EngineResult<()>;

    /// Seek to a position in milliseconds
    fn seek(&mut self, position_ms: u64, tolerance: SeekTolerance) -> EngineResult<()>;

    /// Set volume (0.0 - 1.0)
    fn set_volume(&mut self, volume: f32) -> EngineResult<()>;

    /// Current playback position in milliseconds
    fn position_ms(&self) -> u64;

    /// Raw platform layer handle for the render surface binder, if this engine presents video
    fn surface_layer(&self) -> Option<u64>;

    /// Release all underlying resources, including periodic position observers
    fn release(&mut self) -> EngineResult<()>;
}

/// Engine factory trait
/// Allows the host to inject platform-specific engines
pub trait EngineFactory: Send + Sync {
    fn create_engine(
        &self,
        handle: PlayerHandle,
        url: &Url,
        options: LoadOptions,
    ) -> EngineResult<Box<dyn PlaybackEngine>>;
}

impl<F> EngineFactory for F
where
    F: Fn(PlayerHandle, &Url, LoadOptions) -> EngineResult<Box<dyn PlaybackEngine>> + Send + Sync,
{
    fn create_engine(
        &self,
        handle: PlayerHandle,
        url: &Url,
        options: LoadOptions,
    ) -> EngineResult<Box<dyn PlaybackEngine>> {
        self(handle, url, options)
    }
}
