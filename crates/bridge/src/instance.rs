// Player instance: one engine, one asset, one explicit lifecycle

use crate::protocol::Responder;
use cinescope_core::{
    AssetInfo, BridgeError, EngineResult, EventHub, LifecycleState, LoadCompletion,
    PlaybackEngine, PlayerEvent, PlayerHandle, RenderSurface, Result, SeekTolerance,
    VideoGravity, VideoMetadata,
};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// How the instance came to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    /// `initialize`: the caller waits for metadata
    Initialize,
    /// `preload`: fire-and-forget, may later be claimed by `initialize`
    Preload { claimed: bool },
}

pub struct PlayerInstance {
    handle: PlayerHandle,
    source_url: Url,
    origin: LoadOrigin,
    /// Distinguishes this instance's load completion from a previous one on the same handle
    load_token: u64,
    state: LifecycleState,
    metadata: Option<VideoMetadata>,
    failure: Option<String>,
    volume: f32,
    /// Volume accepted before Ready, applied once the engine can take it
    volume_pending: bool,
    engine: Box<dyn PlaybackEngine>,
    surfaces: Vec<RenderSurface>,
    waiters: Vec<Responder>,
    events: Arc<EventHub>,
}

impl PlayerInstance {
    pub fn new(
        handle: PlayerHandle,
        source_url: Url,
        origin: LoadOrigin,
        load_token: u64,
        engine: Box<dyn PlaybackEngine>,
        events: Arc<EventHub>,
    ) -> Self {
        Self {
            handle,
            source_url,
            origin,
            load_token,
            state: LifecycleState::Created,
            metadata: None,
            failure: None,
            volume: 1.0,
            volume_pending: false,
            engine,
            surfaces: Vec::new(),
            waiters: Vec::new(),
            events,
        }
    }

    pub fn handle(&self) -> PlayerHandle {
        self.handle
    }

    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    pub fn origin(&self) -> LoadOrigin {
        self.origin
    }

    pub fn load_token(&self) -> u64 {
        self.load_token
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn metadata(&self) -> Option<VideoMetadata> {
        self.metadata
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn set_state(&mut self, new_state: LifecycleState) {
        let old_state = self.state;
        match old_state.transition(new_state) {
            Ok(state) => {
                self.state = state;
                if old_state != new_state {
                    log::debug!(
                        "[instance] player {} state {} -> {}",
                        self.handle,
                        old_state,
                        new_state
                    );
                    self.events.dispatch(PlayerEvent::StateChanged {
                        handle: self.handle,
                        old_state,
                        new_state,
                    });
                }
            }
            Err(err) => log::warn!("[instance] player {}: {}", self.handle, err),
        }
    }

    fn failed_error(&self) -> BridgeError {
        BridgeError::InitializationFailed(
            self.failure
                .clone()
                .unwrap_or_else(|| "Initialization failed".to_string()),
        )
    }

    /// Playback operations need Ready or later; Failed reports the load error
    fn ensure_ready(&self, operation: &str) -> Result<()> {
        match self.state {
            s if s.is_ready() => Ok(()),
            LifecycleState::Failed => Err(self.failed_error()),
            LifecycleState::Disposed => Err(BridgeError::InstanceNotFound(self.handle)),
            s => Err(BridgeError::NotReady(format!(
                "Cannot {} player {} while {}",
                operation, self.handle, s
            ))),
        }
    }

    /// Start asynchronous asset loading: `Created -> Loading`
    pub fn begin_load(&mut self, completion: LoadCompletion) {
        self.set_state(LifecycleState::Loading);
        self.engine.load(completion);
    }

    /// Apply a load completion delivered through the command worker
    pub fn finish_load(&mut self, result: EngineResult<AssetInfo>) {
        if self.state != LifecycleState::Loading {
            log::debug!(
                "[instance] player {} ignoring load completion while {}",
                self.handle,
                self.state
            );
            return;
        }

        let outcome = result
            .map_err(|e| BridgeError::InitializationFailed(e.to_string()))
            .and_then(|info| VideoMetadata::extract(&info));

        match outcome {
            Ok(metadata) => {
                if self.metadata.is_none() {
                    self.metadata = Some(metadata);
                }
                if self.volume_pending {
                    if let Err(e) = self.engine.set_volume(self.volume) {
                        log::warn!("[instance] player {} deferred volume failed: {}", self.handle, e);
                    }
                    self.volume_pending = false;
                }
                self.set_state(LifecycleState::Ready);
                log::info!(
                    "[instance] player {} ready: {}x{} {}ms",
                    self.handle,
                    metadata.width,
                    metadata.height,
                    metadata.duration_millis
                );
                self.events.dispatch(PlayerEvent::Initialized {
                    handle: self.handle,
                    metadata,
                });
            }
            Err(err) => {
                let message = err.message();
                log::warn!("[instance] player {} failed to load: {}", self.handle, message);
                self.failure = Some(message.clone());
                self.set_state(LifecycleState::Failed);
                self.events.dispatch(PlayerEvent::InitializationFailed {
                    handle: self.handle,
                    message,
                });
            }
        }

        self.resolve_waiters();
    }

    fn metadata_value(&self) -> Result<Value> {
        match self.metadata {
            Some(meta) => serde_json::to_value(meta)
                .map_err(|e| BridgeError::InitializationFailed(e.to_string())),
            None => Err(self.failed_error()),
        }
    }

    fn resolve_waiters(&mut self) {
        for waiter in std::mem::take(&mut self.waiters) {
            waiter(self.metadata_value());
        }
    }

    /// Register a caller waiting for the initialize result
    pub fn add_waiter(&mut self, responder: Responder) {
        match self.state {
            s if s.is_pending() => self.waiters.push(responder),
            _ => responder(self.metadata_value()),
        }
    }

    /// Let `initialize` take over a preloaded instance for the same URL.
    /// Returns false if the instance is not available for adoption.
    pub fn claim_preload(&mut self, url: &Url) -> bool {
        match self.origin {
            LoadOrigin::Preload { claimed: false } if &self.source_url == url => {
                self.origin = LoadOrigin::Preload { claimed: true };
                true
            }
            _ => false,
        }
    }

    pub fn play(&mut self) -> Result<()> {
        self.ensure_ready("play")?;
        self.engine
            .play()
            .map_err(|e| BridgeError::Engine(e.to_string()))?;
        self.set_state(LifecycleState::Playing);
        Ok(())
    }

    /// Tolerant pause: a no-op outside Playing/Paused
    pub fn pause(&mut self) -> Result<()> {
        match self.state {
            LifecycleState::Playing | LifecycleState::Paused => {
                self.engine
                    .pause()
                    .map_err(|e| BridgeError::Engine(e.to_string()))?;
                self.set_state(LifecycleState::Paused);
            }
            state => {
                log::debug!("[instance] player {} pause ignored while {}", self.handle, state);
            }
        }
        Ok(())
    }

    /// Exact-position seek
    pub fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        self.ensure_ready("seek")?;
        self.engine
            .seek(position_ms, SeekTolerance::Zero)
            .map_err(|e| BridgeError::Engine(e.to_string()))
    }

    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        crate::protocol::validate_volume(volume as f64)?;
        match self.state {
            LifecycleState::Failed => return Err(self.failed_error()),
            LifecycleState::Disposed => return Err(BridgeError::InstanceNotFound(self.handle)),
            s if s.is_pending() => self.volume_pending = true,
            _ => self
                .engine
                .set_volume(volume)
                .map_err(|e| BridgeError::Engine(e.to_string()))?,
        }
        self.volume = volume;
        self.events.dispatch(PlayerEvent::VolumeChanged {
            handle: self.handle,
            volume,
        });
        Ok(())
    }

    /// Position in milliseconds, 0 until the asset is loaded
    pub fn position_ms(&self) -> Result<u64> {
        match self.state {
            s if s.is_pending() => Ok(0),
            _ => {
                self.ensure_ready("query position of")?;
                Ok(self.engine.position_ms())
            }
        }
    }

    /// Hand out a presentable surface for the render surface binder
    pub fn surface(&mut self) -> Result<RenderSurface> {
        if self.state.is_terminal() {
            return Err(BridgeError::InstanceNotFound(self.handle));
        }
        let layer = self.engine.surface_layer().ok_or_else(|| {
            BridgeError::Engine(format!("Player {} has no presentable surface", self.handle))
        })?;

        let surface = RenderSurface::new(self.handle, layer, VideoGravity::ResizeAspect);
        self.surfaces.push(surface.clone());
        Ok(surface)
    }

    /// Tear down: pause, detach surfaces, release the engine.
    /// Engine failures are logged; disposal always completes.
    pub fn dispose(mut self) {
        log::info!("[instance] disposing player {} ({})", self.handle, self.state);

        if self.state.is_ready() {
            if let Err(e) = self.engine.pause() {
                log::warn!("[instance] player {} pause on dispose failed: {}", self.handle, e);
            }
        }

        for surface in self.surfaces.drain(..) {
            surface.detach();
        }

        if let Err(e) = self.engine.release() {
            log::error!("[instance] player {} engine release failed: {}", self.handle, e);
        }

        self.set_state(LifecycleState::Disposed);

        for waiter in std::mem::take(&mut self.waiters) {
            waiter(Err(BridgeError::InitializationFailed(
                "player disposed before load completed".to_string(),
            )));
        }

        self.events.dispatch(PlayerEvent::Disposed {
            handle: self.handle,
        });
    }
}
