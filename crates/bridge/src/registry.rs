// Player registry: handle -> instance, single owner of every live player

use crate::instance::{LoadOrigin, PlayerInstance};
use crate::protocol::Responder;
use cinescope_core::{
    AssetInfo, BridgeError, EngineFactory, EngineResult, EventHub, LifecycleState, LoadOptions,
    PlayerHandle, RenderSurface, Result,
};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

/// Routes a load completion back onto the serialized command path
pub type LoadNotifier = Arc<dyn Fn(PlayerHandle, u64, EngineResult<AssetInfo>) + Send + Sync>;

pub struct Registry {
    instances: HashMap<PlayerHandle, PlayerInstance>,
    factory: Arc<dyn EngineFactory>,
    events: Arc<EventHub>,
    notifier: LoadNotifier,
    load_options: LoadOptions,
    next_token: u64,
}

impl Registry {
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        events: Arc<EventHub>,
        notifier: LoadNotifier,
        load_options: LoadOptions,
    ) -> Self {
        Self {
            instances: HashMap::new(),
            factory,
            events,
            notifier,
            load_options,
            next_token: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn contains(&self, handle: PlayerHandle) -> bool {
        self.instances.contains_key(&handle)
    }

    pub fn handles(&self) -> Vec<PlayerHandle> {
        self.instances.keys().copied().collect()
    }

    pub fn state_of(&self, handle: PlayerHandle) -> Option<LifecycleState> {
        self.instances.get(&handle).map(PlayerInstance::state)
    }

    pub fn get(&self, handle: PlayerHandle) -> Result<&PlayerInstance> {
        self.instances
            .get(&handle)
            .ok_or(BridgeError::InstanceNotFound(handle))
    }

    pub fn get_mut(&mut self, handle: PlayerHandle) -> Result<&mut PlayerInstance> {
        self.instances
            .get_mut(&handle)
            .ok_or(BridgeError::InstanceNotFound(handle))
    }

    /// Insert a new instance and start loading its asset.
    /// A live handle is never replaced.
    pub fn create(&mut self, handle: PlayerHandle, url: Url, origin: LoadOrigin) -> Result<()> {
        if self.instances.contains_key(&handle) {
            return Err(BridgeError::InvalidArgument(format!(
                "Player {} already exists",
                handle
            )));
        }

        let engine = self
            .factory
            .create_engine(handle, &url, self.load_options)
            .map_err(|e| BridgeError::InitializationFailed(e.to_string()))?;

        let token = self.next_token;
        self.next_token += 1;

        log::info!("[registry] creating player {} ({:?}) for {}", handle, origin, url);

        let notifier = self.notifier.clone();
        let completion = Box::new(move |result: EngineResult<AssetInfo>| {
            notifier(handle, token, result);
        });

        let instance = PlayerInstance::new(handle, url, origin, token, engine, self.events.clone());
        self.instances
            .entry(handle)
            .or_insert(instance)
            .begin_load(completion);
        Ok(())
    }

    /// `initialize`: create and answer once metadata is known.
    /// A matching unclaimed preload is adopted instead of rejected.
    pub fn initialize(&mut self, handle: PlayerHandle, url: Url, responder: Responder) {
        if let Some(instance) = self.instances.get_mut(&handle) {
            if instance.claim_preload(&url) {
                log::info!("[registry] initialize adopts preloaded player {}", handle);
                instance.add_waiter(responder);
            } else {
                responder(Err(BridgeError::InvalidArgument(format!(
                    "Player {} already exists",
                    handle
                ))));
            }
            return;
        }

        match self.create(handle, url, LoadOrigin::Initialize) {
            Ok(()) => match self.instances.get_mut(&handle) {
                Some(instance) => instance.add_waiter(responder),
                None => responder(Err(BridgeError::InstanceNotFound(handle))),
            },
            Err(err) => responder(Err(err)),
        }
    }

    /// `preload`: create and return without waiting for the load.
    /// An engine the factory cannot create fails as `InitializationFailed`, as for `initialize`.
    pub fn preload(&mut self, handle: PlayerHandle, url: Url) -> Result<()> {
        self.create(handle, url, LoadOrigin::Preload { claimed: false })
    }

    /// Deliver a load completion; stale or orphaned completions are dropped
    pub fn complete_load(&mut self, handle: PlayerHandle, token: u64, result: EngineResult<AssetInfo>) {
        match self.instances.get_mut(&handle) {
            Some(instance) if instance.load_token() == token => instance.finish_load(result),
            Some(_) => log::debug!(
                "[registry] stale load completion for player {} (token {})",
                handle,
                token
            ),
            None => log::debug!(
                "[registry] load completion for disposed player {} ignored",
                handle
            ),
        }
    }

    /// Remove and tear down an instance
    pub fn dispose(&mut self, handle: PlayerHandle) -> Result<()> {
        let instance = self
            .instances
            .remove(&handle)
            .ok_or(BridgeError::InstanceNotFound(handle))?;
        instance.dispose();
        Ok(())
    }

    pub fn surface(&mut self, handle: PlayerHandle, autoplay: bool) -> Result<RenderSurface> {
        let instance = self.get_mut(handle)?;
        let surface = instance.surface()?;

        if autoplay {
            if instance.state().is_ready() {
                instance.play()?;
            } else {
                log::debug!(
                    "[registry] autoplay for player {} skipped while {}",
                    handle,
                    instance.state()
                );
            }
        }
        Ok(surface)
    }

    /// Pause every live instance, iterating over a snapshot of handles
    pub fn pause_all(&mut self) {
        let handles = self.handles();
        log::info!("[registry] pausing {} players", handles.len());

        for handle in handles {
            if let Some(instance) = self.instances.get_mut(&handle) {
                if let Err(e) = instance.pause() {
                    log::warn!("[registry] pause of player {} failed: {}", handle, e);
                }
            }
        }
    }

    /// Dispose every instance
    pub fn shutdown(&mut self) {
        log::info!("[registry] shutting down {} players", self.instances.len());
        for (_, instance) in self.instances.drain() {
            instance.dispose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinescope_core::{EngineError, LoadCompletion, PlaybackEngine, SeekTolerance, TrackInfo};
    use parking_lot::Mutex;

    /// Engine whose load never completes on its own
    struct ParkedEngine {
        pending: Arc<Mutex<Vec<LoadCompletion>>>,
    }

    impl PlaybackEngine for ParkedEngine {
        fn load(&mut self, completion: LoadCompletion) {
            self.pending.lock().push(completion);
        }
        fn play(&mut self) -> EngineResult<()> {
            Ok(())
        }
        fn pause(&mut self) -> EngineResult<()> {
            Ok(())
        }
        fn seek(&mut self, _position_ms: u64, _tolerance: SeekTolerance) -> EngineResult<()> {
            Ok(())
        }
        fn set_volume(&mut self, _volume: f32) -> EngineResult<()> {
            Ok(())
        }
        fn position_ms(&self) -> u64 {
            0
        }
        fn surface_layer(&self) -> Option<u64> {
            Some(42)
        }
        fn release(&mut self) -> EngineResult<()> {
            Err(EngineError::new("teardown hiccup"))
        }
    }

    type Delivered = Arc<Mutex<Vec<(PlayerHandle, u64, EngineResult<AssetInfo>)>>>;

    fn registry() -> (Registry, Arc<Mutex<Vec<LoadCompletion>>>, Delivered) {
        let pending: Arc<Mutex<Vec<LoadCompletion>>> = Arc::new(Mutex::new(Vec::new()));
        let delivered: Delivered = Arc::new(Mutex::new(Vec::new()));

        let engines = pending.clone();
        let factory = move |_h: PlayerHandle, _u: &Url, _o: LoadOptions| {
            Ok::<_, EngineError>(Box::new(ParkedEngine {
                pending: engines.clone(),
            }) as Box<dyn PlaybackEngine>)
        };

        let sink = delivered.clone();
        let notifier: LoadNotifier = Arc::new(
            move |h: PlayerHandle, t: u64, r: EngineResult<AssetInfo>| sink.lock().push((h, t, r)),
        );

        let registry = Registry::new(
            Arc::new(factory),
            Arc::new(EventHub::new()),
            notifier,
            LoadOptions::default(),
        );
        (registry, pending, delivered)
    }

    fn url() -> Url {
        Url::parse("https://example.com/a.mp4").unwrap()
    }

    fn video() -> AssetInfo {
        AssetInfo {
            tracks: vec![TrackInfo::video(1280.0, 720.0)],
            duration_secs: 4.0,
        }
    }

    #[test]
    fn test_create_starts_loading() {
        let (mut reg, pending, _) = registry();
        reg.create(1, url(), LoadOrigin::Initialize).unwrap();
        assert_eq!(reg.state_of(1), Some(LifecycleState::Loading));
        assert_eq!(pending.lock().len(), 1);
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let (mut reg, _, _) = registry();
        reg.create(1, url(), LoadOrigin::Initialize).unwrap();
        let err = reg.create(1, url(), LoadOrigin::Initialize).unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGS");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_completion_routes_through_notifier() {
        let (mut reg, pending, delivered) = registry();
        reg.create(1, url(), LoadOrigin::Initialize).unwrap();

        let done = pending.lock().pop().unwrap();
        done(Ok(video()));
        // Nothing changes until the completion is delivered
        assert_eq!(reg.state_of(1), Some(LifecycleState::Loading));

        let (h, t, r) = delivered.lock().pop().unwrap();
        reg.complete_load(h, t, r);
        assert_eq!(reg.state_of(1), Some(LifecycleState::Ready));
        assert_eq!(reg.get(1).unwrap().metadata().unwrap().width, 1280);
    }

    #[test]
    fn test_stale_completion_after_recreate_is_ignored() {
        let (mut reg, pending, delivered) = registry();
        reg.create(1, url(), LoadOrigin::Initialize).unwrap();
        let first = pending.lock().remove(0);
        reg.dispose(1).unwrap();
        reg.create(1, url(), LoadOrigin::Initialize).unwrap();

        first(Ok(video()));
        let (h, t, r) = delivered.lock().pop().unwrap();
        reg.complete_load(h, t, r);
        assert_eq!(reg.state_of(1), Some(LifecycleState::Loading));
    }

    #[test]
    fn test_dispose_survives_release_error() {
        let (mut reg, _, _) = registry();
        reg.create(1, url(), LoadOrigin::Initialize).unwrap();
        assert!(reg.dispose(1).is_ok());
        assert!(!reg.contains(1));
        assert_eq!(reg.dispose(1).unwrap_err(), BridgeError::InstanceNotFound(1));
    }

    #[test]
    fn test_surface_detached_on_dispose() {
        let (mut reg, pending, delivered) = registry();
        reg.create(1, url(), LoadOrigin::Initialize).unwrap();
        (pending.lock().pop().unwrap())(Ok(video()));
        let (h, t, r) = delivered.lock().pop().unwrap();
        reg.complete_load(h, t, r);

        let surface = reg.surface(1, true).unwrap();
        assert_eq!(surface.layer(), Some(42));
        assert_eq!(reg.state_of(1), Some(LifecycleState::Playing));

        reg.dispose(1).unwrap();
        assert_eq!(surface.layer(), None);
    }

    #[test]
    fn test_pause_all_tolerates_loading_players() {
        let (mut reg, _, _) = registry();
        reg.create(1, url(), LoadOrigin::Initialize).unwrap();
        reg.create(2, url(), LoadOrigin::Preload { claimed: false }).unwrap();
        reg.pause_all();
        assert_eq!(reg.state_of(1), Some(LifecycleState::Loading));
        assert_eq!(reg.state_of(2), Some(LifecycleState::Loading));
    }

    #[test]
    fn test_engine_creation_failure_leaves_no_instance() {
        let factory = |_h: PlayerHandle, _u: &Url, _o: LoadOptions| {
            Err::<Box<dyn PlaybackEngine>, _>(EngineError::new("decoder unavailable"))
        };
        let notifier: LoadNotifier = Arc::new(|_h: PlayerHandle, _t: u64, _r: EngineResult<AssetInfo>| {});
        let mut reg = Registry::new(
            Arc::new(factory),
            Arc::new(EventHub::new()),
            notifier,
            LoadOptions::default(),
        );

        let err = reg.preload(1, url()).unwrap_err();
        assert_eq!(err, BridgeError::InitializationFailed("decoder unavailable".into()));
        assert!(!reg.contains(1));

        let (tx, rx) = crossbeam_channel::bounded(1);
        reg.initialize(2, url(), Box::new(move |r| {
            let _ = tx.send(r);
        }));
        assert_eq!(rx.recv().unwrap().unwrap_err().code(), "INIT_FAILED");
        assert!(reg.is_empty());
    }

    #[test]
    fn test_shutdown_empties_registry() {
        let (mut reg, _, _) = registry();
        reg.create(1, url(), LoadOrigin::Initialize).unwrap();
        reg.create(2, url(), LoadOrigin::Initialize).unwrap();
        reg.shutdown();
        assert!(reg.is_empty());
    }
}
