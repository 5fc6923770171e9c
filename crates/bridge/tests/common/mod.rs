// Scripted engine: load completions are released by the test, never by a timer

#![allow(dead_code)]

use cinescope_bridge::VideoBridge;
use cinescope_core::{
    AssetInfo, EngineError, EngineFactory, EngineResult, LoadCompletion, LoadOptions,
    PlaybackEngine, PlayerEvent, PlayerEventListener, PlayerHandle, SeekTolerance, TrackInfo,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Once};
use url::Url;

static INIT_LOGGER: Once = Once::new();

pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// What the bridge asked of one engine
#[derive(Debug, Default, Clone)]
pub struct EngineRecord {
    pub playing: bool,
    pub position_ms: u64,
    pub volume: Option<f32>,
    pub last_tolerance: Option<SeekTolerance>,
    pub released: bool,
}

pub struct ScriptedEngine {
    handle: PlayerHandle,
    record: Arc<Mutex<EngineRecord>>,
    pending: Arc<Mutex<HashMap<PlayerHandle, LoadCompletion>>>,
    fail_release: bool,
}

impl PlaybackEngine for ScriptedEngine {
    fn load(&mut self, completion: LoadCompletion) {
        self.pending.lock().insert(self.handle, completion);
    }

    fn play(&mut self) -> EngineResult<()> {
        self.record.lock().playing = true;
        Ok(())
    }

    fn pause(&mut self) -> EngineResult<()> {
        self.record.lock().playing = false;
        Ok(())
    }

    fn seek(&mut self, position_ms: u64, tolerance: SeekTolerance) -> EngineResult<()> {
        let mut record = self.record.lock();
        record.position_ms = position_ms;
        record.last_tolerance = Some(tolerance);
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> EngineResult<()> {
        self.record.lock().volume = Some(volume);
        Ok(())
    }

    fn position_ms(&self) -> u64 {
        self.record.lock().position_ms
    }

    fn surface_layer(&self) -> Option<u64> {
        Some(0x1000 + self.handle as u64)
    }

    fn release(&mut self) -> EngineResult<()> {
        self.record.lock().released = true;
        if self.fail_release {
            Err(EngineError::new("release failed"))
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Default)]
pub struct ScriptedFactory {
    pending: Arc<Mutex<HashMap<PlayerHandle, LoadCompletion>>>,
    records: Arc<Mutex<HashMap<PlayerHandle, Arc<Mutex<EngineRecord>>>>>,
    fail_release: Arc<Mutex<bool>>,
}

impl ScriptedFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_release(&self) {
        *self.fail_release.lock() = true;
    }

    /// Deliver the load result for `handle`; false if no load is parked
    pub fn complete(&self, handle: PlayerHandle, result: EngineResult<AssetInfo>) -> bool {
        let completion = self.pending.lock().remove(&handle);
        match completion {
            Some(done) => {
                done(result);
                true
            }
            None => false,
        }
    }

    /// Take the parked completion to fire it later
    pub fn take_load(&self, handle: PlayerHandle) -> Option<LoadCompletion> {
        self.pending.lock().remove(&handle)
    }

    pub fn record(&self, handle: PlayerHandle) -> EngineRecord {
        self.records
            .lock()
            .get(&handle)
            .map(|r| r.lock().clone())
            .unwrap_or_default()
    }
}

impl EngineFactory for ScriptedFactory {
    fn create_engine(
        &self,
        handle: PlayerHandle,
        _url: &Url,
        _options: LoadOptions,
    ) -> EngineResult<Box<dyn PlaybackEngine>> {
        let record = Arc::new(Mutex::new(EngineRecord::default()));
        self.records.lock().insert(handle, record.clone());
        Ok(Box::new(ScriptedEngine {
            handle,
            record,
            pending: self.pending.clone(),
            fail_release: *self.fail_release.lock(),
        }))
    }
}

#[derive(Default)]
pub struct EventLog {
    pub events: Mutex<Vec<PlayerEvent>>,
}

impl PlayerEventListener for EventLog {
    fn on_event(&self, event: &PlayerEvent) {
        self.events.lock().push(event.clone());
    }
}

pub fn bridge() -> (VideoBridge, ScriptedFactory) {
    init_logging();
    let factory = ScriptedFactory::new();
    let bridge = VideoBridge::new(Arc::new(factory.clone())).unwrap();
    (bridge, factory)
}

pub fn video(width: f64, height: f64, duration_secs: f64) -> AssetInfo {
    AssetInfo {
        tracks: vec![TrackInfo::audio(), TrackInfo::video(width, height)],
        duration_secs,
    }
}

pub const URL: &str = "https://example.com/a.mp4";
