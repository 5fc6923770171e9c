// Probe engine: inspects the asset on a loader thread and drives a software clock

use crate::clock::PlaybackClock;
use crate::mp4;
use crate::source::{open_source, ByteSource};
use crate::ProbeConfig;
use cinescope_core::{
    EngineError, EngineFactory, EngineResult, LoadCompletion, LoadOptions, PlaybackEngine,
    PlayerHandle, SeekTolerance,
};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use url::Url;

pub struct ProbeEngine {
    handle: PlayerHandle,
    url: Url,
    options: LoadOptions,
    config: ProbeConfig,
    clock: Arc<Mutex<PlaybackClock>>,
    volume: f32,
    released: Arc<AtomicBool>,
    /// Pre-opened source, used instead of resolving the URL
    source: Option<Box<dyn ByteSource>>,
    loader: Option<thread::JoinHandle<()>>,
}

impl ProbeEngine {
    pub fn new(handle: PlayerHandle, url: Url, options: LoadOptions, config: ProbeConfig) -> Self {
        log::info!("[engine] probe engine for player {} -> {}", handle, url);
        Self {
            handle,
            url,
            options,
            config,
            clock: Arc::new(Mutex::new(PlaybackClock::new())),
            volume: 1.0,
            released: Arc::new(AtomicBool::new(false)),
            source: None,
            loader: None,
        }
    }

    /// Engine reading from an already opened source
    pub fn with_source(handle: PlayerHandle, url: Url, source: Box<dyn ByteSource>) -> Self {
        let mut engine = Self::new(handle, url, LoadOptions::default(), ProbeConfig::default());
        engine.source = Some(source);
        engine
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_playing(&self) -> bool {
        self.clock.lock().is_running()
    }

    fn ensure_live(&self) -> EngineResult<()> {
        if self.released.load(Ordering::SeqCst) {
            Err(EngineError::new("engine already released"))
        } else {
            Ok(())
        }
    }
}

impl PlaybackEngine for ProbeEngine {
    fn load(&mut self, completion: LoadCompletion) {
        let handle = self.handle;
        let url = self.url.clone();
        let config = self.config.clone();
        let source = self.source.take();
        let clock = self.clock.clone();
        let released = self.released.clone();

        log::debug!(
            "[engine] player {} loading (precise_timing={}, peak_bitrate={})",
            handle,
            self.options.precise_timing,
            self.options.preferred_peak_bitrate
        );

        // The completion must fire exactly once, even if the loader cannot be spawned
        let slot = Arc::new(Mutex::new(Some(completion)));
        let thread_slot = slot.clone();

        let spawned = thread::Builder::new()
            .name(format!("cinescope-probe-{}", handle))
            .spawn(move || {
                let inspected = panic::catch_unwind(AssertUnwindSafe(|| match source {
                    Some(mut s) => mp4::inspect(s.as_mut()),
                    None => open_source(&url, &config).and_then(|mut s| mp4::inspect(s.as_mut())),
                }));
                let result = inspected.unwrap_or_else(|_| {
                    log::error!("[engine] player {} asset inspection panicked", handle);
                    Err(EngineError::new("asset inspection panicked"))
                });

                if released.load(Ordering::SeqCst) {
                    log::debug!("[engine] player {} load finished after release", handle);
                }

                match &result {
                    Ok(info) => {
                        let duration_ms = if info.duration_secs.is_finite() {
                            Some((info.duration_secs * 1000.0).floor() as u64)
                        } else {
                            None
                        };
                        clock.lock().set_duration(duration_ms);
                    }
                    Err(e) => log::warn!("[engine] player {} load failed: {}", handle, e),
                }

                let done = thread_slot.lock().take();
                if let Some(done) = done {
                    done(result);
                }
            });

        match spawned {
            Ok(join) => self.loader = Some(join),
            Err(e) => {
                log::error!("[engine] failed to spawn loader thread: {}", e);
                let done = slot.lock().take();
                if let Some(done) = done {
                    done(Err(EngineError::new(format!("failed to spawn loader: {}", e))));
                }
            }
        }
    }

    fn play(&mut self) -> EngineResult<()> {
        self.ensure_live()?;
        self.clock.lock().play_at(Instant::now());
        Ok(())
    }

    fn pause(&mut self) -> EngineResult<()> {
        self.ensure_live()?;
        self.clock.lock().pause_at(Instant::now());
        Ok(())
    }

    fn seek(&mut self, position_ms: u64, tolerance: SeekTolerance) -> EngineResult<()> {
        self.ensure_live()?;
        log::debug!(
            "[engine] player {} seek to {} ms ({:?})",
            self.handle,
            position_ms,
            tolerance
        );
        self.clock.lock().seek_at(position_ms, Instant::now());
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) -> EngineResult<()> {
        self.ensure_live()?;
        self.volume = volume;
        Ok(())
    }

    fn position_ms(&self) -> u64 {
        self.clock.lock().position()
    }

    fn surface_layer(&self) -> Option<u64> {
        // Headless: nothing to present
        None
    }

    fn release(&mut self) -> EngineResult<()> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.clock.lock().pause_at(Instant::now());

        // A loader still blocked on the network is detached, not joined
        if let Some(loader) = self.loader.take() {
            if loader.is_finished() {
                let _ = loader.join();
            }
        }
        log::info!("[engine] probe engine for player {} released", self.handle);
        Ok(())
    }
}

impl Drop for ProbeEngine {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

/// Factory handing out probe engines
#[derive(Debug, Clone, Default)]
pub struct ProbeEngineFactory {
    config: ProbeConfig,
}

impl ProbeEngineFactory {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }
}

impl EngineFactory for ProbeEngineFactory {
    fn create_engine(
        &self,
        handle: PlayerHandle,
        url: &Url,
        options: LoadOptions,
    ) -> EngineResult<Box<dyn PlaybackEngine>> {
        Ok(Box::new(ProbeEngine::new(
            handle,
            url.clone(),
            options,
            self.config.clone(),
        )))
    }
}
