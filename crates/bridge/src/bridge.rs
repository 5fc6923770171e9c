// Video bridge: the host-facing entry point

use crate::config::BridgeConfig;
use crate::lifecycle::HostLifecycle;
use crate::protocol::{Command, Responder, ViewArgs};
use crate::worker::{self, Message, PendingReply};
use cinescope_core::{
    BridgeError, EngineFactory, EventHub, LifecycleState, PlayerEventListener, PlayerHandle,
    RenderSurface, Result,
};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

/// Owns the command worker and with it every live player.
///
/// Constructed at application start and shut down explicitly (or on drop).
/// Listeners and command responders run on the worker thread. From there,
/// `bind_surface` fails, `handles`/`state_of` report nothing and `shutdown`
/// does not join; `PendingReply::wait` must not be called there at all.
pub struct VideoBridge {
    config: BridgeConfig,
    sender: Sender<Message>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_thread: ThreadId,
    events: Arc<EventHub>,
}

impl VideoBridge {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Result<Self> {
        Self::with_config(BridgeConfig::default(), factory)
    }

    pub fn with_config(config: BridgeConfig, factory: Arc<dyn EngineFactory>) -> Result<Self> {
        let events = Arc::new(EventHub::new());
        let (sender, worker) = worker::spawn(&config, factory, events.clone())?;
        log::info!(
            "[bridge] video bridge ready on channel {}",
            config.channel_name
        );
        Ok(Self {
            config,
            sender,
            worker_thread: worker.thread().id(),
            worker: Mutex::new(Some(worker)),
            events,
        })
    }

    /// True when called from a listener or responder
    pub fn on_worker_thread(&self) -> bool {
        thread::current().id() == self.worker_thread
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn add_listener(&self, listener: Arc<dyn PlayerEventListener>) {
        self.events.add_listener(listener);
    }

    /// Dispatch a raw command; validation failures resolve immediately
    pub fn dispatch(&self, method: &str, args: &Value) -> PendingReply {
        match Command::parse(method, args) {
            Ok(command) => self.submit(command),
            Err(err) => {
                log::warn!("[bridge] rejected {}: {} {}", method, err.code(), err.message());
                PendingReply::resolved(Err(err))
            }
        }
    }

    /// Dispatch a raw command and report through `responder`
    pub fn dispatch_with(&self, method: &str, args: &Value, responder: Responder) {
        match Command::parse(method, args) {
            Ok(command) => self.submit_with(command, responder),
            Err(err) => {
                log::warn!("[bridge] rejected {}: {} {}", method, err.code(), err.message());
                responder(Err(err));
            }
        }
    }

    pub fn submit(&self, command: Command) -> PendingReply {
        let (reply, responder) = PendingReply::channel();
        self.submit_with(command, responder);
        reply
    }

    pub fn submit_with(&self, command: Command, responder: Responder) {
        if let Err(err) = self.sender.send(Message::Command { command, responder }) {
            if let Message::Command { command, responder } = err.into_inner() {
                responder(Err(BridgeError::InstanceNotFound(command.handle())));
            }
        }
    }

    /// Presentable surface for a player; starts playback when `autoplay` is set and the player is Ready
    pub fn bind_surface(&self, handle: PlayerHandle, autoplay: bool) -> Result<RenderSurface> {
        if self.on_worker_thread() {
            return Err(BridgeError::Engine(format!(
                "Cannot bind surface for player {} from the command worker",
                handle
            )));
        }
        let (reply, rx) = crossbeam_channel::bounded(1);
        self.sender
            .send(Message::BindSurface {
                handle,
                autoplay,
                reply,
            })
            .map_err(|_| BridgeError::InstanceNotFound(handle))?;
        rx.recv()
            .unwrap_or(Err(BridgeError::InstanceNotFound(handle)))
    }

    /// Surface for a platform view created with `{playerId, isPlaying}`
    pub fn create_view(&self, args: &Value) -> Result<RenderSurface> {
        let view = ViewArgs::parse(args)?;
        self.bind_surface(view.handle, view.autoplay)
    }

    /// Pause every live player
    pub fn pause_all(&self) {
        self.handle_lifecycle(HostLifecycle::DidEnterBackground);
    }

    pub fn handle_lifecycle(&self, signal: HostLifecycle) {
        if self.sender.send(Message::Lifecycle(signal)).is_err() {
            log::debug!("[bridge] lifecycle {:?} after shutdown", signal);
        }
    }

    fn snapshot(&self) -> Vec<(PlayerHandle, LifecycleState)> {
        if self.on_worker_thread() {
            log::warn!("[bridge] state query from the command worker ignored");
            return Vec::new();
        }
        let (reply, rx) = crossbeam_channel::bounded(1);
        if self.sender.send(Message::Snapshot { reply }).is_err() {
            return Vec::new();
        }
        rx.recv().unwrap_or_default()
    }

    /// Snapshot of live handles
    pub fn handles(&self) -> Vec<PlayerHandle> {
        let mut handles: Vec<_> = self.snapshot().into_iter().map(|(h, _)| h).collect();
        handles.sort_unstable();
        handles
    }

    pub fn state_of(&self, handle: PlayerHandle) -> Option<LifecycleState> {
        self.snapshot()
            .into_iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, s)| s)
    }

    /// Dispose every player and stop the worker
    pub fn shutdown(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let _ = self.sender.send(Message::Shutdown);
            if self.on_worker_thread() {
                // Worker exits after the current message
                log::info!("[bridge] shutdown requested from the command worker");
                return;
            }
            if worker.join().is_err() {
                log::error!("[bridge] command worker panicked");
            }
            log::info!("[bridge] video bridge shut down");
        }
    }
}

impl Drop for VideoBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}
