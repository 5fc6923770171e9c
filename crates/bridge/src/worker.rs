// Serialized command worker
//
// One thread owns the registry. Commands, load completions, surface requests
// and lifecycle signals all arrive on one channel and are applied in order.

use crate::config::BridgeConfig;
use crate::lifecycle::HostLifecycle;
use crate::protocol::{Command, Responder};
use crate::registry::{LoadNotifier, Registry};
use cinescope_core::{
    AssetInfo, BridgeError, EngineFactory, EngineResult, EventHub, LifecycleState, PlayerHandle,
    RenderSurface, Result,
};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use serde_json::Value;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub(crate) enum Message {
    Command {
        command: Command,
        responder: Responder,
    },
    LoadFinished {
        handle: PlayerHandle,
        token: u64,
        result: EngineResult<AssetInfo>,
    },
    BindSurface {
        handle: PlayerHandle,
        autoplay: bool,
        reply: Sender<Result<RenderSurface>>,
    },
    Lifecycle(HostLifecycle),
    Snapshot {
        reply: Sender<Vec<(PlayerHandle, LifecycleState)>>,
    },
    Shutdown,
}

/// Result of a dispatched command, resolved on the worker thread
pub struct PendingReply {
    rx: Receiver<Result<Value>>,
}

impl PendingReply {
    /// Reply channel plus the responder that resolves it
    pub(crate) fn channel() -> (Self, Responder) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let responder: Responder = Box::new(move |result| {
            let _ = tx.send(result);
        });
        (Self { rx }, responder)
    }

    /// Already resolved reply
    pub(crate) fn resolved(result: Result<Value>) -> Self {
        let (reply, responder) = Self::channel();
        responder(result);
        reply
    }

    /// Block until the command completes
    pub fn wait(self) -> Result<Value> {
        self.rx.recv().unwrap_or_else(|_| Err(worker_gone()))
    }

    /// Block for at most `timeout`; `None` if the command is still in flight
    pub fn wait_timeout(&self, timeout: Duration) -> Option<Result<Value>> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(worker_gone())),
        }
    }

    /// Non-blocking poll
    pub fn try_take(&self) -> Option<Result<Value>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(worker_gone())),
        }
    }
}

fn worker_gone() -> BridgeError {
    BridgeError::Engine("command worker stopped".to_string())
}

/// Start the worker thread; returns the sender every request goes through
pub(crate) fn spawn(
    config: &BridgeConfig,
    factory: Arc<dyn EngineFactory>,
    events: Arc<EventHub>,
) -> Result<(Sender<Message>, JoinHandle<()>)> {
    let (tx, rx) = crossbeam_channel::unbounded();

    let loads = tx.clone();
    let notifier: LoadNotifier = Arc::new(
        move |handle: PlayerHandle, token: u64, result: EngineResult<AssetInfo>| {
            let message = Message::LoadFinished {
                handle,
                token,
                result,
            };
            if loads.send(message).is_err() {
                log::debug!("[worker] load completion for player {} after shutdown", handle);
            }
        },
    );

    let load_options = config.load_options;
    let join = thread::Builder::new()
        .name(config.worker_name.clone())
        .spawn(move || {
            let mut registry = Registry::new(factory, events, notifier, load_options);
            run(&mut registry, &rx);
            registry.shutdown();
            drain(&rx);
        })
        .map_err(|e| BridgeError::InitializationFailed(format!("failed to spawn worker: {}", e)))?;

    log::info!("[worker] command worker started ({})", config.worker_name);
    Ok((tx, join))
}

fn run(registry: &mut Registry, rx: &Receiver<Message>) {
    for message in rx.iter() {
        match message {
            Message::Command { command, responder } => execute(registry, command, responder),
            Message::LoadFinished {
                handle,
                token,
                result,
            } => registry.complete_load(handle, token, result),
            Message::BindSurface {
                handle,
                autoplay,
                reply,
            } => {
                let _ = reply.send(registry.surface(handle, autoplay));
            }
            Message::Lifecycle(signal) => {
                log::info!("[worker] host lifecycle {:?}", signal);
                if signal.pauses_playback() {
                    registry.pause_all();
                } else {
                    registry.shutdown();
                }
            }
            Message::Snapshot { reply } => {
                let snapshot = registry
                    .handles()
                    .into_iter()
                    .filter_map(|h| registry.state_of(h).map(|s| (h, s)))
                    .collect();
                let _ = reply.send(snapshot);
            }
            Message::Shutdown => break,
        }
    }
    log::info!("[worker] command worker stopping");
}

/// Answer whatever was queued behind the shutdown request
fn drain(rx: &Receiver<Message>) {
    for message in rx.try_iter() {
        match message {
            Message::Command { command, responder } => {
                responder(Err(BridgeError::InstanceNotFound(command.handle())))
            }
            Message::BindSurface { handle, reply, .. } => {
                let _ = reply.send(Err(BridgeError::InstanceNotFound(handle)));
            }
            Message::Snapshot { reply } => {
                let _ = reply.send(Vec::new());
            }
            Message::LoadFinished { .. } | Message::Lifecycle(_) | Message::Shutdown => {}
        }
    }
}

/// Wrap a responder so every failure is logged with its wire code
fn logged(method: &'static str, handle: PlayerHandle, responder: Responder) -> Responder {
    Box::new(move |result: Result<Value>| {
        if let Err(err) = &result {
            log::warn!(
                "[worker] {} on player {} failed: {} {}",
                method,
                handle,
                err.code(),
                err.message()
            );
        }
        responder(result)
    })
}

fn execute(registry: &mut Registry, command: Command, responder: Responder) {
    let responder = logged(command.method(), command.handle(), responder);
    log::debug!("[worker] {} player {}", command.method(), command.handle());

    let result = match command {
        Command::Initialize { handle, url } => {
            // Answered once the load completes
            registry.initialize(handle, url, responder);
            return;
        }
        Command::Preload { handle, url } => registry.preload(handle, url).map(|_| Value::Null),
        Command::Play { handle } => registry
            .get_mut(handle)
            .and_then(|p| p.play())
            .map(|_| Value::Null),
        Command::Pause { handle } => registry
            .get_mut(handle)
            .and_then(|p| p.pause())
            .map(|_| Value::Null),
        Command::SeekTo {
            handle,
            position_ms,
        } => registry
            .get_mut(handle)
            .and_then(|p| p.seek_to(position_ms))
            .map(|_| Value::Null),
        Command::SetVolume { handle, volume } => registry
            .get_mut(handle)
            .and_then(|p| p.set_volume(volume))
            .map(|_| Value::Null),
        Command::GetPosition { handle } => registry
            .get(handle)
            .and_then(|p| p.position_ms())
            .map(Value::from),
        Command::Dispose { handle } => registry.dispose(handle).map(|_| Value::Null),
    };

    responder(result);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolved_reply() {
        let reply = PendingReply::resolved(Ok(json!(5)));
        assert_eq!(reply.try_take(), Some(Ok(json!(5))));
    }

    #[test]
    fn test_reply_in_flight_then_resolved() {
        let (reply, responder) = PendingReply::channel();
        assert_eq!(reply.try_take(), None);
        assert_eq!(reply.wait_timeout(Duration::from_millis(10)), None);
        responder(Err(BridgeError::InstanceNotFound(2)));
        assert_eq!(reply.wait(), Err(BridgeError::InstanceNotFound(2)));
    }

    #[test]
    fn test_dropped_responder_reports_worker_gone() {
        let (reply, responder) = PendingReply::channel();
        drop(responder);
        assert_eq!(reply.wait().unwrap_err().code(), "ENGINE_ERROR");
    }
}
