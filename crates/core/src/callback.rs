// Lifecycle event fan-out to host listeners

use crate::metadata::VideoMetadata;
use crate::state::LifecycleState;
use crate::PlayerHandle;
use parking_lot::Mutex;
use std::sync::Arc;

/// Player event types
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Instance lifecycle state changed
    StateChanged {
        handle: PlayerHandle,
        old_state: LifecycleState,
        new_state: LifecycleState,
    },

    /// Asset loaded and metadata extracted
    Initialized {
        handle: PlayerHandle,
        metadata: VideoMetadata,
    },

    /// Asset could not be loaded
    InitializationFailed { handle: PlayerHandle, message: String },

    /// Volume accepted
    VolumeChanged { handle: PlayerHandle, volume: f32 },

    /// Instance removed from the registry
    Disposed { handle: PlayerHandle },
}

impl PlayerEvent {
    pub fn handle(&self) -> PlayerHandle {
        match self {
            PlayerEvent::StateChanged { handle, .. }
            | PlayerEvent::Initialized { handle, .. }
            | PlayerEvent::InitializationFailed { handle, .. }
            | PlayerEvent::VolumeChanged { handle, .. }
            | PlayerEvent::Disposed { handle } => *handle,
        }
    }
}

/// Player event listener trait
/// Called on the command worker thread; implementations should return quickly
pub trait PlayerEventListener: Send + Sync {
    fn on_event(&self, event: &PlayerEvent);
}

/// Hub for handling multiple listeners
pub struct EventHub {
    listeners: Mutex<Vec<Arc<dyn PlayerEventListener>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn PlayerEventListener>) {
        self.listeners.lock().push(listener);
    }

    pub fn clear_listeners(&self) {
        self.listeners.lock().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn dispatch(&self, event: PlayerEvent) {
        // Snapshot so a listener may register another listener without deadlocking
        let listeners: Vec<_> = self.listeners.lock().iter().cloned().collect();
        for listener in listeners {
            listener.on_event(&event);
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingListener {
        events: Mutex<Vec<PlayerEvent>>,
    }

    impl PlayerEventListener for RecordingListener {
        fn on_event(&self, event: &PlayerEvent) {
            self.events.lock().push(event.clone());
        }
    }

    #[test]
    fn test_all_listeners_receive_events() {
        let hub = EventHub::new();
        let a = Arc::new(RecordingListener {
            events: Mutex::new(Vec::new()),
        });
        let b = Arc::new(RecordingListener {
            events: Mutex::new(Vec::new()),
        });
        hub.add_listener(a.clone());
        hub.add_listener(b.clone());

        hub.dispatch(PlayerEvent::Disposed { handle: 4 });

        assert_eq!(a.events.lock().len(), 1);
        assert_eq!(b.events.lock()[0].handle(), 4);
    }

    #[test]
    fn test_clear_listeners() {
        let hub = EventHub::new();
        let a = Arc::new(RecordingListener {
            events: Mutex::new(Vec::new()),
        });
        hub.add_listener(a.clone());
        hub.clear_listeners();
        hub.dispatch(PlayerEvent::VolumeChanged {
            handle: 1,
            volume: 0.5,
        });
        assert!(a.events.lock().is_empty());
        assert_eq!(hub.listener_count(), 0);
    }
}
