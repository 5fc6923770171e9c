// Host application lifecycle signals

/// Application transitions the host forwards to the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostLifecycle {
    /// App is about to become inactive (incoming call, app switcher)
    WillResignActive,
    /// App moved to the background
    DidEnterBackground,
    /// App is terminating; every player is disposed
    WillTerminate,
}

impl HostLifecycle {
    /// Whether the signal only pauses playback
    pub fn pauses_playback(self) -> bool {
        matches!(
            self,
            HostLifecycle::WillResignActive | HostLifecycle::DidEnterBackground
        )
    }
}
