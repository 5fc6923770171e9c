// Player instance lifecycle states

use std::fmt;

/// Lifecycle of one player instance
///
/// `Created -> Loading -> Ready -> {Playing, Paused} -> Disposed`, with
/// `Failed` as the permanent outcome of a load that produced no usable asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Instance exists, asset loading has not started yet
    Created,
    /// Asset inspection is in flight
    Loading,
    /// Metadata extracted, playback operations are valid
    Ready,
    /// Playing at normal rate
    Playing,
    /// Paused after having been ready
    Paused,
    /// Load failed; only dispose (and tolerant pause) remain meaningful
    Failed,
    /// Terminal, engine released
    Disposed,
}

impl LifecycleState {
    /// Ready or any state reachable only through Ready.
    pub fn is_ready(self) -> bool {
        matches!(
            self,
            LifecycleState::Ready | LifecycleState::Playing | LifecycleState::Paused
        )
    }

    /// Load not finished yet.
    pub fn is_pending(self) -> bool {
        matches!(self, LifecycleState::Created | LifecycleState::Loading)
    }

    pub fn is_terminal(self) -> bool {
        self == LifecycleState::Disposed
    }

    /// Stable numeric code used when reporting state over the C ABI.
    pub fn as_code(self) -> i32 {
        match self {
            LifecycleState::Created => 0,
            LifecycleState::Loading => 1,
            LifecycleState::Ready => 2,
            LifecycleState::Playing => 3,
            LifecycleState::Paused => 4,
            LifecycleState::Failed => 5,
            LifecycleState::Disposed => 6,
        }
    }

    pub fn can_transition_to(self, to: LifecycleState) -> bool {
        use LifecycleState::*;

        match (self, to) {
            // Nothing leaves Disposed
            (Disposed, _) => false,

            // Any live instance can be disposed
            (_, Disposed) => true,

            // Idempotent play/pause
            (from, to) if from == to => true,

            (Created, Loading) | (Created, Failed) => true,
            (Loading, Ready) | (Loading, Failed) => true,
            (Ready, Playing) => true,
            (Playing, Paused) => true,
            (Paused, Playing) => true,

            _ => false,
        }
    }

    /// Checked transition, returning the new state.
    pub fn transition(self, to: LifecycleState) -> Result<LifecycleState, InvalidTransition> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(InvalidTransition { from: self, to })
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            LifecycleState::Created => "created",
            LifecycleState::Loading => "loading",
            LifecycleState::Ready => "ready",
            LifecycleState::Playing => "playing",
            LifecycleState::Paused => "paused",
            LifecycleState::Failed => "failed",
            LifecycleState::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

/// Rejected lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Invalid state transition from {} to {}", self.from, self.to)
    }
}

impl std::error::Error for InvalidTransition {}
