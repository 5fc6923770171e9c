// Software playback clock
// Tracks the position a real decoder would report while playing at 1.0x

use std::time::Instant;

/// Playback position clock
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    /// Position at the last anchor point
    anchor_position_ms: u64,
    /// Set while playing
    anchor: Option<Instant>,
    rate: f64,
    duration_ms: Option<u64>,
}

impl PlaybackClock {
    pub fn new() -> Self {
        Self {
            anchor_position_ms: 0,
            anchor: None,
            rate: 1.0,
            duration_ms: None,
        }
    }

    pub fn set_duration(&mut self, duration_ms: Option<u64>) {
        self.duration_ms = duration_ms;
    }

    pub fn is_running(&self) -> bool {
        self.anchor.is_some()
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn position_at(&self, now: Instant) -> u64 {
        let position = match self.anchor {
            Some(anchor) => {
                let elapsed = now.saturating_duration_since(anchor).as_secs_f64() * 1000.0;
                self.anchor_position_ms + (elapsed * self.rate) as u64
            }
            None => self.anchor_position_ms,
        };
        self.clamp(position)
    }

    pub fn position(&self) -> u64 {
        self.position_at(Instant::now())
    }

    /// Start running at normal rate
    pub fn play_at(&mut self, now: Instant) {
        self.rate = 1.0;
        if self.anchor.is_none() {
            self.anchor = Some(now);
        }
    }

    pub fn pause_at(&mut self, now: Instant) {
        if self.anchor.is_some() {
            self.anchor_position_ms = self.position_at(now);
            self.anchor = None;
        }
    }

    pub fn seek_at(&mut self, position_ms: u64, now: Instant) {
        self.anchor_position_ms = self.clamp(position_ms);
        if self.anchor.is_some() {
            self.anchor = Some(now);
        }
    }

    fn clamp(&self, position_ms: u64) -> u64 {
        match self.duration_ms {
            Some(duration) => position_ms.min(duration),
            None => position_ms,
        }
    }
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new()
    }
}
