// Headless engine adapter: asset inspection + software clock
// Used when the host does not inject a native hardware engine

pub mod clock;
pub mod engine;
pub mod mp4;
pub mod source;

use std::time::Duration;

pub use clock::PlaybackClock;
pub use engine::{ProbeEngine, ProbeEngineFactory};
pub use source::{ByteSource, FileSource, HttpSource, MemorySource};

/// Probe engine tunables
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub user_agent: String,
    pub max_redirects: u32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
            user_agent: "Mozilla/5.0 (compatible; CinescopeVideoPlayer/0.1)".to_string(),
            max_redirects: 10,
        }
    }
}
