// Bridge configuration

use cinescope_core::LoadOptions;
use log::LevelFilter;

pub const DEFAULT_CHANNEL_NAME: &str = "com.cinescope/videoplayer";
pub const DEFAULT_VIEW_TYPE: &str = "com.cinescope/videoplayer/view";

/// Environment variable overriding the log level
pub const ENV_LOG_LEVEL: &str = "CINESCOPE_LOG";
/// Environment variable overriding the command channel name
pub const ENV_CHANNEL: &str = "CINESCOPE_CHANNEL";

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Name of the host command channel the bridge answers on
    pub channel_name: String,
    /// Identifier the host uses to create video views
    pub view_type: String,
    /// Name of the serialized command worker thread
    pub worker_name: String,
    pub log_level: LevelFilter,
    /// Options passed to every engine on creation
    pub load_options: LoadOptions,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            channel_name: DEFAULT_CHANNEL_NAME.to_string(),
            view_type: DEFAULT_VIEW_TYPE.to_string(),
            worker_name: "cinescope-commands".to_string(),
            log_level: LevelFilter::Info,
            load_options: LoadOptions::default(),
        }
    }
}

impl BridgeConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_overrides(
            std::env::var(ENV_LOG_LEVEL).ok().as_deref(),
            std::env::var(ENV_CHANNEL).ok().as_deref(),
        )
    }

    fn with_overrides(mut self, log_level: Option<&str>, channel: Option<&str>) -> Self {
        if let Some(level) = log_level {
            match level.parse::<LevelFilter>() {
                Ok(parsed) => self.log_level = parsed,
                Err(_) => log::warn!("[config] ignoring invalid {}={}", ENV_LOG_LEVEL, level),
            }
        }
        if let Some(channel) = channel.filter(|c| !c.is_empty()) {
            self.channel_name = channel.to_string();
        }
        self
    }
}
