use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub stream: StreamConfig,
    pub bot: BotConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Settings for the streaming transcript connection.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamConfig {
    /// WebSocket URL of the transcription gateway
    pub url: String,

    /// How long to wait for the connection to establish
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Base delay for reconnect backoff (doubles per attempt)
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound on a single backoff delay
    #[serde(default = "default_backoff_max_delay_ms")]
    pub backoff_max_delay_ms: u64,

    /// Reconnect attempts before failing terminally
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

impl StreamConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout_secs: default_connect_timeout_secs(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_delay_ms: default_backoff_max_delay_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max_delay(&self) -> Duration {
        Duration::from_millis(self.backoff_max_delay_ms)
    }
}

/// Settings for the bot manager HTTP API.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub bot_name: Option<String>,
    pub language: Option<String>,
}

/// Transcript display settings.
#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// Prefix each group with the speaker label
    #[serde(default = "default_show_speakers")]
    pub show_speakers: bool,

    /// Maximum characters per displayed chunk
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_speakers: default_show_speakers(),
            max_chunk_chars: default_max_chunk_chars(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_backoff_base_ms() -> u64 {
    800
}

fn default_backoff_max_delay_ms() -> u64 {
    30_000
}

fn default_max_reconnect_attempts() -> u32 {
    6
}

fn default_show_speakers() -> bool {
    true
}

fn default_max_chunk_chars() -> usize {
    512
}
