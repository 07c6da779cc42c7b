use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_SETTLE_MS: u64 = 1000;
const DEFAULT_TICK_MS: u64 = 1000;
const DEFAULT_COUNTDOWN_FROM: u8 = 3;

/// Pre-start countdown timing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownConfig {
    /// Pause before the first tick so the race view is on screen
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_start_from")]
    pub start_from: u8,
}

fn default_settle_ms() -> u64 {
    DEFAULT_SETTLE_MS
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

fn default_start_from() -> u8 {
    DEFAULT_COUNTDOWN_FROM
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            tick_ms: default_tick_ms(),
            start_from: default_start_from(),
        }
    }
}

impl CountdownConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default)]
    pub countdown: CountdownConfig,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            poll_interval_ms: default_poll_interval_ms(),
            countdown: CountdownConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw).wrap_err("invalid client config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&raw)
            .wrap_err_with(|| format!("failed to load config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?config, "loaded client config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(eyre!("poll_interval_ms must be greater than zero"));
        }
        if self.countdown.tick_ms == 0 {
            return Err(eyre!("countdown.tick_ms must be greater than zero"));
        }
        Ok(())
    }
}

/// Expands `~` and environment variables in a user supplied path.
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| eyre!("failed to expand path '{raw}': {e}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}
