//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "CONNECT_FOUR_BACK_CONFIG_PATH";

const DEFAULT_LOCK_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_JOIN_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_ROOM_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    lock_timeout: Duration,
    join_timeout: Duration,
    room_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        lock_timeout_ms = app_config.lock_timeout.as_millis() as u64,
                        join_timeout_ms = app_config.join_timeout.as_millis() as u64,
                        room_capacity = app_config.room_capacity,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse a JSON document. Missing keys keep their default value.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// How long a transition waits for the per-game lock.
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// How long a fresh socket may take to send its `join` frame.
    pub fn join_timeout(&self) -> Duration {
        self.join_timeout
    }

    /// Messages buffered per subscriber of a game room.
    pub fn room_capacity(&self) -> usize {
        self.room_capacity
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    lock_timeout_ms: u64,
    join_timeout_ms: u64,
    room_capacity: usize,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
            room_capacity: DEFAULT_ROOM_CAPACITY,
        }
    }
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            lock_timeout: Duration::from_millis(value.lock_timeout_ms),
            join_timeout: Duration::from_millis(value.join_timeout_ms),
            room_capacity: value.room_capacity.max(1),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
