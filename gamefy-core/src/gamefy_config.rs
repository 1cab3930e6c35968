//! GameFy calendar configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_FUTURE_DAYS, DEFAULT_PAST_DAYS};
use crate::date_range::DateRange;
use crate::error::{CoreError, CoreResult};

static DEFAULT_EVENTS_FILE: &str = "~/.local/share/gamefy/events.json";
static DEFAULT_CACHE_TTL: &str = "5m";
static DEFAULT_FEED_TIMEOUT: &str = "10s";
static DEFAULT_LISTEN: &str = "127.0.0.1:4096";

fn default_events_file() -> PathBuf {
    PathBuf::from(DEFAULT_EVENTS_FILE)
}

fn default_past_days() -> i64 {
    DEFAULT_PAST_DAYS
}

fn default_future_days() -> i64 {
    DEFAULT_FUTURE_DAYS
}

fn default_cache_ttl() -> String {
    DEFAULT_CACHE_TTL.to_string()
}

fn default_feed_timeout() -> String {
    DEFAULT_FEED_TIMEOUT.to_string()
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

/// Configuration at ~/.config/gamefy/config.toml.
///
/// Every key can be overridden from the environment with a `GAMEFY_` prefix,
/// e.g. `GAMEFY_FEED_URL`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GamefyConfig {
    /// External ICS feed; without one only stored events are shown
    #[serde(default)]
    pub feed_url: Option<String>,

    #[serde(default = "default_events_file")]
    pub events_file: PathBuf,

    #[serde(default = "default_past_days")]
    pub past_days: i64,

    #[serde(default = "default_future_days")]
    pub future_days: i64,

    /// humantime duration, e.g. "5m"
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: String,

    /// humantime duration, e.g. "10s"
    #[serde(default = "default_feed_timeout")]
    pub feed_timeout: String,

    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for GamefyConfig {
    fn default() -> Self {
        GamefyConfig {
            feed_url: None,
            events_file: default_events_file(),
            past_days: DEFAULT_PAST_DAYS,
            future_days: DEFAULT_FUTURE_DAYS,
            cache_ttl: default_cache_ttl(),
            feed_timeout: default_feed_timeout(),
            listen: default_listen(),
        }
    }
}

impl GamefyConfig {
    pub fn config_path() -> CoreResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CoreError::Config("Could not determine config directory".into()))?
            .join("gamefy");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location, creating a commented template first
    /// if no file exists.
    pub fn load() -> CoreResult<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Self::load_from(&config_path)
    }

    /// Load from `path` (optional) layered under `GAMEFY_*` environment variables.
    pub fn load_from(path: &Path) -> CoreResult<Self> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix("GAMEFY"))
            .build()
            .map_err(|e| CoreError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> CoreResult<()> {
        let contents = format!(
            "\
# GameFy calendar configuration

# Public ICS feed merged into the calendar view:
# feed_url = \"https://calendar.google.com/calendar/ical/.../basic.ics\"

# Natively stored events (JSON array):
# events_file = \"{}\"

# Default window when no range is given:
# past_days = {}
# future_days = {}

# How long the server may reuse an expanded feed:
# cache_ttl = \"{}\"

# HTTP timeout for the feed request:
# feed_timeout = \"{}\"

# Server bind address:
# listen = \"{}\"
",
            DEFAULT_EVENTS_FILE,
            DEFAULT_PAST_DAYS,
            DEFAULT_FUTURE_DAYS,
            DEFAULT_CACHE_TTL,
            DEFAULT_FEED_TIMEOUT,
            DEFAULT_LISTEN
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CoreError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| CoreError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    /// `events_file` with `~` expanded.
    pub fn events_path(&self) -> PathBuf {
        let full_path_str =
            shellexpand::tilde(&self.events_file.to_string_lossy()).into_owned();

        PathBuf::from(full_path_str)
    }

    pub fn cache_ttl(&self) -> CoreResult<Duration> {
        parse_humantime("cache_ttl", &self.cache_ttl)
    }

    pub fn feed_timeout(&self) -> CoreResult<Duration> {
        parse_humantime("feed_timeout", &self.feed_timeout)
    }

    /// Window used when a caller gives no explicit bounds.
    pub fn default_range(&self, now: DateTime<Utc>) -> DateRange {
        DateRange::around(now, self.past_days, self.future_days)
    }

    /// Configured feed URL, ignoring blank values.
    pub fn feed_url(&self) -> Option<&str> {
        self.feed_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

fn parse_humantime(key: &str, value: &str) -> CoreResult<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| CoreError::Config(format!("Invalid {} '{}': {}", key, value, e)))
}
