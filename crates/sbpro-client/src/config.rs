//! Client configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::LevelFilter;

use crate::{ClientError, Result};

/// Server locations, feed timezone, and session timing.
///
/// Every field has a default, so a JSON config only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Live tick server (`host:port`).
    pub live_server: String,
    /// Archive server (`host:port`).
    pub archive_server: String,
    /// Catalog server (`host:port`).
    pub catalog_server: String,
    /// Timezone of the feed's timestamps and trading dates.
    pub timezone: Tz,
    /// Root directory of the archive cache.
    pub cache_dir: PathBuf,
    /// Number of most recent contracts used per symbol.
    pub contracts_per_symbol: usize,
    /// Delay between polls of one live session (in milliseconds).
    pub poll_interval_ms: u64,
    /// Delay before a live session reconnects (in milliseconds).
    pub reconnect_delay_ms: u64,
    /// Capacity of the merged live tick channel.
    pub channel_capacity: usize,
    /// Optional deadline for each live response (in milliseconds).
    pub read_timeout_ms: Option<u64>,
    /// Command sent to the catalog server.
    pub catalog_request: String,
    /// Minimum level written to log sinks.
    pub log_level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            live_server: "62.138.11.5:6777".to_string(),
            archive_server: "62.138.11.5:6627".to_string(),
            catalog_server: "62.138.11.5:7730".to_string(),
            timezone: chrono_tz::America::Chicago,
            cache_dir: PathBuf::from("cache"),
            contracts_per_symbol: 2,
            poll_interval_ms: 2_000,
            reconnect_delay_ms: 10_000,
            channel_capacity: 64,
            read_timeout_ms: None,
            catalog_request: "symbols".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl ClientConfig {
    /// Loads a config from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ClientError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ClientError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Returns the poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Returns the reconnect delay.
    #[must_use]
    pub const fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Returns the live read deadline, if any.
    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    /// Returns the live channel capacity, at least one.
    #[must_use]
    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity.max(1)
    }

    /// Parses the configured log level.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidLogLevel`] for an unknown level name.
    pub fn level_filter(&self) -> Result<LevelFilter> {
        self.log_level
            .parse()
            .map_err(|_| ClientError::InvalidLogLevel(self.log_level.clone()))
    }
}
