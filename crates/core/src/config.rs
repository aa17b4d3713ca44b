//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration as StdDuration;
use time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum size of a single uploaded chunk in bytes.
    #[serde(default = "default_max_chunk_bytes")]
    pub max_chunk_bytes: u64,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

/// Spool and video library locations.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for in-flight upload sessions.
    #[serde(default = "default_spool_path")]
    pub spool_path: PathBuf,
    /// Root directory for assembled videos, one subdirectory per station.
    #[serde(default = "default_library_path")]
    pub library_path: PathBuf,
}

/// Metadata store configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// SQLite database path.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

/// Stale-session reaper configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReaperConfig {
    /// Whether the background sweep runs at all.
    #[serde(default = "default_reaper_enabled")]
    pub enabled: bool,
    /// Seconds between sweeps.
    #[serde(default = "default_reaper_interval_secs")]
    pub interval_secs: u64,
    /// Sessions older than this many seconds are removed.
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

impl ReaperConfig {
    /// Sweep interval as a std Duration for `tokio::time`.
    pub fn interval(&self) -> StdDuration {
        StdDuration::from_secs(self.interval_secs.max(1))
    }

    /// Session time-to-live.
    pub fn session_ttl(&self) -> Duration {
        let secs = i64::try_from(self.session_ttl_secs).unwrap_or(i64::MAX);
        Duration::seconds(secs)
    }
}

/// Top-level application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub reaper: ReaperConfig,
}

impl AppConfig {
    /// Configuration for tests: paths are placeholders and are expected to
    /// be overridden by the test harness.
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig {
                spool_path: PathBuf::from("spool"),
                library_path: PathBuf::from("videos"),
            },
            metadata: MetadataConfig {
                path: PathBuf::from("airlift.db"),
            },
            reaper: ReaperConfig {
                enabled: false,
                ..ReaperConfig::default()
            },
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_max_chunk_bytes() -> u64 {
    8 * 1024 * 1024 // 8 MiB
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_spool_path() -> PathBuf {
    PathBuf::from("data/spool")
}

fn default_library_path() -> PathBuf {
    PathBuf::from("data/videos")
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data/airlift.db")
}

fn default_reaper_enabled() -> bool {
    true
}

fn default_reaper_interval_secs() -> u64 {
    3600 // 1 hour
}

fn default_session_ttl_secs() -> u64 {
    86400 // 24 hours
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_chunk_bytes: default_max_chunk_bytes(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            spool_path: default_spool_path(),
            library_path: default_library_path(),
        }
    }
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            enabled: default_reaper_enabled(),
            interval_secs: default_reaper_interval_secs(),
            session_ttl_secs: default_session_ttl_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_sections() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.server.max_chunk_bytes, 8 * 1024 * 1024);
        assert!(config.reaper.enabled);
        assert_eq!(config.reaper.session_ttl_secs, 86400);
    }

    #[test]
    fn reaper_durations() {
        let reaper = ReaperConfig {
            enabled: true,
            interval_secs: 0,
            session_ttl_secs: 60,
        };
        // Zero interval is clamped so tokio interval timers cannot panic.
        assert_eq!(reaper.interval(), StdDuration::from_secs(1));
        assert_eq!(reaper.session_ttl(), Duration::seconds(60));
    }
}
