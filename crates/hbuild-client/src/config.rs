use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Env var that overrides `server_url` from the config file.
pub const SERVER_ENV: &str = "HBUILD_SERVER";

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

// ── Config ──

/// How the log view receives new fragments.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogTransportKind {
    /// Server-sent event stream, falling back to polling if the server
    /// only serves snapshots.
    #[default]
    Stream,
    /// Full snapshot fetch on a fixed interval.
    Poll,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    None,
    Linear,
    #[default]
    Exponential,
}

/// Reconnect delays for the log stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconnectConfig {
    #[serde(default = "default_reconnect_base_ms")]
    pub base_ms: u64,
    #[serde(default = "default_reconnect_max_ms")]
    pub max_ms: u64,
    #[serde(default)]
    pub strategy: BackoffStrategy,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_ms: default_reconnect_base_ms(),
            max_ms: default_reconnect_max_ms(),
            strategy: BackoffStrategy::default(),
        }
    }
}

/// Client settings, stored as JSON (default `<config_dir>/hbuild/client.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Silence on an open log stream before it is treated as lost. 0 disables.
    #[serde(default = "default_stream_idle_timeout_ms")]
    pub stream_idle_timeout_ms: u64,
    #[serde(default)]
    pub log_transport: LogTransportKind,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}
fn default_status_interval_ms() -> u64 {
    2_000
}
fn default_log_interval_ms() -> u64 {
    1_000
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_stream_idle_timeout_ms() -> u64 {
    60_000
}
fn default_reconnect_base_ms() -> u64 {
    500
}
fn default_reconnect_max_ms() -> u64 {
    30_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            status_interval_ms: default_status_interval_ms(),
            log_interval_ms: default_log_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            stream_idle_timeout_ms: default_stream_idle_timeout_ms(),
            log_transport: LogTransportKind::default(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl ClientConfig {
    /// `<config_dir>/hbuild/client.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|d| d.join("hbuild").join("client.json"))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `HBUILD_SERVER` if set and non-empty.
    pub fn with_env_override(self) -> Self {
        self.with_server_override(std::env::var(SERVER_ENV).ok())
    }

    pub fn with_server_override(mut self, server: Option<String>) -> Self {
        if let Some(url) = server.filter(|s| !s.trim().is_empty()) {
            self.server_url = url.trim().to_string();
        }
        self
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms.max(1))
    }

    pub fn log_interval(&self) -> Duration {
        Duration::from_millis(self.log_interval_ms.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms.max(1))
    }

    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        (self.stream_idle_timeout_ms > 0).then(|| Duration::from_millis(self.stream_idle_timeout_ms))
    }
}

// ── Raw key/value access ──

/// Read the config file as a flat JSON object. Missing file → empty map.
pub fn read_map(path: &Path) -> Result<serde_json::Map<String, serde_json::Value>, ConfigError> {
    if !path.exists() {
        return Ok(serde_json::Map::new());
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let val: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    match val {
        serde_json::Value::Object(map) => Ok(map),
        _ => Ok(serde_json::Map::new()),
    }
}

/// Write the map atomically (temp file in the same dir, then rename).
pub fn write_map(
    path: &Path,
    config: &serde_json::Map<String, serde_json::Value>,
) -> Result<(), ConfigError> {
    let write_err = |source: std::io::Error| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    let json = serde_json::to_string_pretty(config).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent).map_err(write_err)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(json.as_bytes()).map_err(write_err)?;
    tmp.flush().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

/// Parse a CLI string into bool / number / string.
pub fn parse_value(s: &str) -> serde_json::Value {
    match s {
        "true" => serde_json::Value::Bool(true),
        "false" => serde_json::Value::Bool(false),
        _ => {
            if let Ok(n) = s.parse::<u64>() {
                serde_json::Value::Number(n.into())
            } else if let Ok(n) = s.parse::<i64>() {
                serde_json::Value::Number(n.into())
            } else {
                serde_json::Value::String(s.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = ClientConfig::load(&tmp.path().join("client.json")).unwrap();
        assert_eq!(cfg, ClientConfig::default());
        assert_eq!(cfg.server_url, "http://localhost:8000");
        assert_eq!(cfg.log_transport, LogTransportKind::Stream);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("client.json");
        std::fs::write(
            &path,
            r#"{"server_url": "http://build:9000", "log_transport": "poll", "reconnect": {"base_ms": 100}}"#,
        )
        .unwrap();
        let cfg = ClientConfig::load(&path).unwrap();
        assert_eq!(cfg.server_url, "http://build:9000");
        assert_eq!(cfg.log_transport, LogTransportKind::Poll);
        assert_eq!(cfg.reconnect.base_ms, 100);
        assert_eq!(cfg.reconnect.max_ms, 30_000);
        assert_eq!(cfg.status_interval(), Duration::from_secs(2));
        assert_eq!(cfg.stream_idle_timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn zero_idle_timeout_disables_it() {
        let cfg = ClientConfig {
            stream_idle_timeout_ms: 0,
            ..ClientConfig::default()
        };
        assert_eq!(cfg.stream_idle_timeout(), None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("client.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            ClientConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn server_override_ignores_blank() {
        let cfg = ClientConfig::default().with_server_override(Some("  ".into()));
        assert_eq!(cfg.server_url, DEFAULT_SERVER_URL);
        let cfg = ClientConfig::default().with_server_override(Some("http://x:1".into()));
        assert_eq!(cfg.server_url, "http://x:1");
    }

    #[test]
    fn map_roundtrip_feeds_typed_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("client.json");
        let mut map = read_map(&path).unwrap();
        assert!(map.is_empty());
        map.insert("status_interval_ms".into(), parse_value("5000"));
        map.insert("log_transport".into(), parse_value("poll"));
        write_map(&path, &map).unwrap();

        let cfg = ClientConfig::load(&path).unwrap();
        assert_eq!(cfg.status_interval_ms, 5000);
        assert_eq!(cfg.log_transport, LogTransportKind::Poll);
    }

    #[test]
    fn parse_value_types() {
        assert_eq!(parse_value("true"), serde_json::Value::Bool(true));
        assert_eq!(parse_value("42"), serde_json::json!(42));
        assert_eq!(parse_value("-1"), serde_json::json!(-1));
        assert_eq!(parse_value("stream"), serde_json::json!("stream"));
    }
}
