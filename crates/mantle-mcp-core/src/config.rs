//! Configuration resolution for mantle-mcp.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (`$XDG_CONFIG_HOME/mantle-mcp/settings.json`)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables (`MANTLE_MCP_*`)
//! 5. CLI arguments (highest priority, applied by the binary)
//!
//! Files may be partial: each layer is deep-merged over the previous one, so
//! a file that only sets `bridge.call_timeout_secs` keeps every other value.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Complete mantle-mcp configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub bridge: BridgeConfig,
    pub relay: RelayConfig,
    pub upstream: UpstreamConfig,
}

/// HTTP surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Path of the long-lived event stream endpoint.
    pub sse_path: String,
    /// Path of the inbound-call endpoint.
    pub message_path: String,
    pub max_body_bytes: usize,
    /// Interval between SSE keep-alive comments. `0` disables them.
    pub keepalive_secs: u64,
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            sse_path: "/sse".to_string(),
            message_path: "/message".to_string(),
            max_body_bytes: 4 * 1024 * 1024, // 4 MB
            keepalive_secs: 15,
            log_level: "info".to_string(),
        }
    }
}

/// Session bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Upper bound on how long an inbound call waits for its reply.
    pub call_timeout_secs: u64,
    /// Maximum lifetime of one streaming session.
    pub session_max_duration_secs: u64,
    /// Interval at which buffered per-session log lines are flushed.
    pub log_flush_interval_ms: u64,
    /// Capacity of a session's outbound event queue.
    pub outbound_buffer: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: 10,
            // Platform limit of 800s, minus a margin to close cleanly.
            session_max_duration_secs: 795,
            log_flush_interval_ms: 100,
            outbound_buffer: 64,
        }
    }
}

/// Durable relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// When false, messages only travel between subscribers of one process.
    pub enabled: bool,
    pub database_path: Option<PathBuf>,
    /// Expiry of a stored message.
    pub ttl_secs: u64,
    /// Delay between two store polls of one waiting subscriber.
    pub poll_interval_ms: u64,
    /// Length of one blocking-pop window.
    pub pop_wait_ms: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_path: None,
            ttl_secs: 3600, // 1 hour
            poll_interval_ms: 100,
            pop_wait_ms: 1000,
            cleanup_interval_secs: 300,
        }
    }
}

/// Upstream data API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub coins_base_url: String,
    pub api_base_url: String,
    pub stablecoins_base_url: String,
    pub recoup_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            coins_base_url: "https://coins.llama.fi".to_string(),
            api_base_url: "https://api.llama.fi".to_string(),
            stablecoins_base_url: "https://stablecoins.llama.fi".to_string(),
            recoup_base_url: "https://api.recoupable.com/api".to_string(),
            request_timeout_secs: 15,
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// `explicit` must exist when given; the global file is optional.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default())?;

    if let Some(global_path) = global_config_path()
        && global_path.exists()
    {
        merge_values(&mut merged, load_config_file(&global_path)?);
    }

    if let Some(path) = explicit {
        merge_values(&mut merged, load_config_file(path)?);
    }

    let mut config: Config = serde_json::from_value(merged)
        .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate()?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".mantle-mcp").join("settings.json"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/mantle-mcp/settings.json"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("mantle-mcp").join("settings.json"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

impl Config {
    /// Reject values the bridge cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.bridge.call_timeout_secs == 0 {
            return Err(Error::Config("bridge.call_timeout_secs must be > 0".into()));
        }
        if self.bridge.session_max_duration_secs == 0 {
            return Err(Error::Config(
                "bridge.session_max_duration_secs must be > 0".into(),
            ));
        }
        if self.bridge.outbound_buffer == 0 {
            return Err(Error::Config("bridge.outbound_buffer must be > 0".into()));
        }
        for (name, path) in [
            ("server.sse_path", &self.server.sse_path),
            ("server.message_path", &self.server.message_path),
        ] {
            if !path.starts_with('/') {
                return Err(Error::Config(format!("{name} must start with '/'")));
            }
        }
        if self.server.sse_path == self.server.message_path {
            return Err(Error::Config(
                "server.sse_path and server.message_path must differ".into(),
            ));
        }
        if self.relay.poll_interval_ms == 0 {
            return Err(Error::Config("relay.poll_interval_ms must be > 0".into()));
        }
        Ok(())
    }
}

fn load_config_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Deep-merge `overlay` into `base`. Objects merge key by key; any other
/// overlay value replaces the base value.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Apply `MANTLE_MCP_*` overrides. `lookup` abstracts the environment so the
/// mapping can be tested without mutating process state.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(addr) = lookup("MANTLE_MCP_ADDR").and_then(|v| v.parse().ok()) {
        config.server.addr = addr;
    }
    if let Some(level) = lookup("MANTLE_MCP_LOG_LEVEL") {
        config.server.log_level = level;
    }
    if let Some(n) = lookup("MANTLE_MCP_CALL_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        config.bridge.call_timeout_secs = n;
    }
    if let Some(n) = lookup("MANTLE_MCP_MAX_DURATION_SECS").and_then(|v| v.parse().ok()) {
        config.bridge.session_max_duration_secs = n;
    }
    if let Some(path) = lookup("MANTLE_MCP_DB_PATH") {
        config.relay.database_path = Some(PathBuf::from(path));
    }
    if let Some(enabled) = lookup("MANTLE_MCP_RELAY_ENABLED").and_then(|v| v.parse().ok()) {
        config.relay.enabled = enabled;
    }
    if let Some(n) = lookup("MANTLE_MCP_RELAY_TTL_SECS").and_then(|v| v.parse().ok()) {
        config.relay.ttl_secs = n;
    }
    if let Some(url) = lookup("MANTLE_MCP_RECOUP_BASE_URL") {
        config.upstream.recoup_base_url = url;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn default_config_has_10s_call_timeout() {
        let config = Config::default();
        assert_eq!(config.bridge.call_timeout_secs, 10);
        assert_eq!(config.bridge.session_max_duration_secs, 795);
        assert_eq!(config.relay.ttl_secs, 3600);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_overlay_keeps_other_values() {
        let mut merged = serde_json::to_value(Config::default()).unwrap();
        merge_values(
            &mut merged,
            serde_json::json!({ "bridge": { "call_timeout_secs": 3 } }),
        );
        let config: Config = serde_json::from_value(merged).unwrap();
        assert_eq!(config.bridge.call_timeout_secs, 3);
        assert_eq!(config.bridge.session_max_duration_secs, 795);
        assert_eq!(config.server.sse_path, "/sse");
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{ "server": { "message_path": "/api/message" }, "relay": { "enabled": false } }"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.server.message_path, "/api/message");
        assert!(!config.relay.enabled);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/mantle-mcp.json"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("MANTLE_MCP_ADDR", "127.0.0.1:9000"),
            ("MANTLE_MCP_CALL_TIMEOUT_SECS", "4"),
            ("MANTLE_MCP_RELAY_ENABLED", "false"),
            ("MANTLE_MCP_DB_PATH", "/tmp/relay.db"),
        ]);
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(ToString::to_string));

        assert_eq!(config.server.addr.port(), 9000);
        assert_eq!(config.bridge.call_timeout_secs, 4);
        assert!(!config.relay.enabled);
        assert_eq!(
            config.relay.database_path.as_deref(),
            Some(Path::new("/tmp/relay.db"))
        );
    }

    #[test]
    fn unparseable_env_values_are_ignored() {
        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| {
            (k == "MANTLE_MCP_CALL_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert_eq!(config.bridge.call_timeout_secs, 10);
    }

    #[test]
    fn validate_rejects_same_paths() {
        let mut config = Config::default();
        config.server.message_path = "/sse".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.bridge.call_timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}
