//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`HuddleSettings::default()`]
//! 2. If `~/.huddle/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `HUDDLE_*` environment overrides (highest priority)
//! 4. Validate cross-field constraints
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{HuddleSettings, LogFormat};

/// Resolve the path to the settings file (`~/.huddle/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".huddle").join("settings.json")
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a file with invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<HuddleSettings> {
    let mut settings = load_file_layer(path)?;
    apply_overrides(&mut settings, |key| std::env::var(key).ok());
    validate(&settings)?;
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<HuddleSettings> {
    let defaults = serde_json::to_value(HuddleSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `HUDDLE_*` overrides read through `lookup`.
///
/// Invalid or out-of-range values are ignored with a warning.
pub fn apply_overrides(settings: &mut HuddleSettings, lookup: impl Fn(&str) -> Option<String>) {
    let env = EnvReader { lookup };

    if let Some(v) = env.string("HUDDLE_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.ranged("HUDDLE_PORT", 0_u16, u16::MAX) {
        settings.server.port = v;
    }
    if let Some(v) = env.ranged("HUDDLE_MAX_CONNECTIONS", 1_usize, 1_000_000) {
        settings.server.max_connections = v;
    }
    if let Some(v) = env.ranged("HUDDLE_HEARTBEAT_INTERVAL", 1_u64, 3600) {
        settings.server.heartbeat_interval_secs = v;
    }
    if let Some(v) = env.ranged("HUDDLE_HEARTBEAT_TIMEOUT", 1_u64, 86_400) {
        settings.server.heartbeat_timeout_secs = v;
    }
    if let Some(v) = env.ranged("HUDDLE_SEND_QUEUE", 1_usize, 65_536) {
        settings.server.send_queue_capacity = v;
    }
    if let Some(v) = env.string("HUDDLE_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.string("HUDDLE_LOG_FORMAT") {
        match parse_log_format(&v) {
            Some(format) => settings.logging.format = format,
            None => warn!(key = "HUDDLE_LOG_FORMAT", value = %v, "invalid log format, ignoring"),
        }
    }
}

/// Check constraints that span fields.
pub fn validate(settings: &HuddleSettings) -> Result<()> {
    let server = &settings.server;
    if server.heartbeat_timeout_secs < server.heartbeat_interval_secs {
        return Err(SettingsError::InvalidValue(format!(
            "heartbeatTimeoutSecs ({}) must be >= heartbeatIntervalSecs ({})",
            server.heartbeat_timeout_secs, server.heartbeat_interval_secs
        )));
    }
    if server.send_queue_capacity == 0 {
        return Err(SettingsError::InvalidValue(
            "sendQueueCapacity must be at least 1".into(),
        ));
    }
    if server.max_connections == 0 {
        return Err(SettingsError::InvalidValue(
            "maxConnections must be at least 1".into(),
        ));
    }
    Ok(())
}

/// Parse a number and accept it only within `[min, max]`.
pub fn parse_in_range<T>(val: &str, min: T, max: T) -> Option<T>
where
    T: std::str::FromStr + PartialOrd,
{
    let n: T = val.trim().parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse `compact` / `json` (case-insensitive).
pub fn parse_log_format(val: &str) -> Option<LogFormat> {
    match val.to_ascii_lowercase().as_str() {
        "compact" => Some(LogFormat::Compact),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

struct EnvReader<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn ranged<T>(&self, name: &str, min: T, max: T) -> Option<T>
    where
        T: std::str::FromStr + PartialOrd,
    {
        let val = (self.lookup)(name)?;
        let result = parse_in_range(&val, min, max);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid numeric env var, ignoring");
        }
        result
    }
}
