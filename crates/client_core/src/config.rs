use std::{collections::HashMap, fs, time::Duration};

use thiserror::Error;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "todo.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_url: String,
    pub api_token: Option<String>,
    pub page_size: u32,
    pub debounce_ms: u64,
    pub history_limit: u32,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:5000/api".into(),
            api_token: None,
            page_size: 10,
            debounce_ms: 300,
            history_limit: 10,
            request_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid api url '{url}': {reason}")]
    InvalidApiUrl { url: String, reason: String },
    #[error("page size must be at least 1")]
    ZeroPageSize,
    #[error("history limit must be at least 1")]
    ZeroHistoryLimit,
}

impl Settings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// API root with any trailing slash removed, ready for path joins.
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = Url::parse(&self.api_url).map_err(|e| ConfigError::InvalidApiUrl {
            url: self.api_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidApiUrl {
                url: self.api_url.clone(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        if self.page_size == 0 {
            return Err(ConfigError::ZeroPageSize);
        }
        if self.history_limit == 0 {
            return Err(ConfigError::ZeroHistoryLimit);
        }
        Ok(())
    }
}

pub fn load_settings() -> Result<Settings, ConfigError> {
    let raw = fs::read_to_string(DEFAULT_CONFIG_FILE).ok();
    load_settings_from(raw.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then the config file, then the environment.
pub fn load_settings_from(
    file_contents: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings, ConfigError> {
    let mut settings = Settings::default();

    if let Some(raw) = file_contents {
        match toml::from_str::<HashMap<String, toml::Value>>(raw) {
            Ok(file_cfg) => apply_file(&mut settings, &file_cfg),
            Err(err) => tracing::warn!(error = %err, "ignoring unreadable {DEFAULT_CONFIG_FILE}"),
        }
    }

    if let Some(v) = env("TODO_API_URL") {
        settings.api_url = v;
    }
    if let Some(v) = env("APP__API_URL") {
        settings.api_url = v;
    }

    if let Some(v) = env("TODO_API_TOKEN") {
        settings.api_token = Some(v);
    }
    if let Some(v) = env("APP__API_TOKEN") {
        settings.api_token = Some(v);
    }

    if let Some(v) = env("APP__PAGE_SIZE").and_then(|v| v.parse().ok()) {
        settings.page_size = v;
    }
    if let Some(v) = env("APP__DEBOUNCE_MS").and_then(|v| v.parse().ok()) {
        settings.debounce_ms = v;
    }
    if let Some(v) = env("APP__HISTORY_LIMIT").and_then(|v| v.parse().ok()) {
        settings.history_limit = v;
    }
    if let Some(v) = env("APP__REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
        settings.request_timeout_secs = v;
    }

    settings.api_token = settings.api_token.filter(|t| !t.trim().is_empty());
    settings.validate()?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, file_cfg: &HashMap<String, toml::Value>) {
    if let Some(v) = file_cfg.get("api_url").and_then(|v| v.as_str()) {
        settings.api_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("api_token").and_then(|v| v.as_str()) {
        settings.api_token = Some(v.to_string());
    }
    if let Some(v) = file_cfg.get("page_size").and_then(as_u32) {
        settings.page_size = v;
    }
    if let Some(v) = file_cfg.get("debounce_ms").and_then(as_u64) {
        settings.debounce_ms = v;
    }
    if let Some(v) = file_cfg.get("history_limit").and_then(as_u32) {
        settings.history_limit = v;
    }
    if let Some(v) = file_cfg.get("request_timeout_secs").and_then(as_u64) {
        settings.request_timeout_secs = v;
    }
}

fn as_u64(value: &toml::Value) -> Option<u64> {
    match value {
        toml::Value::Integer(i) => u64::try_from(*i).ok(),
        toml::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn as_u32(value: &toml::Value) -> Option<u32> {
    as_u64(value).and_then(|v| u32::try_from(v).ok())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
