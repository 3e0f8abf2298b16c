use crate::constants::{
    APP_NAME, DEFAULT_MAX_RECONNECT_DELAY_MS, DEFAULT_RECONNECT_ATTEMPTS,
    DEFAULT_RECONNECT_DELAY_MS, DEFAULT_SERVER_URL, DEFAULT_TYPING_SPEED_MS,
};
use crate::errors::{ChatlineError, ChatlineResult};
use crate::protocol::socket_endpoint;
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf, str::FromStr};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub typing_speed_ms: u64,
    pub reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
    pub max_reconnect_delay_ms: u64,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            typing_speed_ms: DEFAULT_TYPING_SPEED_MS,
            reconnect_attempts: DEFAULT_RECONNECT_ATTEMPTS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            max_reconnect_delay_ms: DEFAULT_MAX_RECONNECT_DELAY_MS,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

/// Loads `~/.config/chatline/config.json` (if present), applies environment
/// overrides and validates the result.
pub fn load_config() -> ChatlineResult<Config> {
    let config_path = get_config_path()?;
    let mut config = load_config_from(&config_path)?;
    apply_env_overrides(&mut config, |key| env::var(key).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Reads a config file, falling back to defaults when it does not exist.
pub fn load_config_from(path: &Path) -> ChatlineResult<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let config_str = fs::read_to_string(path)
        .map_err(|e| ChatlineError::config_error(format!("Failed to read config file: {}", e)))?;

    serde_json::from_str(&config_str)
        .map_err(|e| ChatlineError::config_error(format!("Failed to parse config: {}", e)))
}

/// Applies `CHATLINE_*` overrides looked up through `lookup`.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> ChatlineResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup("CHATLINE_SERVER_URL") {
        config.server_url = url;
    }
    if let Some(speed) = lookup("CHATLINE_TYPING_SPEED_MS") {
        config.typing_speed_ms = speed.trim().parse().map_err(|e| {
            ChatlineError::config_error(format!("Invalid CHATLINE_TYPING_SPEED_MS '{}': {}", speed, e))
        })?;
    }
    if let Some(level) = lookup("CHATLINE_LOG_LEVEL") {
        config.log_level = level;
    }
    Ok(())
}

fn get_config_path() -> ChatlineResult<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| ChatlineError::config_error("Could not determine home directory"))?;

    Ok(home_dir.join(".config").join(APP_NAME).join("config.json"))
}

pub fn validate_config(config: &Config) -> ChatlineResult<()> {
    if config.server_url.trim().is_empty() {
        return Err(ChatlineError::config_error("Server URL is required"));
    }
    socket_endpoint(&config.server_url).map_err(|e| {
        ChatlineError::config_error(format!("Invalid server URL '{}': {}", config.server_url, e))
    })?;

    if config.typing_speed_ms == 0 {
        return Err(ChatlineError::config_error("typing_speed_ms must be greater than 0"));
    }

    if config.reconnect_delay_ms > config.max_reconnect_delay_ms {
        return Err(ChatlineError::config_error(
            "reconnect_delay_ms must not exceed max_reconnect_delay_ms",
        ));
    }

    LevelFilter::from_str(&config.log_level).map_err(|_| {
        ChatlineError::config_error(format!("Unknown log level '{}'", config.log_level))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_validate_config_valid() {
        let config = Config::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_config_invalid_server_url() {
        let mut config = Config::default();
        config.server_url = "".to_string();
        assert!(validate_config(&config).is_err());

        config.server_url = "ftp://example.com".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_invalid_typing_speed() {
        let mut config = Config::default();
        config.typing_speed_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_config_invalid_log_level() {
        let mut config = Config::default();
        config.log_level = "loud".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "server_url": "http://localhost:3000", "typing_speed_ms": 10 }"#)
            .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.server_url, "http://localhost:3000");
        assert_eq!(config.typing_speed_ms, 10);
        assert_eq!(config.reconnect_attempts, DEFAULT_RECONNECT_ATTEMPTS);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_config_from(&path), Err(ChatlineError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CHATLINE_SERVER_URL", "https://chat.example.com"),
            ("CHATLINE_TYPING_SPEED_MS", "5"),
            ("CHATLINE_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.server_url, "https://chat.example.com");
        assert_eq!(config.typing_speed_ms, 5);
        assert_eq!(config.log_level, "debug");
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_env_override_rejects_bad_speed() {
        let mut config = Config::default();
        let result = apply_env_overrides(&mut config, |k| {
            (k == "CHATLINE_TYPING_SPEED_MS").then(|| "fast".to_string())
        });
        assert!(result.is_err());
    }
}
