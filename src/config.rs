use crate::logger::LogLevel;
use std::env;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-1.5-flash";

/// Environment variables consulted for the API key, in order.
pub const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub image_model: String,
    pub text_model: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: Option<u16>,
    pub log_level: LogLevel,
    pub log_json: bool,
    pub log_file: Option<String>,
    pub gemini: GeminiConfig,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        GeminiConfig {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source. The first non-empty API
    /// key variable wins.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = API_KEY_VARS.iter().find_map(|key| non_empty(*key));
        let defaults = Self::default();

        GeminiConfig {
            api_key,
            base_url: non_empty("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            image_model: non_empty("GEMINI_IMAGE_MODEL").unwrap_or(defaults.image_model),
            text_model: non_empty("GEMINI_TEXT_MODEL").unwrap_or(defaults.text_model),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn key_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: None,
            log_level: LogLevel::Info,
            log_json: false,
            log_file: None,
            gemini: GeminiConfig::default(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let host = lookup("HOST")
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(defaults.host);
        let port = lookup("PORT").and_then(|port| port.parse().ok());
        let log_level = lookup("LOG_LEVEL")
            .and_then(|level| LogLevel::parse(&level))
            .unwrap_or(defaults.log_level);
        let log_json = lookup("LOG_JSON").map_or(false, |val| val == "true");
        let log_file = lookup("LOG_FILE").filter(|path| !path.trim().is_empty());

        Config {
            host,
            port,
            log_level,
            log_json,
            log_file,
            gemini: GeminiConfig::from_lookup(&lookup),
        }
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(8888)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_gemini_key_takes_precedence() {
        let config = GeminiConfig::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "primary"),
            ("API_KEY", "secondary"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("primary"));
    }

    #[test]
    fn test_fallback_key_and_empty_values() {
        let config = GeminiConfig::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", ""),
            ("API_KEY", "secondary"),
        ]));
        assert_eq!(config.api_key.as_deref(), Some("secondary"));

        let missing = GeminiConfig::from_lookup(lookup_from(&[]));
        assert!(!missing.key_configured());
        assert_eq!(missing.image_model, DEFAULT_IMAGE_MODEL);
        assert_eq!(missing.text_model, DEFAULT_TEXT_MODEL);
    }

    #[test]
    fn test_server_config_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("PORT", "9000"),
            ("LOG_LEVEL", "debug"),
            ("LOG_JSON", "true"),
            ("GEMINI_TEXT_MODEL", "gemini-2.0-flash"),
        ]));
        assert_eq!(config.port_or_default(), 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.log_level, LogLevel::Debug);
        assert!(config.log_json);
        assert!(config.log_file.is_none());
        assert_eq!(config.gemini.text_model, "gemini-2.0-flash");
    }
}
