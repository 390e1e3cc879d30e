//! Configuration loading from cumulus.toml and the environment.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use runtime::{DEFAULT_SYSTEM_PROMPT, GenerationOptions, ScanMode, ToolServerCommand};
use serde::Deserialize;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "cumulus.toml";

/// Environment variable carrying the weather provider key.
pub const API_KEY_VAR: &str = "OPENWEATHER_API_KEY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub weather: WeatherConfig,
    pub tools: ToolsConfig,
    pub prompt: PromptConfig,
    pub log: LogConfig,
}

/// HTTP listener.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Completion server and sampling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible completion server.
    pub url: String,
    pub name: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Longest wait for a single fragment before the session fails.
    pub token_timeout_secs: u64,
    pub scan: ScanMode,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080".to_string(),
            name: "gemma-2-2b-it".to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            token_timeout_secs: 60,
            scan: ScanMode::default(),
        }
    }
}

impl ModelConfig {
    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            ..GenerationOptions::default()
        }
    }

    pub fn token_timeout(&self) -> Duration {
        Duration::from_secs(self.token_timeout_secs)
    }
}

/// Weather provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub api_key: Option<String>,
    pub geo_url: String,
    pub current_url: String,
    pub timeout_secs: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            geo_url: weather::GEO_URL.to_string(),
            current_url: weather::CURRENT_URL.to_string(),
            timeout_secs: weather::DEFAULT_TIMEOUT.as_secs(),
        }
    }
}

/// Where tool calls are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// In this process.
    #[default]
    Local,
    /// In a child process speaking MCP over stdio.
    Mcp,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub transport: Transport,
    /// Tool server command for the `mcp` transport.
    pub command: String,
    pub args: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Local,
            command: "cumulus".to_string(),
            args: vec!["tool-server".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    pub system: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive; `RUST_LOG` wins when set.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load `path`, or [`DEFAULT_CONFIG_FILE`] if it exists, then apply
    /// environment overrides.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::parse(&std::fs::read_to_string(path)?)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::parse(&std::fs::read_to_string(DEFAULT_CONFIG_FILE)?)?
            }
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Override fields from environment variables, looked up through `var`.
    pub fn apply_env(
        &mut self,
        var: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("SERVER_PORT") {
            self.server.port = parse_var("SERVER_PORT", &port)?;
        }
        if let Some(url) = var("MODEL_URL") {
            self.model.url = url;
        }
        if let Some(name) = var("MODEL_NAME") {
            self.model.name = name;
        }
        if let Some(max_tokens) = var("MODEL_MAX_TOKENS") {
            self.model.max_tokens = parse_var("MODEL_MAX_TOKENS", &max_tokens)?;
        }
        if let Some(temperature) = var("MODEL_TEMPERATURE") {
            self.model.temperature = parse_var("MODEL_TEMPERATURE", &temperature)?;
        }
        if let Some(key) = var(API_KEY_VAR) {
            self.weather.api_key = Some(key);
        }
        Ok(())
    }

    /// Weather client settings. The API key is required.
    pub fn weather_client(&self) -> Result<weather::Config, ConfigError> {
        let api_key = self
            .weather
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        Ok(weather::Config {
            api_key: api_key.to_string(),
            geo_url: self.weather.geo_url.clone(),
            current_url: self.weather.current_url.clone(),
            timeout: Duration::from_secs(self.weather.timeout_secs),
        })
    }

    /// Child process settings for the `mcp` transport. The API key, when
    /// configured, is handed to the child through its environment.
    pub fn tool_server(&self) -> ToolServerCommand {
        let mut env = HashMap::new();
        if let Some(key) = &self.weather.api_key {
            env.insert(API_KEY_VAR.to_string(), key.clone());
        }
        ToolServerCommand {
            command: self.tools.command.clone(),
            args: self.tools.args.clone(),
            env,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidVar {
        name,
        value: value.to_string(),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid value for {name}: {value:?}")]
    InvalidVar { name: &'static str, value: String },

    #[error("weather API key not configured: set OPENWEATHER_API_KEY or weather.api_key")]
    MissingApiKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.model.url, "http://127.0.0.1:8080");
        assert_eq!(config.model.scan, ScanMode::Completion);
        assert_eq!(config.tools.transport, Transport::Local);
        assert_eq!(config.weather.timeout_secs, 7);
        assert_eq!(config.prompt.system, DEFAULT_SYSTEM_PROMPT);
    }

    #[test]
    fn parses_sections() {
        let config = Config::parse(
            r#"
            [server]
            port = 9000

            [model]
            name = "gemma-3"
            scan = "fragment"
            token_timeout_secs = 5

            [weather]
            api_key = "from-file"

            [tools]
            transport = "mcp"
            command = "/usr/local/bin/cumulus"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.model.name, "gemma-3");
        assert_eq!(config.model.scan, ScanMode::Fragment);
        assert_eq!(config.model.token_timeout(), Duration::from_secs(5));
        assert_eq!(config.tools.transport, Transport::Mcp);
        assert_eq!(config.tools.args, vec!["tool-server".to_string()]);
        assert_eq!(config.weather_client().unwrap().api_key, "from-file");
    }

    #[test]
    fn unknown_scan_mode_is_a_parse_error() {
        let err = Config::parse("[model]\nscan = \"eager\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = Config::parse("[server]\nport = 9000").unwrap();
        config
            .apply_env(env(&[
                ("SERVER_PORT", "8123"),
                ("MODEL_URL", "http://gpu:8080"),
                ("OPENWEATHER_API_KEY", "from-env"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 8123);
        assert_eq!(config.model.url, "http://gpu:8080");
        assert_eq!(config.weather_client().unwrap().api_key, "from-env");
        assert_eq!(
            config.tool_server().env.get(API_KEY_VAR).map(String::as_str),
            Some("from-env")
        );
    }

    #[test]
    fn bad_numeric_override_is_rejected() {
        let mut config = Config::default();
        let err = config.apply_env(env(&[("SERVER_PORT", "http")])).unwrap_err();
        assert_eq!(err.to_string(), r#"invalid value for SERVER_PORT: "http""#);
    }

    #[test]
    fn missing_or_blank_api_key_is_fatal() {
        let mut config = Config::default();
        assert!(matches!(
            config.weather_client(),
            Err(ConfigError::MissingApiKey)
        ));

        config.weather.api_key = Some("  ".to_string());
        assert!(matches!(
            config.weather_client(),
            Err(ConfigError::MissingApiKey)
        ));
    }
}
