//! Configuration loading for VigiTVA.
//! Reads vigitva.toml from the current directory or the path in VIGITVA_CONFIG.
//! A missing file is not an error: every section has defaults.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_ENV: &str = "VIGITVA_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "vigitva.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_host()       -> String  { "127.0.0.1".to_string() }
fn default_port()       -> u16     { 3001 }
fn default_static_dir() -> PathBuf { PathBuf::from("crates/vigitva-web/static") }

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), static_dir: default_static_dir() }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Fill empty collections with the demo dataset at startup.
    #[serde(default = "default_true")]
    pub seed_demo_data: bool,
}

fn default_data_dir() -> PathBuf { PathBuf::from("./data") }
fn default_true()     -> bool    { true }

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir(), seed_demo_data: true }
    }
}

/// Chat-completion backend settings. DeepSeek speaks the OpenAI wire format.
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    /// Inline key. Prefer the environment variable named by `api_key_env`.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_llm_base_url() -> String { "https://api.deepseek.com".to_string() }
fn default_llm_model()    -> String { "deepseek-chat".to_string() }
fn default_api_key_env()  -> String { "DEEPSEEK_API_KEY".to_string() }
fn default_max_tokens()   -> u32    { 500 }
fn default_temperature()  -> f32    { 0.3 }
fn default_timeout_secs() -> u64    { 30 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base_url(),
            model: default_llm_model(),
            api_key: None,
            api_key_env: default_api_key_env(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_key_env", &self.api_key_env)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LlmConfig {
    /// Key from the process environment, falling back to the inline value.
    pub fn resolve_api_key(&self) -> Option<SecretString> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    pub fn resolve_api_key_with<F>(&self, lookup: F) -> Option<SecretString>
    where
        F: Fn(&str) -> Option<String>,
    {
        lookup(&self.api_key_env)
            .or_else(|| self.api_key.clone())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .map(SecretString::from)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Multiplier on staged-progress durations. 0 makes every stage instant.
    #[serde(default = "default_progress_scale")]
    pub progress_scale: f64,
    #[serde(default = "default_batch_step_delay_ms")]
    pub batch_step_delay_ms: u64,
}

fn default_progress_scale()      -> f64 { 1.0 }
fn default_batch_step_delay_ms() -> u64 { 200 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            progress_scale: default_progress_scale(),
            batch_step_delay_ms: default_batch_step_delay_ms(),
        }
    }
}

impl AnalysisConfig {
    /// No artificial delays anywhere. Used by tests.
    pub fn instant() -> Self {
        Self { progress_scale: 0.0, batch_step_delay_ms: 0 }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_city")]
    pub city: String,
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
}

fn default_city()             -> String { "Paris,FR".to_string() }
fn default_weather_base_url() -> String { "https://api.openweathermap.org".to_string() }

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            city: default_city(),
            base_url: default_weather_base_url(),
        }
    }
}

impl fmt::Debug for WeatherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("city", &self.city)
            .field("base_url", &self.base_url)
            .finish()
    }
}


impl Config {
    /// Load configuration from vigitva.toml.
    /// Checks VIGITVA_CONFIG first, then the current directory.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let path = Path::new(&path);

        if !path.exists() {
            tracing::info!(path = %path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        }
        Self::from_path(path)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.analysis.progress_scale.is_finite() || self.analysis.progress_scale < 0.0 {
            return Err(ConfigError::Invalid {
                field: "analysis.progress_scale",
                reason: "must be a non-negative number".into(),
            });
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::Invalid {
                field: "llm.temperature",
                reason: format!("{} is outside 0.0..=2.0", self.llm.temperature),
            });
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "llm.timeout_secs",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
