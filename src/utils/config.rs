//! TOML-based configuration for Aria
//!
//! Settings come from an optional `aria.toml`, then environment variables
//! (including a `.env` file loaded by the binary) override them. Secrets are
//! never written in the file: it names the environment variable that holds
//! them (`bot_token_env`, `api_key_env`).
//!
//! The configuration is built once at startup and is immutable afterwards.

use crate::llm::Provider;
use crate::types::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "aria.toml";

/// Root configuration structure loaded from aria.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AriaConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub access: AccessConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Environment variable holding the bot token from @BotFather
    #[serde(default = "default_bot_token_env")]
    pub bot_token_env: String,

    /// Long-poll timeout in seconds
    #[serde(default = "default_polling_timeout")]
    pub polling_timeout_secs: u64,

    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    /// Resolved from `bot_token_env`
    #[serde(skip)]
    pub bot_token: Option<String>,
}

fn default_bot_token_env() -> String {
    "TELEGRAM_BOT_TOKEN".to_string()
}

fn default_polling_timeout() -> u64 {
    30
}

fn default_telegram_api_base() -> String {
    crate::telegram::client::DEFAULT_API_BASE.to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token_env: default_bot_token_env(),
            polling_timeout_secs: default_polling_timeout(),
            api_base: default_telegram_api_base(),
            bot_token: None,
        }
    }
}

/// Which model backend answers messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    Gemini,
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "gemini" => Ok(ProviderKind::Gemini),
            other => Err(format!("unknown model provider '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    /// Model identifier; each provider has its own default
    #[serde(default)]
    pub model: Option<String>,

    /// Ollama server URL or Gemini API base; each provider has its own default
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable holding the Gemini API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Budget for one model call, in seconds
    #[serde(default = "default_model_timeout")]
    pub timeout_secs: u64,

    /// Replaces the built-in Aria persona
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Resolved from `api_key_env`
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_model_timeout() -> u64 {
    120
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            model: None,
            base_url: None,
            api_key_env: default_api_key_env(),
            timeout_secs: default_model_timeout(),
            system_prompt: None,
            api_key: None,
        }
    }
}

impl ModelConfig {
    pub fn model_name(&self) -> &str {
        match (&self.model, self.provider) {
            (Some(model), _) => model,
            (None, ProviderKind::Ollama) => "llama3.2",
            (None, ProviderKind::Gemini) => "gemini-2.0-flash",
        }
    }

    pub fn endpoint(&self) -> &str {
        match (&self.base_url, self.provider) {
            (Some(url), _) => url,
            (None, ProviderKind::Ollama) => "http://localhost:11434",
            (None, ProviderKind::Gemini) => crate::llm::gemini::DEFAULT_API_BASE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// SQLite file, `:memory:`, or a `libsql://` URL (with the `turso` feature)
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Entries retained per user
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Environment variable holding the Turso auth token for `libsql://` paths
    #[serde(default = "default_turso_auth_token_env")]
    pub turso_auth_token_env: String,

    /// Resolved from `turso_auth_token_env`
    #[serde(skip)]
    pub turso_auth_token: Option<String>,
}

fn default_database_path() -> String {
    "memory.db".to_string()
}

fn default_max_history() -> usize {
    crate::memory::DEFAULT_MAX_HISTORY
}

fn default_turso_auth_token_env() -> String {
    "TURSO_AUTH_TOKEN".to_string()
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            max_history: default_max_history(),
            turso_auth_token_env: default_turso_auth_token_env(),
            turso_auth_token: None,
        }
    }
}

/// Telegram user ids allowed to talk to the bot; empty admits everyone
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(default)]
    pub allowed_user_ids: Vec<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing` env-filter directive, e.g. `info` or `aria=debug,warn`
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Longer document text is truncated before it reaches the model
    #[serde(default = "default_max_document_chars")]
    pub max_document_chars: usize,
}

fn default_download_timeout() -> u64 {
    30
}

fn default_max_document_chars() -> usize {
    8000
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            download_timeout_secs: default_download_timeout(),
            max_document_chars: default_max_document_chars(),
        }
    }
}

// ============= Configuration Loading & Validation =============

/// Errors that can occur during configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Environment variable '{0}' referenced in config is not set")]
    MissingEnvVar(String),

    #[error("Environment variable '{name}' has an invalid value: {reason}")]
    InvalidEnv { name: String, reason: String },
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::InvalidEnv {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

impl AriaConfig {
    /// Parse a configuration document without applying the environment.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Build the runtime configuration: file (an explicit path must exist,
    /// the default `aria.toml` may be absent), then process environment.
    ///
    /// The result is not validated; callers decide what they need.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply environment overrides and resolve secret references.
    ///
    /// `lookup` maps a variable name to its value. Empty values count as unset.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("MODEL_PROVIDER") {
            self.model.provider = parse_env("MODEL_PROVIDER", &v)?;
        }

        match self.model.provider {
            ProviderKind::Ollama => {
                if let Some(v) = get("OLLAMA_BASE_URL") {
                    self.model.base_url = Some(v);
                }
                if let Some(v) = get("OLLAMA_MODEL") {
                    self.model.model = Some(v);
                }
            }
            ProviderKind::Gemini => {
                if let Some(v) = get("GEMINI_MODEL") {
                    self.model.model = Some(v);
                }
            }
        }

        if let Some(v) = get("MODEL_TIMEOUT_SECS") {
            self.model.timeout_secs = parse_env("MODEL_TIMEOUT_SECS", &v)?;
        }

        if let Some(v) = get("ALLOWED_USER_IDS") {
            self.access.allowed_user_ids = v
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| parse_env("ALLOWED_USER_IDS", id))
                .collect::<Result<_, _>>()?;
        }

        if let Some(v) = get("DB_PATH") {
            self.memory.database_path = v;
        }
        if let Some(v) = get("MAX_HISTORY") {
            self.memory.max_history = parse_env("MAX_HISTORY", &v)?;
        }

        if let Some(v) = get("LOG_LEVEL") {
            self.logging.level = v;
        }

        self.telegram.bot_token = get(&self.telegram.bot_token_env);
        self.model.api_key = get(&self.model.api_key_env);
        self.memory.turso_auth_token = get(&self.memory.turso_auth_token_env);

        Ok(())
    }

    /// Validate everything `run` needs, including resolved secrets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.is_none() {
            return Err(ConfigError::MissingEnvVar(
                self.telegram.bot_token_env.clone(),
            ));
        }

        if self.model.provider == ProviderKind::Gemini && self.model.api_key.is_none() {
            return Err(ConfigError::MissingEnvVar(self.model.api_key_env.clone()));
        }

        if self.model.model_name().trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "model name must not be empty".to_string(),
            ));
        }

        if self.memory.max_history == 0 {
            return Err(ConfigError::ValidationError(
                "memory.max_history must be at least 1".to_string(),
            ));
        }

        if self.memory.database_path.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "memory.database_path must not be empty".to_string(),
            ));
        }

        if self.model.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "model.timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.media.download_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "media.download_timeout_secs must be greater than zero".to_string(),
            ));
        }

        if self.media.max_document_chars == 0 {
            return Err(ConfigError::ValidationError(
                "media.max_document_chars must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// The model provider described by this configuration
    pub fn provider(&self) -> Result<Provider, ConfigError> {
        let model = self.model.model_name().to_string();
        let endpoint = self.model.endpoint().to_string();

        Ok(match self.model.provider {
            ProviderKind::Ollama => Provider::Ollama {
                base_url: endpoint,
                model,
            },
            ProviderKind::Gemini => Provider::Gemini {
                api_key: self
                    .model
                    .api_key
                    .clone()
                    .ok_or_else(|| ConfigError::MissingEnvVar(self.model.api_key_env.clone()))?,
                api_base: endpoint,
                model,
            },
        })
    }

    /// Allow-list entries as the string ids used for memory partitions
    pub fn allowed_user_ids(&self) -> Vec<String> {
        self.access
            .allowed_user_ids
            .iter()
            .map(i64::to_string)
            .collect()
    }

    /// Effective configuration as TOML; resolved secrets are never included.
    pub fn to_redacted_toml(&self) -> Result<String, AppError> {
        toml::to_string_pretty(self)
            .map_err(|e| AppError::Internal(format!("Failed to render configuration: {}", e)))
    }
}
