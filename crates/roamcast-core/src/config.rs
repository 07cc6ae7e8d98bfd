//! Roamcast configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, RoamcastError};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoamcastConfig {
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

fn default_api_key() -> String { String::new() }
fn default_api_base_url() -> String { "https://api.openai.com/v1".into() }

impl Default for RoamcastConfig {
    fn default() -> Self {
        Self {
            api_key: default_api_key(),
            api_base_url: default_api_base_url(),
            llm: LlmConfig::default(),
            telegram: TelegramConfig::default(),
            delivery: DeliveryConfig::default(),
            gateway: GatewayConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl RoamcastConfig {
    /// Load config from the default path (~/.roamcast/config.toml),
    /// then overlay environment variables.
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RoamcastError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RoamcastError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| RoamcastError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Overlay deployment environment variables onto the loaded config.
    /// Hosted deployments configure everything through the environment.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            self.api_key = v;
        }
        if let Ok(v) = std::env::var("TELEGRAM_TOKEN") {
            self.telegram.bot_token = v;
        }
        if let Ok(v) = std::env::var("TELEGRAM_GROUP_ID") {
            self.telegram.group_id = v;
        }
        if let Ok(v) = std::env::var("ADMIN_CHAT_ID") {
            self.telegram.admin_chat_id = v;
        }
        if let Ok(v) = std::env::var("DATABASE_URL") {
            self.storage.database_url = v;
        }
        if let Ok(v) = std::env::var("PORT")
            && let Ok(port) = v.parse()
        {
            self.gateway.port = port;
        }
        if let Ok(v) = std::env::var("RELAY_MODE") {
            self.delivery.relay_mode = matches!(v.as_str(), "1" | "true" | "yes");
        }
    }

    /// Check that the settings required for publishing are present.
    /// Returns the names of the missing ones.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.telegram.bot_token.is_empty() {
            missing.push("telegram.bot_token");
        }
        if self.telegram.group_id.is_empty() {
            missing.push("telegram.group_id");
        }
        missing
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Roamcast home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".roamcast")
    }
}

/// Generative oracle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_text_model")]
    pub text_model: String,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_image_size")]
    pub image_size: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_text_model() -> String { "gpt-4o-mini".into() }
fn default_image_model() -> String { "dall-e-3".into() }
fn default_image_size() -> String { "1024x1024".into() }
fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u32 { 2000 }

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            text_model: default_text_model(),
            image_model: default_image_model(),
            image_size: default_image_size(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Telegram configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
    /// Default target group for publishing.
    #[serde(default)]
    pub group_id: String,
    /// Chat for admin commands and status notices. Empty disables notices.
    #[serde(default)]
    pub admin_chat_id: String,
}

/// Delivery configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// When true, generated posts are handed back to the automation relay
    /// instead of being pushed to Telegram directly.
    #[serde(default)]
    pub relay_mode: bool,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self { relay_mode: false }
    }
}

/// Gateway (HTTP server) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 { 8000 }
fn default_host() -> String { "0.0.0.0".into() }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Postgres connection string. Empty selects the file backend.
    #[serde(default)]
    pub database_url: String,
    /// Directory for the file backend's JSON state.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

fn default_state_dir() -> String { "~/.roamcast/state".into() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            state_dir: default_state_dir(),
        }
    }
}
