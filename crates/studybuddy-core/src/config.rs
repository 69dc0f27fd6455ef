//! TOML-based application configuration.
//!
//! Stores the server port, Google OAuth client settings, and AI coach
//! settings. Secrets may be supplied either in the file or through the
//! environment (`GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`,
//! `OPENAI_API_KEY`), with the environment taking precedence.
//!
//! Configuration is stored at `~/.config/studybuddy/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, CoreError, Result};
use crate::storage::data_dir;

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: default_port() }
    }
}

/// Google Calendar sync configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Target calendar; `primary` is the account's default calendar.
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    /// IANA time zone attached to projected events.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// Redirect URI registered with the OAuth client.
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            calendar_id: default_calendar_id(),
            time_zone: default_time_zone(),
            redirect_uri: default_redirect_uri(),
        }
    }
}

/// AI coach configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
        }
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/studybuddy/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub ai: AiConfig,
}

// Default functions
fn default_port() -> u16 {
    3001
}
fn default_calendar_id() -> String {
    "primary".into()
}
fn default_time_zone() -> String {
    "UTC".into()
}
fn default_redirect_uri() -> String {
    "urn:ietf:wg:oauth:2.0:oob".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}

impl Config {
    /// Load from the default location, falling back to defaults when the
    /// file does not exist. Environment secrets override file values.
    pub fn load() -> Result<Self> {
        let path = data_dir()?.join("config.toml");
        Self::load_from(&path)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                CoreError::Config(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            })?;
            toml::from_str(&content)
                .map_err(|e| CoreError::Config(ConfigError::ParseFailed(e.to_string())))?
        } else {
            Config::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("GOOGLE_CLIENT_ID") {
            self.google.client_id = Some(v);
        }
        if let Ok(v) = std::env::var("GOOGLE_CLIENT_SECRET") {
            self.google.client_secret = Some(v);
        }
        if let Ok(v) = std::env::var("OPENAI_API_KEY") {
            self.ai.api_key = Some(v);
        }
    }
}
