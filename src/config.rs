use config::{Config, Environment, File};
use serde::Deserialize;

use crate::types::Role;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub sheet: SheetConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SheetConfig {
    /// Sheet served when a request names no source.
    pub source_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_cache_ttl() -> u64 {
    300 // 5 minutes
}

fn default_api_base() -> String {
    "https://sheets.googleapis.com".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub salt: String,
    pub users: Vec<UserEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UserEntry {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

impl AppConfig {
    /// Validate configuration for security requirements.
    pub fn validate(&self) -> Result<(), String> {
        if self.auth.salt.is_empty() || self.auth.salt == "change-me-in-production" {
            return Err("auth.salt must be set to a strong, unique value. \
                 Set it in config.toml or via EVENTDASH__AUTH__SALT env var."
                .to_string());
        }
        if self.auth.salt.len() < 16 {
            return Err("auth.salt must be at least 16 characters. \
                 Set a longer salt in config.toml or via EVENTDASH__AUTH__SALT env var."
                .to_string());
        }
        if self.auth.users.is_empty() {
            return Err("auth.users must define at least one user.".to_string());
        }
        for user in &self.auth.users {
            if user.password_hash.len() != 64
                || !user.password_hash.chars().all(|c| c.is_ascii_hexdigit())
            {
                return Err(format!(
                    "auth.users entry {:?} has a malformed password_hash; \
                     expected 64 hex chars. Generate one with `eventdash hash-password`.",
                    user.username
                ));
            }
        }
        Ok(())
    }

    pub fn load(config_path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();

        // Load from config file
        let path = config_path.unwrap_or("config.toml");
        builder = builder.add_source(File::with_name(path).required(false));

        // Overlay with environment variables (EVENTDASH__SERVER__PORT=3001, etc.)
        builder = builder.add_source(
            Environment::with_prefix("EVENTDASH")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
