//! Startup credentials, read from the environment and an optional `.env` file.
//!
//! Anything wrong here aborts startup: it cannot fix itself by retrying.

use std::fmt;

use crate::APP_DIR_NAME;

pub const API_KEY_VAR: &str = "FACEIT_API_KEY";
pub const NICKNAME_VAR: &str = "FACEIT_NICKNAME";
pub const DISCORD_APP_ID_VAR: &str = "DISCORD_APP_ID";

/// Discord application registered for FACEIT presence
pub const DEFAULT_DISCORD_APP_ID: i64 = 1_459_995_747_989_848_238;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("FACEIT_API_KEY is not set")]
    MissingApiKey,

    #[error("FACEIT_NICKNAME is not set")]
    MissingNickname,

    #[error("DISCORD_APP_ID must be a numeric application id, got {0:?}")]
    InvalidDiscordAppId(String),
}

#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub nickname: String,
    pub discord_app_id: i64,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("nickname", &self.nickname)
            .field("discord_app_id", &self.discord_app_id)
            .finish()
    }
}

/// Load `.env` files into the process environment. Values already set win.
pub fn load_dotenv() {
    if let Some(path) = dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join(".env")) {
        if dotenvy::from_path(&path).is_ok() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
    }

    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }
}

impl Credentials {
    pub fn from_env() -> Result<Self, Vec<ConfigError>> {
        load_dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build credentials from any key/value source, reporting every problem at once
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Vec<ConfigError>> {
        let read = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut errors = Vec::new();

        let api_key = read(API_KEY_VAR);
        if api_key.is_none() {
            errors.push(ConfigError::MissingApiKey);
        }

        let nickname = read(NICKNAME_VAR);
        if nickname.is_none() {
            errors.push(ConfigError::MissingNickname);
        }

        let discord_app_id = match read(DISCORD_APP_ID_VAR) {
            None => Some(DEFAULT_DISCORD_APP_ID),
            Some(raw) => match raw.parse::<i64>() {
                Ok(id) if id > 0 => Some(id),
                _ => {
                    errors.push(ConfigError::InvalidDiscordAppId(raw));
                    None
                }
            },
        };

        match (api_key, nickname, discord_app_id) {
            (Some(api_key), Some(nickname), Some(discord_app_id)) if errors.is_empty() => {
                Ok(Self {
                    api_key,
                    nickname,
                    discord_app_id,
                })
            }
            _ => Err(errors),
        }
    }
}
