// Startup configuration, read from the environment (after `.env` is applied).
// The core never sees any of this directly; main.rs hands it the pieces it needs.

use chrono_tz::Tz;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_INFO_FILE: &str = "info.json";
const DEFAULT_ATTACHMENT_DIR: &str = "attachments";
const DEFAULT_LOG_FILE: &str = "quotebot.log";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {0} environment variable! Create a .env file with your bot token.")]
    Missing(&'static str),
    #[error("Unknown timezone `{0}` in QUOTEBOT_TIMEZONE")]
    InvalidTimezone(String),
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    /// Where the guild -> quote channel registry is persisted.
    pub info_file: PathBuf,
    /// Staging area for attachments between download and re-upload.
    pub attachment_dir: PathBuf,
    pub timezone: Tz,
    pub log_file: PathBuf,
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let discord_token = get("DISCORD_TOKEN").ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;

        let timezone = match get("QUOTEBOT_TIMEZONE") {
            Some(name) => name
                .trim()
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidTimezone(name))?,
            None => chrono_tz::UTC,
        };

        Ok(Self {
            discord_token,
            info_file: get("QUOTEBOT_INFO_FILE")
                .unwrap_or_else(|| DEFAULT_INFO_FILE.to_string())
                .into(),
            attachment_dir: get("QUOTEBOT_ATTACHMENT_DIR")
                .unwrap_or_else(|| DEFAULT_ATTACHMENT_DIR.to_string())
                .into(),
            timezone,
            log_file: get("QUOTEBOT_LOG_FILE")
                .unwrap_or_else(|| DEFAULT_LOG_FILE.to_string())
                .into(),
        })
    }
}
