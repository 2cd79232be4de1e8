//! Application settings and Telegram configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::store::ChatRef;

/// Telegram API configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Telegram API ID (obtain from <https://my.telegram.org>).
    pub api_id: i32,

    /// Telegram API hash (obtain from <https://my.telegram.org>).
    pub api_hash: String,

    /// Phone number used for the first login. Prompted for when absent.
    pub phone_number: Option<String>,

    /// Two-factor password. Prompted for when absent and required.
    pub password: Option<String>,

    /// Path to the session file.
    pub session_path: PathBuf,
}

fn default_session_path() -> PathBuf {
    PathBuf::from("user_session.db")
}

/// Bot behaviour settings.
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Chat where admins issue commands and receive panels.
    pub control_chat: i64,

    /// Users allowed to drive the bot.
    pub admin_users: Vec<i64>,

    /// Destinations used by the "all groups" broadcast target.
    pub target_channels: Vec<ChatRef>,

    /// Path to the JSON data file.
    pub data_path: PathBuf,

    /// Command prefix for text commands.
    pub command_prefix: String,

    /// Pause after every broadcast send, in milliseconds.
    pub broadcast_delay_ms: u64,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data.json")
}

fn default_command_prefix() -> String {
    ".".to_owned()
}

fn default_broadcast_delay_ms() -> u64 {
    1500
}

impl BotSettings {
    /// Creates settings with defaults for the optional fields.
    #[must_use]
    pub fn new(control_chat: i64, admin_users: Vec<i64>, target_channels: Vec<ChatRef>) -> Self {
        Self {
            control_chat,
            admin_users,
            target_channels,
            data_path: default_data_path(),
            command_prefix: default_command_prefix(),
            broadcast_delay_ms: default_broadcast_delay_ms(),
        }
    }

    /// Returns whether the user may drive the bot.
    #[must_use]
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_users.contains(&user_id)
    }

    /// Delay applied after each broadcast attempt.
    #[must_use]
    pub const fn broadcast_delay(&self) -> Duration {
        Duration::from_millis(self.broadcast_delay_ms)
    }
}

/// Complete application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub bot: BotSettings,
}

impl AppConfig {
    /// Creates configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Creates configuration from an arbitrary variable lookup.
    ///
    /// Empty values are treated as missing.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &'static str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::MissingEnvVar(key));

        let api_id = parse_int("API_ID", &require("API_ID")?)?;
        let api_hash = require("API_HASH")?;

        let control_chat = parse_int("CONTROL_GROUP", &require("CONTROL_GROUP")?)?;

        let admin_users = split_list(&require("ADMIN_USERS")?)
            .map(|item| parse_int("ADMIN_USERS", item))
            .collect::<Result<Vec<i64>, _>>()?;
        if admin_users.is_empty() {
            return Err(ConfigError::EmptyList("ADMIN_USERS"));
        }

        let target_channels: Vec<ChatRef> = split_list(&require("TARGET_CHANNELS")?)
            .map(ChatRef::parse)
            .collect();
        if target_channels.is_empty() {
            return Err(ConfigError::EmptyList("TARGET_CHANNELS"));
        }

        let telegram = TelegramConfig {
            api_id,
            api_hash,
            phone_number: get("PHONE_NUMBER"),
            password: get("PASSWORD"),
            session_path: get("SESSION_PATH").map_or_else(default_session_path, PathBuf::from),
        };

        let mut bot = BotSettings::new(control_chat, admin_users, target_channels);
        if let Some(raw) = get("BROADCAST_DELAY_MS") {
            bot.broadcast_delay_ms = parse_int("BROADCAST_DELAY_MS", &raw)?;
        }
        if let Some(path) = get("DATA_PATH") {
            bot.data_path = PathBuf::from(path);
        }
        if let Some(prefix) = get("COMMAND_PREFIX") {
            bot.command_prefix = prefix;
        }

        Ok(Self { telegram, bot })
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|item| !item.is_empty())
}

fn parse_int<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Malformed {
        key,
        value: raw.to_owned(),
    })
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Environment variable {key} has an invalid value: {value:?}")]
    Malformed { key: &'static str, value: String },

    #[error("Environment variable {0} must list at least one entry")]
    EmptyList(&'static str),
}
