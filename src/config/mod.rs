//! Configuration module for the broadcast bot.
//!
//! Loads Telegram API credentials and bot behaviour settings from the
//! environment (optionally seeded from a `.env` file).

mod settings;

pub use settings::{AppConfig, BotSettings, ConfigError, TelegramConfig};
