//! Broadcast User Bot - Main Entry Point
//!
//! A Telegram userbot that broadcasts messages to groups and channels from
//! an inline-keyboard control panel.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::{Input, Password};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use broadcast_user_bot::config::{AppConfig, TelegramConfig};
use broadcast_user_bot::handlers::{BotContext, Dispatcher};
use broadcast_user_bot::startup::announce_startup;
use broadcast_user_bot::store::DataStore;
use broadcast_user_bot::telegram::{TelegramBot, TelegramError};

/// Telegram userbot that broadcasts messages to groups and channels.
#[derive(Parser, Debug)]
#[command(name = "broadcast_bot")]
#[command(about = "Broadcast messages to your Telegram groups from a control panel")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    let config = AppConfig::from_env().context("Failed to load configuration from environment")?;
    info!(
        "Loaded configuration: control chat {}, {} admins, {} target channels",
        config.bot.control_chat,
        config.bot.admin_users.len(),
        config.bot.target_channels.len()
    );

    // Connect to Telegram
    let bot = TelegramBot::connect(&config.telegram)
        .await
        .context("Failed to connect to Telegram")?;

    // Handle authentication if needed
    if !bot.is_authorized().await.context("Failed to check authorization")? {
        authenticate(&bot, &config.telegram).await?;
    }

    let me = bot.me().await.context("Failed to load the signed-in account")?;
    info!("Signed in as {} (ID: {})", me.first_name, me.id);

    let bot = Arc::new(bot);
    let store = Arc::new(DataStore::open(&config.bot.data_path));
    info!("Using data file {}", store.path().display());

    match announce_startup(bot.as_ref(), &store, &config.bot, me.id).await {
        Ok(delivery) => debug!("Startup report delivered to {:?}", delivery),
        Err(e) => warn!("Startup scan failed: {}", e),
    }

    let mut events = bot
        .take_events()
        .await
        .context("Update stream was already taken")?;
    let ctx = Arc::new(BotContext::new(Arc::clone(&bot), store, config.bot));
    let mut dispatcher = Dispatcher::new(ctx);

    info!("Bot is running. Use Ctrl+C to stop.");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
            event = events.next_event() => match event {
                Ok(event) => dispatcher.dispatch(event).await,
                Err(e) => {
                    error!("Update stream failed: {}", e);
                    break;
                }
            },
        }
    }

    // Cleanup
    info!("Shutting down...");
    bot.disconnect();

    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Handles Telegram authentication.
///
/// Uses `PHONE_NUMBER` and `PASSWORD` from the configuration when present
/// and prompts for anything missing.
async fn authenticate(bot: &TelegramBot, config: &TelegramConfig) -> Result<()> {
    info!("Authentication required");

    let phone: String = match &config.phone_number {
        Some(phone) => phone.clone(),
        None => Input::new()
            .with_prompt("Enter your phone number (with country code)")
            .interact_text()?,
    };

    let token = bot
        .request_login_code(&phone, &config.api_hash)
        .await
        .context("Failed to request login code")?;

    info!("Login code sent to your Telegram app");

    let code: String = Input::new()
        .with_prompt("Enter the login code")
        .interact_text()?;

    match bot.sign_in(&token, &code).await {
        Ok(()) => {
            info!("Successfully signed in!");
            Ok(())
        }
        Err(TelegramError::PasswordRequired(password_token)) => {
            info!("Two-factor authentication is enabled");

            let hint = password_token.hint().unwrap_or("no hint");
            info!("Password hint: {}", hint);

            let password: String = match &config.password {
                Some(password) => password.clone(),
                None => Password::new()
                    .with_prompt("Enter your 2FA password")
                    .interact()?,
            };

            bot.check_password(password_token, &password)
                .await
                .context("2FA authentication failed")?;

            info!("Successfully signed in with 2FA!");
            Ok(())
        }
        Err(e) => Err(e).context("Authentication failed"),
    }
}
