//! Standalone checker for the bot's configuration and data file.
//!
//! Loads the `.env` file the way the bot does, validates every variable,
//! and checks the JSON data file without connecting to Telegram.

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use broadcast_user_bot::config::AppConfig;
use broadcast_user_bot::store::{ChatRef, StoreDocument, StoreError, load_document};

/// Configuration checker.
#[derive(Parser, Debug)]
#[command(name = "check_config")]
#[command(about = "Checks the environment configuration and data file of the broadcast userbot")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Path to the JSON data file (defaults to DATA_PATH from the environment).
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Show every configured target and broadcast set.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    println!("Environment file: {}", args.env_file);
    match dotenvy::from_filename(&args.env_file) {
        Ok(path) => println!("✓ Loaded {}", path.display()),
        Err(e) => println!("⚠ Could not load {} ({e}), using process environment", args.env_file),
    }

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("✓ Configuration is valid");
    println!("  API_ID:          {}", config.telegram.api_id);
    println!("  API_HASH:        {}", mask(&config.telegram.api_hash));
    println!("  Control chat:    {}", config.bot.control_chat);
    println!("  Admins:          {}", config.bot.admin_users.len());
    println!("  Targets:         {}", config.bot.target_channels.len());
    println!("  Command prefix:  {}", config.bot.command_prefix);
    println!("  Broadcast delay: {} ms", config.bot.broadcast_delay_ms);
    println!("  Session file:    {}", config.telegram.session_path.display());

    if !config.bot.control_chat.to_string().starts_with("-100") {
        println!("  ⚠ CONTROL_GROUP does not look like a supergroup id (-100...)");
    }

    if args.verbose {
        for target in &config.bot.target_channels {
            println!("    • {target}");
        }
    }

    let data_path = args.data.unwrap_or_else(|| config.bot.data_path.clone());
    println!("\nData file: {}", data_path.display());

    match load_document(&data_path) {
        Ok(doc) => check_document(&doc, &config.bot.target_channels, args.verbose),
        Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            println!("⚠ Not found, the bot will create it on first write");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ {e}");
            eprintln!("  The bot would start with an empty data file and overwrite it.");
            ExitCode::FAILURE
        }
    }
}

fn check_document(doc: &StoreDocument, targets: &[ChatRef], verbose: bool) -> ExitCode {
    println!("✓ Parsed: {} log entries, {} broadcast sets", doc.logs.len(), doc.broadcast_sets.len());

    let mut errors = 0;
    let mut seen = HashSet::new();

    for set in &doc.broadcast_sets {
        if verbose {
            println!("[{}] \"{}\" ({} channels)", set.id, set.name, set.channels.len());
        }
        if !seen.insert(set.id) {
            errors += 1;
            println!("  ✗ Duplicate set id {}", set.id);
        }
        if set.name.trim().is_empty() {
            println!("  ⚠ Set {} has an empty name", set.id);
        }
        for channel in set.channels.iter().filter(|c| !targets.contains(c)) {
            println!("  ⚠ Set {} contains {channel}, which is not in TARGET_CHANNELS", set.id);
        }
    }

    if errors == 0 {
        println!("\n✓ Data file is valid!");
        ExitCode::SUCCESS
    } else {
        println!("\n✗ Validation failed: {errors} error(s)");
        ExitCode::FAILURE
    }
}

/// Shows only the first and last two characters of a secret.
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_owned();
    }
    format!(
        "{}****{}",
        chars[..2].iter().collect::<String>(),
        chars[chars.len() - 2..].iter().collect::<String>()
    )
}
