//! Startup announcement.
//!
//! Scans the account's groups and channels, records the scan, and posts a
//! "started" notice plus the scan report to the control chat. When the
//! control chat cannot be written to, the report goes to Saved Messages so
//! the operator can pick the right id from it.

use tracing::{error, info, warn};

use crate::config::BotSettings;
use crate::info::{DialogInfo, scan_all_dialogs};
use crate::store::{DataStore, LogStatus};
use crate::telegram::{ChatGateway, TelegramError};
use crate::ui::{Panel, panels};

/// Where the startup report ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportDelivery {
    ControlChat,
    SavedMessages,
    Failed,
}

/// Runs the startup scan and announcement.
///
/// `own_user_id` is the signed-in account, whose private chat is Saved
/// Messages.
///
/// # Errors
///
/// Returns an error if the dialog list cannot be fetched.
pub async fn announce_startup<G>(
    gateway: &G,
    store: &DataStore,
    settings: &BotSettings,
    own_user_id: i64,
) -> Result<ReportDelivery, TelegramError>
where
    G: ChatGateway + ?Sized,
{
    info!("Scanning groups at startup...");
    let dialogs = scan_all_dialogs(gateway).await?;
    store
        .add_log(
            "startup_scan",
            LogStatus::Info,
            format!("Startup scan found {} groups/channels.", dialogs.len()),
            "System",
        )
        .await;

    let report = panels::dialog_report(&dialogs);
    match post_to_control_chat(gateway, settings, &report).await {
        Ok(()) => Ok(ReportDelivery::ControlChat),
        Err(e) => {
            print_control_chat_help(settings.control_chat, &e, &dialogs);
            match gateway
                .send_panel(own_user_id, &Panel::text(report), None)
                .await
            {
                Ok(_) => {
                    info!("Sent the group list to Saved Messages");
                    Ok(ReportDelivery::SavedMessages)
                }
                Err(e) => {
                    error!("Failed to send the group list to Saved Messages: {}", e);
                    Ok(ReportDelivery::Failed)
                }
            }
        }
    }
}

async fn post_to_control_chat<G>(
    gateway: &G,
    settings: &BotSettings,
    report: &str,
) -> Result<(), TelegramError>
where
    G: ChatGateway + ?Sized,
{
    let notice = Panel::text(panels::startup_notice(&settings.command_prefix));
    gateway.send_panel(settings.control_chat, &notice, None).await?;
    gateway
        .send_panel(settings.control_chat, &Panel::text(report), None)
        .await?;
    Ok(())
}

fn print_control_chat_help(control_chat: i64, err: &TelegramError, dialogs: &[DialogInfo]) {
    error!("{}", "=".repeat(60));
    error!("CONTROL_GROUP {} is wrong or not accessible: {}", control_chat, err);
    error!("The list of your groups is being sent to Saved Messages instead.");
    error!("To fix this:");
    error!("1. Open Saved Messages in Telegram.");
    error!("2. Find the group you want to use as the control chat and copy its -100 id.");
    error!("3. Put that id into CONTROL_GROUP in your .env file.");
    error!("4. Restart the bot.");
    error!("{}", "=".repeat(60));
    if dialogs.is_empty() {
        warn!("No supergroups or channels were found on this account");
    }
}
