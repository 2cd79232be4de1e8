use chrono::{Duration, NaiveDateTime};
use tracing::{debug, warn};

use crate::store::{ChatRef, DataStore};
use crate::telegram::{ChatGateway, DialogKind, TelegramError};

/// Dashboard figures shown on the main panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemStats {
    pub set_count: usize,
    pub total_target_count: usize,
    /// Log entries strictly newer than 24 hours before `now`.
    pub logs_last_24h: usize,
}

/// Metadata for one configured target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDetail {
    /// The reference as configured, used for toggling and broadcasting.
    pub id: ChatRef,
    pub title: String,
    pub member_count: Option<i32>,
    pub reachable: bool,
}

impl ChannelDetail {
    fn unreachable(chat: &ChatRef) -> Self {
        Self {
            id: chat.clone(),
            title: format!("Error ({chat})"),
            member_count: None,
            reachable: false,
        }
    }
}

/// A group or channel the account has joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogInfo {
    /// Marked chat id.
    pub id: i64,
    pub title: String,
    pub kind: DialogKind,
}

pub async fn get_system_stats(
    store: &DataStore,
    target_count: usize,
    now: NaiveDateTime,
) -> SystemStats {
    let since = now - Duration::hours(24);
    let logs_last_24h = store
        .logs()
        .await
        .iter()
        .filter(|entry| entry.time > since)
        .count();

    SystemStats {
        set_count: store.broadcast_sets().await.len(),
        total_target_count: target_count,
        logs_last_24h,
    }
}

/// Resolves every configured channel, one at a time.
///
/// A channel that cannot be resolved gets a placeholder entry; the batch is
/// never aborted.
pub async fn get_all_channel_details<G>(gateway: &G, channels: &[ChatRef]) -> Vec<ChannelDetail>
where
    G: ChatGateway + ?Sized,
{
    let mut details = Vec::with_capacity(channels.len());

    for chat in channels {
        match gateway.get_chat(chat).await {
            Ok(info) => details.push(ChannelDetail {
                id: chat.clone(),
                title: info.title.unwrap_or_else(|| "Untitled".to_owned()),
                member_count: info.member_count,
                reachable: true,
            }),
            Err(e) => {
                warn!("Could not resolve channel {}: {}", chat, e);
                details.push(ChannelDetail::unreachable(chat));
            }
        }
    }

    details
}

/// Lists the supergroups and broadcast channels of the account.
///
/// # Errors
///
/// Returns an error if the dialog list cannot be fetched.
pub async fn scan_all_dialogs<G>(gateway: &G) -> Result<Vec<DialogInfo>, TelegramError>
where
    G: ChatGateway + ?Sized,
{
    let dialogs = gateway.list_dialogs().await?;
    let total = dialogs.len();

    let found: Vec<DialogInfo> = dialogs
        .into_iter()
        .filter(|d| matches!(d.kind, DialogKind::Supergroup | DialogKind::Channel))
        .map(|d| DialogInfo {
            id: d.id,
            title: d.title.unwrap_or_else(|| "Untitled".to_owned()),
            kind: d.kind,
        })
        .collect();

    debug!("Scanned {} dialogs, {} groups/channels", total, found.len());
    Ok(found)
}
