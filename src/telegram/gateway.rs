//! Narrow capability interface over the Telegram client.
//!
//! Services and handlers only talk to Telegram through [`ChatGateway`], so
//! they can be exercised against an in-memory implementation.

use async_trait::async_trait;

use super::TelegramError;
use crate::store::ChatRef;
use crate::ui::Panel;

/// Identifies one message in one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageRef {
    /// Marked chat id.
    pub chat_id: i64,
    pub message_id: i32,
}

impl MessageRef {
    #[must_use]
    pub const fn new(chat_id: i64, message_id: i32) -> Self {
        Self {
            chat_id,
            message_id,
        }
    }
}

/// Metadata about a single chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInfo {
    /// Marked chat id.
    pub id: i64,
    pub title: Option<String>,
    pub member_count: Option<i32>,
}

/// Kind of conversation in the dialog list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    User,
    Group,
    Supergroup,
    Channel,
}

impl DialogKind {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Group => "Group",
            Self::Supergroup => "Supergroup",
            Self::Channel => "Channel",
        }
    }
}

/// One entry of the account's dialog list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogEntry {
    /// Marked chat id.
    pub id: i64,
    pub title: Option<String>,
    pub kind: DialogKind,
}

/// Operations the bot needs from a Telegram client.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Resolves a chat and fetches its metadata.
    async fn get_chat(&self, chat: &ChatRef) -> Result<ChatInfo, TelegramError>;

    /// Copies a message into another chat without the forward header.
    async fn copy_message(&self, destination: &ChatRef, source: MessageRef)
    -> Result<(), TelegramError>;

    /// Lists every dialog of the signed-in account.
    async fn list_dialogs(&self) -> Result<Vec<DialogEntry>, TelegramError>;

    /// Sends a panel, optionally as a reply. Returns the new message id.
    async fn send_panel(
        &self,
        chat_id: i64,
        panel: &Panel,
        reply_to: Option<i32>,
    ) -> Result<i32, TelegramError>;

    /// Replaces the text and keyboard of an existing message.
    async fn edit_panel(&self, message: MessageRef, panel: &Panel) -> Result<(), TelegramError>;

    /// Answers a button press, optionally with a toast or alert.
    async fn answer_callback(
        &self,
        query_id: i64,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), TelegramError>;
}

/// Marked ids of channels start below this value.
const CHANNEL_OFFSET: i64 = -1_000_000_000_000;

/// Converts a raw Telegram peer into its marked (Bot-API style) id.
#[must_use]
pub const fn marked_id(kind: PeerKind, bare_id: i64) -> i64 {
    match kind {
        PeerKind::User => bare_id,
        PeerKind::Chat => -bare_id,
        PeerKind::Channel => CHANNEL_OFFSET - bare_id,
    }
}

/// Namespace of a bare Telegram id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeerKind {
    User,
    Chat,
    Channel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marked_id() {
        assert_eq!(marked_id(PeerKind::User, 42), 42);
        assert_eq!(marked_id(PeerKind::Chat, 123), -123);
        assert_eq!(marked_id(PeerKind::Channel, 1_234_567_890), -1_001_234_567_890);
    }
}
