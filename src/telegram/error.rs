//! Errors surfaced by Telegram operations.

use grammers_client::InvocationError;
use grammers_client::client::PasswordToken;
use thiserror::Error;

/// RPC error names meaning the destination cannot be written to.
const UNAVAILABLE_PEER_ERRORS: &[&str] = &[
    "USER_IS_BLOCKED",
    "PEER_ID_INVALID",
    "CHANNEL_PRIVATE",
    "CHANNEL_INVALID",
    "CHAT_WRITE_FORBIDDEN",
    "CHAT_ADMIN_REQUIRED",
    "USER_BANNED_IN_CHANNEL",
    "USERNAME_NOT_OCCUPIED",
    "USERNAME_INVALID",
];

/// Errors that can occur during Telegram operations.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Not authorized. Please sign in first.")]
    NotAuthorized,

    #[error("Sign in failed: {0}")]
    SignInFailed(String),

    #[error("Password required for 2FA")]
    PasswordRequired(PasswordToken),

    #[error("Invalid password")]
    InvalidPassword(PasswordToken),

    #[error("Flood wait required: {0} seconds")]
    FloodWait(u32),

    #[error("Chat is blocked or not reachable: {0}")]
    PeerUnavailable(String),

    #[error("Message content was not modified")]
    MessageNotModified,

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("API invocation error: {0}")]
    Invocation(String),
}

impl TelegramError {
    /// Short name used in user-facing alerts.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotAuthorized => "NotAuthorized",
            Self::SignInFailed(_) => "SignInFailed",
            Self::PasswordRequired(_) => "PasswordRequired",
            Self::InvalidPassword(_) => "InvalidPassword",
            Self::FloodWait(_) => "FloodWait",
            Self::PeerUnavailable(_) => "PeerUnavailable",
            Self::MessageNotModified => "MessageNotModified",
            Self::Connection(_) => "Connection",
            Self::Session(_) => "Session",
            Self::Invocation(_) => "Invocation",
        }
    }
}

impl From<InvocationError> for TelegramError {
    fn from(err: InvocationError) -> Self {
        if let InvocationError::Rpc(rpc) = &err {
            if rpc.name == "FLOOD_WAIT" || rpc.name == "SLOWMODE_WAIT" {
                return Self::FloodWait(rpc.value.unwrap_or_default());
            }
            if rpc.name == "MESSAGE_NOT_MODIFIED" {
                return Self::MessageNotModified;
            }
            if UNAVAILABLE_PEER_ERRORS.contains(&rpc.name.as_str()) {
                return Self::PeerUnavailable(rpc.name.clone());
            }
        }

        classify_error_text(&err.to_string())
    }
}

/// Classifies an error from its rendered text.
fn classify_error_text(err_str: &str) -> TelegramError {
    if let Some(seconds) = extract_flood_wait_seconds(err_str) {
        return TelegramError::FloodWait(seconds);
    }
    if err_str.contains("MESSAGE_NOT_MODIFIED") {
        return TelegramError::MessageNotModified;
    }
    if let Some(name) = UNAVAILABLE_PEER_ERRORS.iter().find(|name| err_str.contains(**name)) {
        return TelegramError::PeerUnavailable((*name).to_owned());
    }
    TelegramError::Invocation(err_str.to_owned())
}

/// Extracts flood wait seconds from an error message.
fn extract_flood_wait_seconds(err_msg: &str) -> Option<u32> {
    let patterns = ["FLOOD_WAIT_", "flood wait "];
    // ASCII lowercasing keeps byte offsets valid for slicing `err_msg`.
    let lowered = err_msg.to_ascii_lowercase();

    for pattern in patterns {
        if let Some(idx) = lowered.find(&pattern.to_ascii_lowercase()) {
            let start = idx + pattern.len();
            let num_str: String = err_msg[start..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if let Ok(seconds) = num_str.parse() {
                return Some(seconds);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_flood_wait() {
        assert_eq!(extract_flood_wait_seconds("FLOOD_WAIT_120"), Some(120));
        assert_eq!(extract_flood_wait_seconds("flood wait 60 seconds"), Some(60));
        assert_eq!(extract_flood_wait_seconds("some other error"), None);
    }

    #[test]
    fn test_extract_flood_wait_with_non_ascii_text() {
        assert_eq!(extract_flood_wait_seconds("İ flood wait 7 s"), Some(7));
        assert_eq!(extract_flood_wait_seconds("İ Flood Wait é"), None);
        assert_eq!(extract_flood_wait_seconds("ошибка FLOOD_WAIT_12"), Some(12));
    }

    #[test]
    fn test_classify_error_text() {
        assert!(matches!(
            classify_error_text("rpc error 420: FLOOD_WAIT_35"),
            TelegramError::FloodWait(35)
        ));
        assert!(matches!(
            classify_error_text("rpc error 400: PEER_ID_INVALID"),
            TelegramError::PeerUnavailable(name) if name == "PEER_ID_INVALID"
        ));
        assert!(matches!(
            classify_error_text("rpc error 400: MESSAGE_NOT_MODIFIED"),
            TelegramError::MessageNotModified
        ));
        assert!(matches!(
            classify_error_text("connection reset"),
            TelegramError::Invocation(_)
        ));
    }
}
