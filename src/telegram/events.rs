//! Inbound events, decoupled from the client library's update types.

/// The message an inbound message replies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepliedMessage {
    pub message_id: i32,
    pub sender_id: Option<i64>,
    pub text: Option<String>,
    pub has_media: bool,
}

/// A new text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingMessage {
    /// Marked chat id.
    pub chat_id: i64,
    pub message_id: i32,
    pub sender_id: i64,
    pub sender_name: String,
    pub text: String,
    pub reply_to: Option<RepliedMessage>,
}

/// An inline button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCallback {
    pub query_id: i64,
    /// Marked id of the chat holding the pressed panel.
    pub chat_id: i64,
    pub message_id: i32,
    pub sender_id: i64,
    pub sender_name: String,
    pub data: Vec<u8>,
}

/// Events the dispatcher understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotEvent {
    Message(IncomingMessage),
    Callback(IncomingCallback),
}
