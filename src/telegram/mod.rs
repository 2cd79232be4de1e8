//! Telegram client wrapper module.
//!
//! Provides the grammers-backed client, the [`ChatGateway`] capability
//! trait the rest of the crate is written against, and the inbound event
//! types produced from the update stream.

mod client;
mod error;
mod events;
mod gateway;
#[cfg(test)]
pub(crate) mod testing;

pub use client::{AccountInfo, EventStream, TelegramBot};
pub use error::TelegramError;
pub use events::{BotEvent, IncomingCallback, IncomingMessage, RepliedMessage};
pub use gateway::{
    ChatGateway, ChatInfo, DialogEntry, DialogKind, MessageRef, PeerKind, marked_id,
};
pub use grammers_client::client::{LoginToken, PasswordToken};
