//! Inbound event handling.
//!
//! The dispatcher filters events by chat and sender, then routes them to
//! the message or callback handler. Both mutate per-user state held in a
//! [`SessionStore`] owned by the dispatcher.

mod callback;
mod commands;
mod context;
mod dispatcher;
mod message;
mod session;

pub use callback::{CallbackHandler, CallbackOutcome};
pub use commands::TextCommand;
pub use context::BotContext;
pub use dispatcher::Dispatcher;
pub use message::MessageHandler;
pub use session::{BroadcastTarget, SessionStore, SetDraft, UserState};
