//! Broadcast User Bot Library
//!
//! A Telegram userbot that copies operator messages to groups and channels,
//! driven from inline-keyboard panels in a control chat.
//!
//! This crate provides the core functionality for:
//! - Loading configuration from the environment
//! - Persisting logs and broadcast sets in a JSON file
//! - Connecting to Telegram via `MTProto`
//! - Broadcasting messages with flood-wait handling
//! - Rendering panels and handling commands and button presses

pub mod broadcast;
pub mod config;
pub mod handlers;
pub mod info;
pub mod startup;
pub mod store;
pub mod telegram;
pub mod ui;
