//! Channel and dialog information.
//!
//! Read-only queries used by the panels: dashboard statistics, metadata
//! for every configured target, and the account's joined groups/channels.

mod service;

pub use crate::telegram::DialogKind;
pub use service::{
    ChannelDetail, DialogInfo, SystemStats, get_all_channel_details, get_system_stats,
    scan_all_dialogs,
};
