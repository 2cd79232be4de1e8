//! Per-user conversation state.

use std::collections::HashMap;

use crate::info::DialogInfo;
use crate::store::ChatRef;

/// Where the next broadcast goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastTarget {
    /// Every configured target channel.
    All,
    /// The channels of a saved broadcast set.
    Set(i64),
}

/// A broadcast set being edited in the selection panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDraft {
    /// `0` for a set that has not been saved yet.
    pub set_id: i64,
    pub name: String,
    pub selected: Vec<ChatRef>,
    /// The panel message that shows the editor.
    pub panel_message_id: i32,
}

impl SetDraft {
    /// Adds the channel if missing, removes it otherwise.
    pub fn toggle(&mut self, channel: &ChatRef) {
        if let Some(pos) = self.selected.iter().position(|c| c == channel) {
            self.selected.remove(pos);
        } else {
            self.selected.push(channel.clone());
        }
    }
}

/// What the bot expects next from a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UserState {
    #[default]
    Idle,
    AwaitingBroadcastMessage(BroadcastTarget),
    AwaitingSetName { panel_message_id: i32 },
    SelectingGroupsForSet(SetDraft),
}

#[derive(Debug, Default)]
struct UserSession {
    state: UserState,
    scanned_dialogs: Vec<DialogInfo>,
}

/// In-memory state of every user who has interacted with the bot.
///
/// Untracked users are [`UserState::Idle`]. The last dialog scan is kept
/// apart from the state so paging through it works after other actions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<i64, UserSession>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self, user_id: i64) -> &UserState {
        const IDLE: &UserState = &UserState::Idle;
        self.sessions.get(&user_id).map_or(IDLE, |s| &s.state)
    }

    pub fn set_state(&mut self, user_id: i64, state: UserState) {
        self.sessions.entry(user_id).or_default().state = state;
    }

    /// Returns the user to idle. Returns the state that was replaced.
    pub fn reset(&mut self, user_id: i64) -> UserState {
        self.sessions
            .get_mut(&user_id)
            .map(|s| std::mem::take(&mut s.state))
            .unwrap_or_default()
    }

    /// The set draft, if the user is in the selection panel.
    pub fn draft_mut(&mut self, user_id: i64) -> Option<&mut SetDraft> {
        match &mut self.sessions.get_mut(&user_id)?.state {
            UserState::SelectingGroupsForSet(draft) => Some(draft),
            _ => None,
        }
    }

    pub fn store_scan(&mut self, user_id: i64, dialogs: Vec<DialogInfo>) {
        self.sessions.entry(user_id).or_default().scanned_dialogs = dialogs;
    }

    /// The user's last scan, or `None` if there is none or it was empty.
    #[must_use]
    pub fn scan(&self, user_id: i64) -> Option<&[DialogInfo]> {
        self.sessions
            .get(&user_id)
            .map(|s| s.scanned_dialogs.as_slice())
            .filter(|d| !d.is_empty())
    }
}
