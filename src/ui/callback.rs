//! Typed inline-button payloads.
//!
//! Payloads use the `action:subaction:id...` wire form. Panels only ever
//! build buttons from a [`CallbackAction`], and the dispatcher decodes raw
//! bytes back through [`CallbackAction::parse`], so both sides share one
//! definition of the format.

use std::fmt;

use thiserror::Error;

use crate::store::ChatRef;

/// Errors produced when decoding a callback payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackParseError {
    #[error("Callback payload is not valid UTF-8")]
    NotUtf8,

    #[error("Unknown callback payload: {0}")]
    Unknown(String),

    #[error("Invalid number {value:?} in callback payload {payload}")]
    InvalidNumber { payload: String, value: String },
}

/// Panel reachable through a "back" button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackTarget {
    Main,
    Groups,
    ManageSets,
}

/// Entries of the main menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainMenu {
    Broadcast,
    Groups,
    Schedule,
    Drafts,
    Logs,
}

/// Entries of the group management menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupsMenu {
    ManageSets,
    TestAll,
    ScanAll,
}

/// Every action an inline button can trigger.
///
/// `set_id == 0` denotes a set that has not been saved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    Back(BackTarget),
    Main(MainMenu),
    BroadcastAll,
    BroadcastSet(i64),
    Groups(GroupsMenu),
    ScanPage(usize),
    SetAdd,
    SetView(i64),
    SetToggle { set_id: i64, channel: ChatRef },
    SetSelectAll(i64),
    SetSelectNone(i64),
    SetSave(i64),
    SetDeleteConfirm(i64),
    SetDeleteExecute(i64),
}

impl CallbackAction {
    /// Decodes raw callback bytes.
    ///
    /// # Errors
    ///
    /// Returns an error for non-UTF-8 data, unknown actions, or malformed ids.
    pub fn parse_bytes(data: &[u8]) -> Result<Self, CallbackParseError> {
        let text = std::str::from_utf8(data).map_err(|_| CallbackParseError::NotUtf8)?;
        Self::parse(text)
    }

    /// Decodes a callback payload string.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown actions or malformed ids.
    pub fn parse(payload: &str) -> Result<Self, CallbackParseError> {
        let parts: Vec<&str> = payload.split(':').collect();
        let unknown = || CallbackParseError::Unknown(payload.to_owned());
        let number = |raw: &str| {
            raw.parse::<i64>()
                .map_err(|_| CallbackParseError::InvalidNumber {
                    payload: payload.to_owned(),
                    value: raw.to_owned(),
                })
        };

        let action = match parts.as_slice() {
            ["back", "main"] => Self::Back(BackTarget::Main),
            ["back", "groups"] => Self::Back(BackTarget::Groups),
            ["back", "manage_sets"] => Self::Back(BackTarget::ManageSets),

            ["main", "broadcast"] => Self::Main(MainMenu::Broadcast),
            ["main", "groups"] => Self::Main(MainMenu::Groups),
            ["main", "schedule"] => Self::Main(MainMenu::Schedule),
            ["main", "drafts"] => Self::Main(MainMenu::Drafts),
            ["main", "logs_all"] => Self::Main(MainMenu::Logs),

            ["broadcast", "target", "all"] => Self::BroadcastAll,
            ["broadcast", "target_set", id] => Self::BroadcastSet(number(*id)?),

            ["groups", "manage_sets"] => Self::Groups(GroupsMenu::ManageSets),
            ["groups", "test_all"] => Self::Groups(GroupsMenu::TestAll),
            ["groups", "scan_all"] => Self::Groups(GroupsMenu::ScanAll),

            ["scan", "page", page] => {
                let page = page.parse().map_err(|_| CallbackParseError::InvalidNumber {
                    payload: payload.to_owned(),
                    value: (*page).to_owned(),
                })?;
                Self::ScanPage(page)
            }

            ["set", "add", ..] => Self::SetAdd,
            ["set", "view", id] => Self::SetView(number(*id)?),
            ["set", "edit_toggle", id, channel] if !channel.is_empty() => Self::SetToggle {
                set_id: number(*id)?,
                channel: ChatRef::parse(channel),
            },
            ["set", "edit_all", id] => Self::SetSelectAll(number(*id)?),
            ["set", "edit_none", id] => Self::SetSelectNone(number(*id)?),
            ["set", "save", id] => Self::SetSave(number(*id)?),
            ["set", "delete_confirm", id] => Self::SetDeleteConfirm(number(*id)?),
            ["set", "delete_execute", id] => Self::SetDeleteExecute(number(*id)?),

            _ => return Err(unknown()),
        };

        Ok(action)
    }

    /// Encodes the action into its wire payload.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Back(BackTarget::Main) => f.write_str("back:main"),
            Self::Back(BackTarget::Groups) => f.write_str("back:groups"),
            Self::Back(BackTarget::ManageSets) => f.write_str("back:manage_sets"),
            Self::Main(MainMenu::Broadcast) => f.write_str("main:broadcast"),
            Self::Main(MainMenu::Groups) => f.write_str("main:groups"),
            Self::Main(MainMenu::Schedule) => f.write_str("main:schedule"),
            Self::Main(MainMenu::Drafts) => f.write_str("main:drafts"),
            Self::Main(MainMenu::Logs) => f.write_str("main:logs_all"),
            Self::BroadcastAll => f.write_str("broadcast:target:all"),
            Self::BroadcastSet(id) => write!(f, "broadcast:target_set:{id}"),
            Self::Groups(GroupsMenu::ManageSets) => f.write_str("groups:manage_sets"),
            Self::Groups(GroupsMenu::TestAll) => f.write_str("groups:test_all"),
            Self::Groups(GroupsMenu::ScanAll) => f.write_str("groups:scan_all"),
            Self::ScanPage(page) => write!(f, "scan:page:{page}"),
            Self::SetAdd => f.write_str("set:add:0"),
            Self::SetView(id) => write!(f, "set:view:{id}"),
            Self::SetToggle { set_id, channel } => write!(f, "set:edit_toggle:{set_id}:{channel}"),
            Self::SetSelectAll(id) => write!(f, "set:edit_all:{id}"),
            Self::SetSelectNone(id) => write!(f, "set:edit_none:{id}"),
            Self::SetSave(id) => write!(f, "set:save:{id}"),
            Self::SetDeleteConfirm(id) => write!(f, "set:delete_confirm:{id}"),
            Self::SetDeleteExecute(id) => write!(f, "set:delete_execute:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_legacy_payloads() {
        assert_eq!(
            CallbackAction::parse("broadcast:target_set:3"),
            Ok(CallbackAction::BroadcastSet(3))
        );
        assert_eq!(
            CallbackAction::parse("set:edit_toggle:0:-1001234567890"),
            Ok(CallbackAction::SetToggle {
                set_id: 0,
                channel: ChatRef::Id(-1_001_234_567_890),
            })
        );
        assert_eq!(CallbackAction::parse("set:add:0"), Ok(CallbackAction::SetAdd));
        assert_eq!(CallbackAction::parse("scan:page:2"), Ok(CallbackAction::ScanPage(2)));
    }

    #[test]
    fn test_toggle_with_username_channel() {
        let action = CallbackAction::SetToggle {
            set_id: 5,
            channel: ChatRef::Username("rg_news".to_owned()),
        };
        assert_eq!(action.encode(), "set:edit_toggle:5:@rg_news");
        assert_eq!(CallbackAction::parse(&action.encode()), Ok(action));
    }

    #[test]
    fn test_unknown_payloads_rejected() {
        assert!(matches!(
            CallbackAction::parse("main"),
            Err(CallbackParseError::Unknown(_))
        ));
        assert!(matches!(
            CallbackAction::parse("foo:bar"),
            Err(CallbackParseError::Unknown(_))
        ));
        assert!(matches!(
            CallbackAction::parse("set:view"),
            Err(CallbackParseError::Unknown(_))
        ));
    }

    #[test]
    fn test_malformed_ids_rejected() {
        assert!(matches!(
            CallbackAction::parse("set:view:abc"),
            Err(CallbackParseError::InvalidNumber { .. })
        ));
        assert!(matches!(
            CallbackAction::parse("scan:page:-1"),
            Err(CallbackParseError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_parse_bytes_rejects_invalid_utf8() {
        assert_eq!(
            CallbackAction::parse_bytes(&[0xff, 0xfe]),
            Err(CallbackParseError::NotUtf8)
        );
        assert_eq!(
            CallbackAction::parse_bytes(b"back:main"),
            Ok(CallbackAction::Back(BackTarget::Main))
        );
    }
}
