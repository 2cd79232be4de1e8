//! Text commands typed in the control chat.

use std::fmt;

/// A prefixed text command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextCommand {
    /// Reset the conversation and show the main panel.
    Start,

    /// Abort the current multi-step operation.
    Cancel,

    /// Show the sender, chat and replied-to user ids.
    Id,

    /// Anything else after the prefix (lowercased).
    Unknown(String),
}

impl TextCommand {
    /// Parses the first word of a message as a command.
    ///
    /// Returns `None` if the message does not start with the prefix.
    #[must_use]
    pub fn parse(text: &str, prefix: &str) -> Option<Self> {
        let first_word = text.split(' ').next()?;
        let command = first_word.strip_prefix(prefix)?.to_lowercase();

        Some(match command.as_str() {
            "start" => Self::Start,
            "cancel" => Self::Cancel,
            "id" => Self::Id,
            _ => Self::Unknown(command),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Start => "start",
            Self::Cancel => "cancel",
            Self::Id => "id",
            Self::Unknown(name) => name,
        }
    }
}

impl fmt::Display for TextCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
