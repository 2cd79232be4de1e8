//! Persisted record types.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Outcome recorded with every log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogStatus {
    Success,
    Failure,
    Info,
    PartialSuccess,
}

impl LogStatus {
    /// Picks the status describing a broadcast result.
    #[must_use]
    pub const fn for_counts(success: usize, failed: usize) -> Self {
        if failed == 0 {
            Self::Success
        } else if success > 0 {
            Self::PartialSuccess
        } else {
            Self::Failure
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Info => "INFO",
            Self::PartialSuccess => "PARTIAL_SUCCESS",
        }
    }
}

impl fmt::Display for LogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single append-only log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Local wall-clock time the entry was recorded.
    #[serde(with = "iso_micros")]
    pub time: NaiveDateTime,
    pub action: String,
    pub status: LogStatus,
    pub message: String,
    pub user: String,
}

/// Timestamps as `2024-05-01T12:00:00.123456`, always with microseconds.
/// Reading also accepts other fraction lengths or none at all.
mod iso_micros {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    const WRITE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";
    const READ_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

    pub fn serialize<S>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format(WRITE_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, READ_FORMAT).map_err(de::Error::custom)
    }
}

/// A chat identifier as written in configuration and broadcast sets.
///
/// Numeric ids are Bot-API style marked ids (`-100…` for channels).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChatRef {
    Id(i64),
    Username(String),
}

impl ChatRef {
    /// Parses a configured identifier: integers become ids, anything else
    /// a username with the leading `@` removed.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        raw.parse::<i64>().map_or_else(
            |_| Self::Username(raw.trim_start_matches('@').to_owned()),
            Self::Id,
        )
    }
}

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(name) => write!(f, "@{name}"),
        }
    }
}

/// A named list of broadcast destinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastSet {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub channels: Vec<ChatRef>,
}

/// The whole on-disk document.
///
/// `schedules` and `drafts` carry no behaviour; their entries are kept
/// verbatim so a rewrite never drops them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    #[serde(default)]
    pub schedules: Vec<serde_json::Value>,
    #[serde(default)]
    pub drafts: Vec<serde_json::Value>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub broadcast_sets: Vec<BroadcastSet>,
}

impl StoreDocument {
    /// Next free broadcast set id: one past the largest, or 1.
    #[must_use]
    pub fn next_set_id(&self) -> i64 {
        self.broadcast_sets.iter().map(|s| s.id).max().unwrap_or(0) + 1
    }
}
