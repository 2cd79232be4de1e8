//! Persistent storage module.
//!
//! A single JSON document holding the action log and the user-defined
//! broadcast sets.

mod data;
mod types;

pub use data::{DataStore, StoreError, load_document};
pub use types::{BroadcastSet, ChatRef, LogEntry, LogStatus, StoreDocument};
