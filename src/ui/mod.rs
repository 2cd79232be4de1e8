//! Operator-facing presentation.
//!
//! Panels are rendered from plain state snapshots and carry typed button
//! actions that the callback handler decodes.

mod callback;
pub mod panels;

pub use callback::{BackTarget, CallbackAction, CallbackParseError, GroupsMenu, MainMenu};
pub use panels::{Button, Panel};
