//! Sequential message broadcasting.

mod executor;

pub use executor::{BroadcastReport, broadcast_to_targets};
