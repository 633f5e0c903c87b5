//! Metric lifecycle for downstream channels.
//!
//! Channels come and go as the modem rebonds, so the exported gauges are
//! registered and unregistered to follow the channel set between polls.

pub mod diff;
pub mod lifecycle;

// Re-export commonly used items
pub use diff::ChannelDiff;
pub use lifecycle::{ChannelMetrics, SyncOutcome};
