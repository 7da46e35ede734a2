//! # Event Lottery Runtime
//!
//! Persisted operations over event records:
//!
//! - [`EventStateStore`]: join, leave, draw, cancel, confirm and decline as
//!   atomic read-modify-write cycles with bounded conflict retries
//! - [`RosterService`]: resolve, export and message an event's lists
//! - [`LotteryConfig`]: environment-driven configuration
//! - [`metrics`]: counter names and descriptions
//!
//! All collaborators (document store, random source, profile lookup, exporter,
//! notifier, clock) are injected; nothing here is global.

pub mod config;
pub mod metrics;
pub mod retry;
pub mod roster;
pub mod store;

pub use config::{ConfigError, LotteryConfig};
pub use metrics::register_lottery_metrics;
pub use retry::RetryPolicy;
pub use roster::{DocumentProfiles, RosterService};
pub use store::{EventStateStore, LotteryPreview, MutationReceipt};
