//! # Event Lottery Core
//!
//! Entrant lifecycle and lottery engine for capacity-limited events.
//!
//! An event keeps three disjoint lists of entrants: the **waiting list**, the
//! **selected list** (lottery winners awaiting confirmation) and the
//! **attending list** (`signedUpUsers`). Entrants join and leave the waiting
//! list; organizers draw winners up to the event's capacity and cancel winners
//! who never confirmed.
//!
//! ## Core Concepts
//!
//! - **[`EventRecord`]**: snapshot of an event's lists and counters
//! - **[`lifecycle`]**: per-entrant state machine (`None → Waiting → Selected →
//!   Attending`, with `Cancelled` for winners who drop out)
//! - **[`lottery`]**: pure, uniform selection of winners from an injected
//!   [`RandomSource`]
//! - **[`EventCommand`]**: pure `(record, command) → (record', outcome)`
//!   mutation, validated against the lifecycle before anything changes
//! - **[`document`]** and **[`environment`]**: collaborator traits (document
//!   store, profile lookup, notifier, exporter, clock)
//!
//! The runtime crate wraps these in an optimistic-concurrency store; this crate
//! does no I/O.
//!
//! ## Example
//!
//! ```
//! use event_lottery_core::{EventCommand, EventRecord, SeededRandom};
//! use event_lottery_core::types::{Capacity, EntrantId, EventId};
//!
//! let rng = SeededRandom::new(1);
//! let mut event = EventRecord::new(EventId::new("gala"), "Gala", Some(Capacity::new(1)));
//!
//! for name in ["ada", "grace"] {
//!     EventCommand::Join { entrant: EntrantId::new(name) }
//!         .apply(&mut event, &rng)
//!         .unwrap();
//! }
//! EventCommand::RunLottery.apply(&mut event, &rng).unwrap();
//!
//! assert_eq!(event.selected_list.len(), 1);
//! assert_eq!(event.waiting_list.len(), 1);
//! assert_eq!(event.total_selected, 1);
//! ```

pub mod command;
pub mod document;
pub mod environment;
pub mod error;
pub mod event;
pub mod lifecycle;
pub mod lottery;
pub mod types;

pub use command::{CommandOutcome, EventCommand};
pub use document::{Document, DocumentStore, StoreError, Version};
pub use error::{LotteryError, Result};
pub use event::{EntrantSet, EventRecord, EventSummary};
pub use lifecycle::{EntrantState, LifecycleEvent};
pub use lottery::{LotteryDraw, RandomSource, SeededRandom, ThreadRandom};
