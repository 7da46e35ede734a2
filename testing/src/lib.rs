//! # Event Lottery Testing
//!
//! Testing utilities for the event lottery crates.
//!
//! This crate provides:
//! - [`InMemoryDocumentStore`]: versioned document store with fault injection
//! - [`InMemoryProfileDirectory`], [`RecordingNotifier`], [`RecordingExporter`]:
//!   in-memory collaborators
//! - [`mocks`]: fixed clock and scripted randomness
//! - [`fixtures`]: event builders for common scenarios
//!
//! ## Example
//!
//! ```
//! use event_lottery_testing::fixtures::EventFixture;
//! use event_lottery_testing::InMemoryDocumentStore;
//!
//! let store = InMemoryDocumentStore::new();
//! let event = EventFixture::new("gala").capacity(2).waiting(&["a", "b", "c"]).build();
//! store.insert_event(&event);
//!
//! assert_eq!(store.event(&event.id).map(|e| e.waiting_list.len()), Some(3));
//! ```

pub mod collaborators;
pub mod document_store;

pub use collaborators::{
    InMemoryProfileDirectory, RecordingExporter, RecordingNotifier, SentMessage,
};
pub use document_store::InMemoryDocumentStore;

/// Deterministic clock and random sources.
pub mod mocks {
    use chrono::{DateTime, Utc};
    use event_lottery_core::environment::Clock;
    use event_lottery_core::lottery::RandomSource;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use event_lottery_testing::mocks::FixedClock;
    /// use event_lottery_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Random source that replays a script of offsets.
    ///
    /// Each draw pops the next value and reduces it modulo the requested
    /// bound; an exhausted script yields zero, which keeps the pool order.
    #[derive(Debug, Default)]
    pub struct ScriptedRandom {
        script: Mutex<VecDeque<usize>>,
    }

    impl ScriptedRandom {
        /// Create a source replaying `values`.
        #[must_use]
        pub fn new(values: impl IntoIterator<Item = usize>) -> Self {
            Self {
                script: Mutex::new(values.into_iter().collect()),
            }
        }
    }

    impl RandomSource for ScriptedRandom {
        fn index_below(&self, upper: usize) -> usize {
            let next = self
                .script
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .pop_front()
                .unwrap_or(0);
            next % upper
        }
    }
}

/// Builders for event records in common test scenarios.
pub mod fixtures {
    use event_lottery_core::types::{Capacity, EntrantId, EventId};
    use event_lottery_core::{EntrantSet, EventRecord};

    /// Fluent builder for [`EventRecord`].
    #[derive(Debug, Clone)]
    pub struct EventFixture {
        record: EventRecord,
    }

    fn set(ids: &[&str]) -> EntrantSet {
        ids.iter().map(|id| EntrantId::new(*id)).collect()
    }

    impl EventFixture {
        /// Start an unlimited event named after its id.
        #[must_use]
        pub fn new(id: &str) -> Self {
            Self {
                record: EventRecord::new(EventId::new(id), id, None),
            }
        }

        /// Set the display name.
        #[must_use]
        pub fn name(mut self, name: &str) -> Self {
            self.record.name = name.to_string();
            self
        }

        /// Set the capacity.
        #[must_use]
        pub fn capacity(mut self, capacity: u32) -> Self {
            self.record.capacity = Some(Capacity::new(capacity));
            self
        }

        /// Set the waiting list.
        #[must_use]
        pub fn waiting(mut self, ids: &[&str]) -> Self {
            self.record.waiting_list = set(ids);
            self
        }

        /// Set the selected list.
        #[must_use]
        pub fn selected(mut self, ids: &[&str]) -> Self {
            self.record.selected_list = set(ids);
            self
        }

        /// Set the attending list.
        #[must_use]
        pub fn attending(mut self, ids: &[&str]) -> Self {
            self.record.signed_up_users = set(ids);
            self
        }

        /// Set the cancellation counter.
        #[must_use]
        pub const fn total_cancelled(mut self, total: u64) -> Self {
            self.record.total_cancelled = total;
            self
        }

        /// Finish building.
        #[must_use]
        pub fn build(self) -> EventRecord {
            self.record
        }
    }
}
