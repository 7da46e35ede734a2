//! Error taxonomy for lifecycle and lottery operations.
//!
//! Errors fall into three groups:
//!
//! - **Logical** outcomes (`AlreadyOnList`, `NotWaiting`, `NoCapacitySet`, ...)
//!   are expected and surfaced to the caller for user-facing messaging. They are
//!   never retried.
//! - **`ConcurrentModification`** is what remains after the bounded
//!   optimistic-concurrency retry loop gives up.
//! - **`StoreUnavailable`** and **`CorruptDocument`** report backend trouble.
//!   No partial state change is assumed; callers re-fetch before retrying.

use crate::document::StoreError;
use crate::lifecycle::{EntrantState, LifecycleEvent};
use crate::types::{EntrantId, EntrantList, EventId};
use thiserror::Error;

/// Errors returned by lifecycle commands and the event state store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LotteryError {
    /// The entrant's current state does not accept the requested action.
    #[error("Invalid transition for {entrant}: cannot {event} from {from}")]
    InvalidTransition {
        /// Entrant the action targeted.
        entrant: EntrantId,
        /// State the entrant was in.
        from: EntrantState,
        /// Rejected action.
        event: LifecycleEvent,
    },

    /// The entrant is already on one of the event's lists.
    #[error("Entrant {entrant} is already on {list}")]
    AlreadyOnList {
        /// Entrant trying to join.
        entrant: EntrantId,
        /// List the entrant is on.
        list: EntrantList,
    },

    /// The entrant is not on the waiting list.
    #[error("Entrant {0} is not on the waiting list")]
    NotWaiting(EntrantId),

    /// The event has unlimited capacity, so there is no lottery.
    #[error("No capacity set for event {0}")]
    NoCapacitySet(EventId),

    /// Nobody is waiting to be drawn.
    #[error("No one on the waiting list for event {0}")]
    EmptyWaitingList(EventId),

    /// Every seat is already taken by selected or attending entrants.
    #[error("Event {0} has no remaining capacity")]
    CapacityReached(EventId),

    /// Every selected entrant has already signed up.
    #[error("Nothing to cancel for event {0}: everyone selected has signed up")]
    NothingToCancel(EventId),

    /// The requested list has no entrants to export or message.
    #[error("No entrants on {list} for event {event}")]
    EmptyRoster {
        /// Event queried.
        event: EventId,
        /// Empty list.
        list: EntrantList,
    },

    /// A message to entrants was blank.
    #[error("Message must not be empty")]
    EmptyMessage,

    /// No event document with this id.
    #[error("Event not found: {0}")]
    EventNotFound(EventId),

    /// The optimistic-concurrency loop ran out of attempts.
    #[error("Concurrent modification of event {event} after {attempts} attempts")]
    ConcurrentModification {
        /// Event being written.
        event: EventId,
        /// Attempts made before giving up.
        attempts: usize,
    },

    /// Stored fields could not be decoded into an event record.
    #[error("Corrupt event document {event}: {reason}")]
    CorruptDocument {
        /// Event whose document is corrupt.
        event: EventId,
        /// Decoder message.
        reason: String,
    },

    /// Backend or network failure.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl LotteryError {
    /// Whether the error is an expected business outcome rather than a failure.
    #[must_use]
    pub const fn is_logical(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. }
                | Self::AlreadyOnList { .. }
                | Self::NotWaiting(_)
                | Self::NoCapacitySet(_)
                | Self::EmptyWaitingList(_)
                | Self::CapacityReached(_)
                | Self::NothingToCancel(_)
                | Self::EmptyRoster { .. }
                | Self::EmptyMessage
                | Self::EventNotFound(_)
        )
    }

    /// Whether the optimistic-concurrency loop may retry after this error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }

    /// Translate a store error for `event`.
    ///
    /// Version conflicts map to `ConcurrentModification` with a single
    /// attempt; the retry loop replaces the count when it gives up.
    #[must_use]
    pub fn from_store(event: &EventId, error: StoreError) -> Self {
        match error {
            StoreError::NotFound { .. } => Self::EventNotFound(event.clone()),
            StoreError::VersionConflict { .. } => Self::ConcurrentModification {
                event: event.clone(),
                attempts: 1,
            },
            StoreError::AlreadyExists { collection, id } => {
                Self::StoreUnavailable(format!("unexpected existing document {collection}/{id}"))
            }
            StoreError::Unavailable(reason) => Self::StoreUnavailable(reason),
        }
    }
}

/// Result alias for lottery operations.
pub type Result<T> = std::result::Result<T, LotteryError>;
