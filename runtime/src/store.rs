//! Optimistic-concurrency state store for event records.
//!
//! [`EventStateStore`] turns the pure [`EventCommand::apply`] into persisted,
//! atomic operations:
//!
//! 1. Read the event document and its version
//! 2. Decode it into an [`EventRecord`] and apply the command in memory
//! 3. Write the changed fields conditioned on the version read
//!
//! A version conflict restarts the cycle from step 1 with exponential backoff,
//! up to the configured number of attempts, after which the operation fails
//! with `ConcurrentModification`. Logical rejections and store outages are
//! surfaced immediately. Nothing is cached between operations: every call
//! re-reads the document.
//!
//! Every store call is bounded by a timeout. Dropping a returned future
//! abandons the operation; because the write is a single conditional update,
//! an abandoned operation has either been fully applied or not at all.

use crate::config::LotteryConfig;
use crate::metrics::{CANCELLED_TOTAL, CONFLICT_RETRIES_TOTAL, WINNERS_TOTAL, record_operation};
use crate::retry::{RetryPolicy, retry_with_predicate};
use event_lottery_core::document::{DocumentStore, EVENTS_COLLECTION, StoreFuture};
use event_lottery_core::lottery::number_to_select;
use event_lottery_core::types::{EntrantId, EventId};
use event_lottery_core::{
    CommandOutcome, EntrantState, EventCommand, EventRecord, EventSummary, LotteryError,
    RandomSource, Result, SeededRandom, ThreadRandom, Version,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Result of a successful mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationReceipt {
    /// What the command did.
    pub outcome: CommandOutcome,
    /// The record as written.
    pub record: EventRecord,
    /// Document version after the write.
    pub version: Version,
}

impl MutationReceipt {
    /// Winners of a draw, in draw order; empty for other operations.
    #[must_use]
    pub fn winners(&self) -> &[EntrantId] {
        match &self.outcome {
            CommandOutcome::LotteryDrawn { winners } => winners,
            _ => &[],
        }
    }

    /// Entrants removed by a cancellation; empty for other operations.
    #[must_use]
    pub fn cancelled(&self) -> &[EntrantId] {
        match &self.outcome {
            CommandOutcome::Cancelled { entrants } => entrants,
            _ => &[],
        }
    }
}

/// What a draw would do right now, for the organizer's confirmation prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryPreview {
    /// Number of entrants a draw would select.
    pub winners: usize,
    /// Current size of the waiting list.
    pub waiting: usize,
    /// Seats still open before the draw.
    pub open_seats: usize,
}

/// Persisted, atomic lifecycle and lottery operations.
///
/// # Example
///
/// ```
/// use event_lottery_core::types::{Capacity, EntrantId, EventId};
/// use event_lottery_core::{EventRecord, SeededRandom};
/// use event_lottery_runtime::EventStateStore;
/// use event_lottery_testing::InMemoryDocumentStore;
/// use std::sync::Arc;
///
/// # async fn example() -> event_lottery_core::Result<()> {
/// let store = EventStateStore::new(Arc::new(InMemoryDocumentStore::new()))
///     .with_rng(Arc::new(SeededRandom::new(7)));
///
/// let gala = EventId::new("gala");
/// store
///     .create_event(&EventRecord::new(gala.clone(), "Gala", Some(Capacity::new(1))))
///     .await?;
/// store.join(&gala, &EntrantId::new("ada")).await?;
///
/// let receipt = store.run_lottery(&gala).await?;
/// assert_eq!(receipt.winners(), [EntrantId::new("ada")]);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EventStateStore {
    documents: Arc<dyn DocumentStore>,
    rng: Arc<dyn RandomSource>,
    retry: RetryPolicy,
    store_timeout: Duration,
}

impl std::fmt::Debug for EventStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStateStore")
            .field("retry", &self.retry)
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}

impl EventStateStore {
    /// Create a store with default retry policy, timeout and thread-local
    /// randomness.
    #[must_use]
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self::from_config(documents, &LotteryConfig::default())
    }

    /// Create a store from configuration. A configured seed makes draws
    /// reproducible.
    #[must_use]
    pub fn from_config(documents: Arc<dyn DocumentStore>, config: &LotteryConfig) -> Self {
        let rng: Arc<dyn RandomSource> = match config.rng_seed {
            Some(seed) => Arc::new(SeededRandom::new(seed)),
            None => Arc::new(ThreadRandom),
        };
        Self {
            documents,
            rng,
            retry: config.retry_policy(),
            store_timeout: config.store_timeout(),
        }
    }

    /// Replace the random source.
    #[must_use]
    pub fn with_rng(mut self, rng: Arc<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    /// Replace the conflict retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the per-call store timeout.
    #[must_use]
    pub const fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Persist a new event record.
    ///
    /// # Errors
    ///
    /// - `StoreUnavailable`: the id is taken, or the store failed
    /// - `CorruptDocument`: the record could not be encoded
    #[tracing::instrument(skip_all, fields(event_id = %record.id), name = "create_event")]
    pub async fn create_event(&self, record: &EventRecord) -> Result<Version> {
        let fields = record.to_fields().map_err(|e| LotteryError::CorruptDocument {
            event: record.id.clone(),
            reason: e.to_string(),
        })?;
        let version = self
            .bounded(
                &record.id,
                self.documents
                    .create(EVENTS_COLLECTION, record.id.as_str(), fields),
            )
            .await?;
        tracing::info!(capacity = ?record.capacity, "Event created");
        Ok(version)
    }

    /// Delete an event document. Deleting a missing event succeeds.
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` when the store fails.
    #[tracing::instrument(skip_all, fields(event_id = %event_id), name = "delete_event")]
    pub async fn delete_event(&self, event_id: &EventId) -> Result<()> {
        self.bounded(
            event_id,
            self.documents.delete(EVENTS_COLLECTION, event_id.as_str()),
        )
        .await
    }

    /// Read the current record.
    ///
    /// # Errors
    ///
    /// - `EventNotFound`: no such event
    /// - `CorruptDocument`: the stored fields do not decode
    /// - `StoreUnavailable`: backend failure or timeout
    pub async fn snapshot(&self, event_id: &EventId) -> Result<EventRecord> {
        self.load(event_id).await.map(|(record, _)| record)
    }

    /// Lifecycle state of one entrant.
    ///
    /// # Errors
    ///
    /// Same as [`Self::snapshot`].
    pub async fn entrant_state(
        &self,
        event_id: &EventId,
        entrant: &EntrantId,
    ) -> Result<EntrantState> {
        Ok(self.snapshot(event_id).await?.state_of(entrant))
    }

    /// Dashboard counts.
    ///
    /// # Errors
    ///
    /// Same as [`Self::snapshot`].
    pub async fn summary(&self, event_id: &EventId) -> Result<EventSummary> {
        Ok(self.snapshot(event_id).await?.summary())
    }

    /// How many winners a draw would pick, without drawing.
    ///
    /// # Errors
    ///
    /// - `NoCapacitySet`, `EmptyWaitingList`, `CapacityReached`: as for
    ///   [`Self::run_lottery`]
    /// - anything [`Self::snapshot`] returns
    pub async fn lottery_preview(&self, event_id: &EventId) -> Result<LotteryPreview> {
        let record = self.snapshot(event_id).await?;
        let open_seats = record
            .remaining_capacity()
            .ok_or_else(|| LotteryError::NoCapacitySet(event_id.clone()))?;
        if record.waiting_list.is_empty() {
            return Err(LotteryError::EmptyWaitingList(event_id.clone()));
        }
        if open_seats == 0 {
            return Err(LotteryError::CapacityReached(event_id.clone()));
        }

        let pool = record.waiting_list.difference(&record.selected_list).count();
        Ok(LotteryPreview {
            winners: number_to_select(pool, open_seats),
            waiting: record.waiting_list.len(),
            open_seats,
        })
    }

    /// Add `entrant` to the waiting list.
    ///
    /// # Errors
    ///
    /// - `AlreadyOnList`: the entrant is on any list
    /// - see [`Self::execute`]
    pub async fn join(&self, event_id: &EventId, entrant: &EntrantId) -> Result<MutationReceipt> {
        self.execute(
            event_id,
            EventCommand::Join {
                entrant: entrant.clone(),
            },
        )
        .await
    }

    /// Remove `entrant` from the waiting list.
    ///
    /// # Errors
    ///
    /// - `NotWaiting`: the entrant is not on the waiting list
    /// - see [`Self::execute`]
    pub async fn leave(&self, event_id: &EventId, entrant: &EntrantId) -> Result<MutationReceipt> {
        self.execute(
            event_id,
            EventCommand::Leave {
                entrant: entrant.clone(),
            },
        )
        .await
    }

    /// Draw winners from the waiting list into the selected list.
    ///
    /// Both lists and `totalSelected` are written in one conditional update.
    ///
    /// # Errors
    ///
    /// - `NoCapacitySet`: the event is unlimited
    /// - `EmptyWaitingList`: nobody is waiting
    /// - `CapacityReached`: no seats are open
    /// - see [`Self::execute`]
    pub async fn run_lottery(&self, event_id: &EventId) -> Result<MutationReceipt> {
        self.execute(event_id, EventCommand::RunLottery).await
    }

    /// Remove selected entrants who have not signed up.
    ///
    /// # Errors
    ///
    /// - `NothingToCancel`: every selected entrant has signed up
    /// - see [`Self::execute`]
    pub async fn cancel_non_responsive(&self, event_id: &EventId) -> Result<MutationReceipt> {
        self.execute(event_id, EventCommand::CancelNonResponsive).await
    }

    /// Move a selected entrant to the attending list.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition`: the entrant is not selected
    /// - see [`Self::execute`]
    pub async fn confirm_attendance(
        &self,
        event_id: &EventId,
        entrant: &EntrantId,
    ) -> Result<MutationReceipt> {
        self.execute(
            event_id,
            EventCommand::ConfirmAttendance {
                entrant: entrant.clone(),
            },
        )
        .await
    }

    /// Remove a selected entrant who declined, counting the cancellation.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition`: the entrant is not selected
    /// - see [`Self::execute`]
    pub async fn decline_invitation(
        &self,
        event_id: &EventId,
        entrant: &EntrantId,
    ) -> Result<MutationReceipt> {
        self.execute(
            event_id,
            EventCommand::DeclineInvitation {
                entrant: entrant.clone(),
            },
        )
        .await
    }

    /// Run one command through the optimistic-concurrency cycle.
    ///
    /// # Errors
    ///
    /// - any logical error from [`EventCommand::apply`]
    /// - `EventNotFound`: no such event
    /// - `ConcurrentModification`: every attempt lost a version race
    /// - `CorruptDocument`: the stored fields do not decode
    /// - `StoreUnavailable`: backend failure or timeout
    #[tracing::instrument(
        skip_all,
        fields(event_id = %event_id, operation = command.name()),
        name = "event_command"
    )]
    pub async fn execute(
        &self,
        event_id: &EventId,
        command: EventCommand,
    ) -> Result<MutationReceipt> {
        let operation = command.name();
        let command = &command;

        let result = retry_with_predicate(
            &self.retry,
            move |attempt| self.attempt(event_id, command, attempt),
            LotteryError::is_retryable,
        )
        .await;

        record_operation(operation, &result);
        match &result {
            Ok(receipt) => {
                record_effects(&receipt.outcome);
                tracing::info!(
                    version = %receipt.version,
                    outcome = ?receipt.outcome,
                    "Command applied"
                );
            }
            Err(err) if err.is_logical() => {
                tracing::debug!(error = %err, "Command rejected");
            }
            Err(err) => {
                tracing::error!(error = %err, "Command failed");
            }
        }
        result
    }

    /// One read-modify-write cycle.
    async fn attempt(
        &self,
        event_id: &EventId,
        command: &EventCommand,
        attempt: usize,
    ) -> Result<MutationReceipt> {
        if attempt > 1 {
            metrics::counter!(CONFLICT_RETRIES_TOTAL, "operation" => command.name()).increment(1);
        }

        let (mut record, expected) = self.load(event_id).await?;
        let outcome = command.clone().apply(&mut record, self.rng.as_ref())?;
        let mutations = outcome.mutations(&record);

        let version = self
            .bounded(
                event_id,
                self.documents.conditional_update(
                    EVENTS_COLLECTION,
                    event_id.as_str(),
                    mutations,
                    expected,
                ),
            )
            .await
            .map_err(|err| match err {
                LotteryError::ConcurrentModification { event, .. } => {
                    LotteryError::ConcurrentModification {
                        event,
                        attempts: attempt,
                    }
                }
                other => other,
            })?;

        Ok(MutationReceipt {
            outcome,
            record,
            version,
        })
    }

    async fn load(&self, event_id: &EventId) -> Result<(EventRecord, Version)> {
        let document = self
            .bounded(
                event_id,
                self.documents.get(EVENTS_COLLECTION, event_id.as_str()),
            )
            .await?;

        let record = EventRecord::from_fields(event_id.clone(), document.fields).map_err(|e| {
            LotteryError::CorruptDocument {
                event: event_id.clone(),
                reason: e.to_string(),
            }
        })?;

        if let Err(violation) = record.check_invariants() {
            tracing::warn!(
                event_id = %event_id,
                %violation,
                "Stored event violates list invariants"
            );
        }

        Ok((record, document.version))
    }

    /// Await a store call within the configured timeout.
    async fn bounded<T>(&self, event_id: &EventId, call: StoreFuture<'_, T>) -> Result<T> {
        match tokio::time::timeout(self.store_timeout, call).await {
            Ok(result) => result.map_err(|e| LotteryError::from_store(event_id, e)),
            Err(_) => Err(LotteryError::StoreUnavailable(format!(
                "store call for event {event_id} timed out after {}ms",
                self.store_timeout.as_millis()
            ))),
        }
    }
}

fn record_effects(outcome: &CommandOutcome) {
    match outcome {
        CommandOutcome::LotteryDrawn { winners } => {
            metrics::counter!(WINNERS_TOTAL).increment(winners.len() as u64);
        }
        CommandOutcome::Cancelled { entrants } => {
            metrics::counter!(CANCELLED_TOTAL).increment(entrants.len() as u64);
        }
        CommandOutcome::Declined(_) => {
            metrics::counter!(CANCELLED_TOTAL).increment(1);
        }
        _ => {}
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use event_lottery_core::types::Capacity;
    use event_lottery_testing::InMemoryDocumentStore;
    use event_lottery_testing::fixtures::EventFixture;

    fn store_with(documents: &InMemoryDocumentStore) -> EventStateStore {
        EventStateStore::new(Arc::new(documents.clone()))
            .with_rng(Arc::new(SeededRandom::new(3)))
            .with_retry_policy(
                RetryPolicy::builder()
                    .initial_delay(Duration::from_millis(1))
                    .jitter(false)
                    .build(),
            )
    }

    #[tokio::test]
    async fn preview_counts_open_seats_and_pool() {
        let documents = InMemoryDocumentStore::new();
        documents.insert_event(
            &EventFixture::new("gala")
                .capacity(3)
                .waiting(&["a", "b", "c", "d"])
                .attending(&["z"])
                .build(),
        );
        let store = store_with(&documents);

        let preview = store.lottery_preview(&EventId::new("gala")).await.unwrap();

        assert_eq!(
            preview,
            LotteryPreview {
                winners: 2,
                waiting: 4,
                open_seats: 2
            }
        );
    }

    #[tokio::test]
    async fn preview_fails_like_a_draw() {
        let documents = InMemoryDocumentStore::new();
        documents.insert_event(&EventFixture::new("open").waiting(&["a"]).build());
        documents.insert_event(&EventFixture::new("empty").capacity(2).build());
        let store = store_with(&documents);

        assert_eq!(
            store.lottery_preview(&EventId::new("open")).await,
            Err(LotteryError::NoCapacitySet(EventId::new("open")))
        );
        assert_eq!(
            store.lottery_preview(&EventId::new("empty")).await,
            Err(LotteryError::EmptyWaitingList(EventId::new("empty")))
        );
    }

    #[tokio::test]
    async fn create_event_rejects_duplicates() {
        let documents = InMemoryDocumentStore::new();
        let store = store_with(&documents);
        let record = EventRecord::new(EventId::new("gala"), "Gala", Some(Capacity::new(2)));

        assert_eq!(store.create_event(&record).await, Ok(Version::INITIAL));
        assert!(matches!(
            store.create_event(&record).await,
            Err(LotteryError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn receipt_accessors_are_empty_for_other_outcomes() {
        let documents = InMemoryDocumentStore::new();
        documents.insert_event(&EventFixture::new("gala").build());
        let store = store_with(&documents);

        let receipt = store
            .join(&EventId::new("gala"), &EntrantId::new("ada"))
            .await
            .unwrap();

        assert!(receipt.winners().is_empty());
        assert!(receipt.cancelled().is_empty());
        assert_eq!(receipt.version, Version::new(2));
    }
}
