//! Integration tests for optimistic concurrency, outages and cancellation
//!
//! The in-memory store can delay reads (so concurrent cycles read the same
//! version), force version conflicts and go offline.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use event_lottery_core::types::{EntrantId, EventId};
use event_lottery_core::{EntrantSet, LotteryError, SeededRandom};
use event_lottery_runtime::{EventStateStore, RetryPolicy};
use event_lottery_testing::InMemoryDocumentStore;
use event_lottery_testing::fixtures::EventFixture;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

fn store(documents: &InMemoryDocumentStore, max_attempts: usize) -> EventStateStore {
    EventStateStore::new(Arc::new(documents.clone()))
        .with_rng(Arc::new(SeededRandom::new(9)))
        .with_retry_policy(
            RetryPolicy::builder()
                .max_attempts(max_attempts)
                .initial_delay(Duration::from_millis(1))
                .max_delay(Duration::from_millis(5))
                .jitter(false)
                .build(),
        )
}

#[tokio::test]
async fn concurrent_joins_for_distinct_entrants_all_land() {
    let documents = InMemoryDocumentStore::new().with_read_latency(Duration::from_millis(10));
    let event = EventFixture::new("gala").capacity(2).build();
    documents.insert_event(&event);
    let store = store(&documents, 5);

    let entrants: Vec<EntrantId> = ["ada", "grace", "linus", "barbara"]
        .into_iter()
        .map(EntrantId::new)
        .collect();
    let results = join_all(entrants.iter().map(|e| store.join(&event.id, e))).await;

    assert!(results.iter().all(Result::is_ok), "{results:?}");
    let persisted = documents.event(&event.id).unwrap();
    let expected: EntrantSet = entrants.into_iter().collect();
    assert_eq!(persisted.waiting_list, expected);
    assert!(documents.conflict_count() > 0, "reads should have raced");
}

#[tokio::test]
async fn concurrent_draws_never_exceed_capacity() {
    let documents = InMemoryDocumentStore::new().with_read_latency(Duration::from_millis(10));
    let event = EventFixture::new("gala")
        .capacity(2)
        .waiting(&["a", "b", "c", "d", "e"])
        .build();
    documents.insert_event(&event);
    let store = store(&documents, 5);

    let (first, second) = tokio::join!(store.run_lottery(&event.id), store.run_lottery(&event.id));

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| r == &Err(LotteryError::CapacityReached(event.id.clone())))
    );

    let persisted = documents.event(&event.id).unwrap();
    assert_eq!(persisted.selected_list.len(), 2);
    assert_eq!(persisted.waiting_list.len(), 3);
    assert_eq!(persisted.total_selected, 2);
}

#[tokio::test]
async fn leaving_during_a_draw_ends_on_exactly_one_side() {
    let documents = InMemoryDocumentStore::new().with_read_latency(Duration::from_millis(10));
    let event = EventFixture::new("gala")
        .capacity(2)
        .waiting(&["a", "b", "c"])
        .build();
    documents.insert_event(&event);
    let store = store(&documents, 5);
    let leaver = EntrantId::new("a");

    let (draw, leave) = tokio::join!(store.run_lottery(&event.id), store.leave(&event.id, &leaver));

    let draw = draw.unwrap();
    let persisted = documents.event(&event.id).unwrap();
    assert!(persisted.check_invariants().is_ok(), "{persisted:?}");
    assert!(!persisted.waiting_list.contains(&leaver));
    match leave {
        // Leave landed first, or the draw passed the entrant over.
        Ok(_) => {
            assert!(!persisted.selected_list.contains(&leaver));
            assert!(!draw.winners().contains(&leaver));
        }
        // The draw landed first and picked the entrant.
        Err(err) => {
            assert_eq!(err, LotteryError::NotWaiting(leaver.clone()));
            assert!(persisted.selected_list.contains(&leaver));
        }
    }
    assert_eq!(persisted.selected_list.len(), 2);
    assert_eq!(persisted.total_selected, 2);
}

#[tokio::test]
async fn conflicts_are_retried_until_the_write_lands() {
    let documents = InMemoryDocumentStore::new();
    let event = EventFixture::new("gala").build();
    documents.insert_event(&event);
    documents.fail_next_updates(2);
    let store = store(&documents, 5);

    let receipt = store.join(&event.id, &EntrantId::new("ada")).await.unwrap();

    assert_eq!(documents.conflict_count(), 2);
    assert_eq!(documents.write_count(), 1);
    assert!(receipt.record.waiting_list.contains(&EntrantId::new("ada")));
}

#[tokio::test]
async fn exhausted_retries_surface_concurrent_modification() {
    let documents = InMemoryDocumentStore::new();
    let event = EventFixture::new("gala").build();
    documents.insert_event(&event);
    documents.fail_next_updates(10);
    let store = store(&documents, 3);

    let err = store.join(&event.id, &EntrantId::new("ada")).await.unwrap_err();

    assert_eq!(
        err,
        LotteryError::ConcurrentModification {
            event: event.id.clone(),
            attempts: 3
        }
    );
    assert_eq!(documents.conflict_count(), 3);
    assert!(documents.event(&event.id).unwrap().waiting_list.is_empty());
}

#[tokio::test]
async fn outage_is_surfaced_without_retrying() {
    let documents = InMemoryDocumentStore::new();
    let event = EventFixture::new("gala").build();
    documents.insert_event(&event);
    documents.set_unavailable(true);
    let store = store(&documents, 5);

    assert!(matches!(
        store.join(&event.id, &EntrantId::new("ada")).await,
        Err(LotteryError::StoreUnavailable(_))
    ));
    assert_eq!(documents.write_count(), 0);
    assert_eq!(documents.conflict_count(), 0);

    documents.set_unavailable(false);
    assert!(store.join(&event.id, &EntrantId::new("ada")).await.is_ok());
}

#[tokio::test]
async fn slow_store_calls_time_out() {
    let documents = InMemoryDocumentStore::new().with_read_latency(Duration::from_millis(200));
    let event = EventFixture::new("gala").build();
    documents.insert_event(&event);
    let store = store(&documents, 5).with_store_timeout(Duration::from_millis(20));

    let err = store.snapshot(&event.id).await.unwrap_err();

    match err {
        LotteryError::StoreUnavailable(reason) => assert!(reason.contains("timed out"), "{reason}"),
        other => panic!("expected StoreUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn dropping_an_operation_abandons_it() {
    let documents = InMemoryDocumentStore::new().with_read_latency(Duration::from_millis(50));
    let event = EventFixture::new("gala").build();
    documents.insert_event(&event);
    let store = store(&documents, 5);

    let abandoned = tokio::time::timeout(
        Duration::from_millis(5),
        store.join(&event.id, &EntrantId::new("ada")),
    )
    .await;

    assert!(abandoned.is_err());
    assert_eq!(documents.write_count(), 0);
    assert!(documents.event(&event.id).unwrap().waiting_list.is_empty());
}

#[tokio::test]
async fn operations_on_different_events_do_not_conflict() {
    let documents = InMemoryDocumentStore::new().with_read_latency(Duration::from_millis(5));
    let ids: Vec<EventId> = (0..4).map(|i| EventId::new(format!("event-{i}"))).collect();
    for id in &ids {
        documents.insert_event(&EventFixture::new(id.as_str()).build());
    }
    let store = store(&documents, 1);
    let ada = EntrantId::new("ada");

    let results = join_all(ids.iter().map(|id| store.join(id, &ada))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(documents.conflict_count(), 0);
}
