//! Metric names and descriptions for the event state store.
//!
//! Counters are emitted through the `metrics` facade; without an installed
//! recorder they are no-ops. Call [`register_lottery_metrics`] once after
//! installing a recorder so exporters can show descriptions.

use event_lottery_core::LotteryError;
use metrics::{Unit, describe_counter};

/// Operations by name and outcome (`ok`, `rejected`, `conflict`, `error`).
pub const OPERATIONS_TOTAL: &str = "lottery_operations_total";
/// Optimistic-concurrency cycles restarted after a version conflict.
pub const CONFLICT_RETRIES_TOTAL: &str = "lottery_conflict_retries_total";
/// Entrants moved to the selected list by a draw.
pub const WINNERS_TOTAL: &str = "lottery_winners_total";
/// Selected entrants cancelled or declined.
pub const CANCELLED_TOTAL: &str = "lottery_cancelled_total";

/// Register descriptions for all lottery metrics.
pub fn register_lottery_metrics() {
    describe_counter!(
        OPERATIONS_TOTAL,
        Unit::Count,
        "Total number of event state store operations by outcome"
    );
    describe_counter!(
        CONFLICT_RETRIES_TOTAL,
        Unit::Count,
        "Total number of read-modify-write cycles restarted after a version conflict"
    );
    describe_counter!(
        WINNERS_TOTAL,
        Unit::Count,
        "Total number of entrants selected by lottery draws"
    );
    describe_counter!(
        CANCELLED_TOTAL,
        Unit::Count,
        "Total number of selected entrants cancelled or declined"
    );
}

/// Outcome label for an operation result.
pub(crate) fn outcome_label<T>(result: &Result<T, LotteryError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(LotteryError::ConcurrentModification { .. }) => "conflict",
        Err(err) if err.is_logical() => "rejected",
        Err(_) => "error",
    }
}

/// Count one finished operation.
pub(crate) fn record_operation<T>(operation: &'static str, result: &Result<T, LotteryError>) {
    metrics::counter!(
        OPERATIONS_TOTAL,
        "operation" => operation,
        "outcome" => outcome_label(result)
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_lottery_core::types::EventId;

    #[test]
    fn outcomes_are_labelled_by_error_class() {
        let event = EventId::new("gala");

        assert_eq!(outcome_label(&Ok::<(), LotteryError>(())), "ok");
        assert_eq!(
            outcome_label::<()>(&Err(LotteryError::NothingToCancel(event.clone()))),
            "rejected"
        );
        assert_eq!(
            outcome_label::<()>(&Err(LotteryError::ConcurrentModification {
                event,
                attempts: 5
            })),
            "conflict"
        );
        assert_eq!(
            outcome_label::<()>(&Err(LotteryError::StoreUnavailable("down".into()))),
            "error"
        );
    }

    #[test]
    fn registering_without_a_recorder_is_harmless() {
        register_lottery_metrics();
        record_operation("join", &Ok::<(), LotteryError>(()));
    }
}
