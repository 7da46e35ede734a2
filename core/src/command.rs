//! Commands that mutate an event record.
//!
//! [`EventCommand::apply`] is the pure core of every state-store operation:
//! `(record, command, rng) → (record', outcome)`. It validates against the
//! entrant lifecycle, delegates draws to the lottery engine, and only touches
//! the record once every check has passed, so a rejected command leaves the
//! record exactly as it was.
//!
//! The outcome also says which document fields changed, so the store can write
//! them back in one conditional update.

use crate::document::FieldMutations;
use crate::error::{LotteryError, Result};
use crate::event::EventRecord;
use crate::lifecycle::{EntrantState, LifecycleEvent, transition};
use crate::lottery::{RandomSource, select_winners};
use crate::types::{Capacity, EntrantId, EntrantList};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A requested change to one event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventCommand {
    /// Entrant joins the waiting list.
    Join {
        /// Joining entrant.
        entrant: EntrantId,
    },
    /// Entrant leaves the waiting list.
    Leave {
        /// Leaving entrant.
        entrant: EntrantId,
    },
    /// Organizer draws winners into the selected list.
    RunLottery,
    /// Organizer removes selected entrants who have not signed up.
    CancelNonResponsive,
    /// Selected entrant confirms attendance.
    ConfirmAttendance {
        /// Confirming entrant.
        entrant: EntrantId,
    },
    /// Selected entrant declines the invitation.
    DeclineInvitation {
        /// Declining entrant.
        entrant: EntrantId,
    },
}

/// What a successfully applied command did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandOutcome {
    /// Entrant added to the waiting list.
    Joined(EntrantId),
    /// Entrant removed from the waiting list.
    Left(EntrantId),
    /// Winners moved from the waiting list to the selected list, in draw order.
    LotteryDrawn {
        /// Winners of this draw.
        winners: Vec<EntrantId>,
    },
    /// Non-responsive entrants removed from the selected list.
    Cancelled {
        /// Removed entrants.
        entrants: Vec<EntrantId>,
    },
    /// Entrant moved from selected to attending.
    Confirmed(EntrantId),
    /// Entrant removed from the selected list at their own request.
    Declined(EntrantId),
}

impl CommandOutcome {
    /// Short name used in logs and metrics.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Joined(_) => "join",
            Self::Left(_) => "leave",
            Self::LotteryDrawn { .. } => "run_lottery",
            Self::Cancelled { .. } => "cancel_non_responsive",
            Self::Confirmed(_) => "confirm_attendance",
            Self::Declined(_) => "decline_invitation",
        }
    }

    /// Document fields this outcome changed, with their new values.
    #[must_use]
    pub fn mutations(&self, record: &EventRecord) -> FieldMutations {
        let mut fields = FieldMutations::new();

        match self {
            Self::Joined(_) | Self::Left(_) => put_list(&mut fields, record, EntrantList::Waiting),
            Self::LotteryDrawn { .. } => {
                put_list(&mut fields, record, EntrantList::Waiting);
                put_list(&mut fields, record, EntrantList::Selected);
                fields.insert("totalSelected".into(), Value::from(record.total_selected));
            }
            Self::Cancelled { .. } | Self::Declined(_) => {
                put_list(&mut fields, record, EntrantList::Selected);
                fields.insert("totalCancelled".into(), Value::from(record.total_cancelled));
            }
            Self::Confirmed(_) => {
                put_list(&mut fields, record, EntrantList::Selected);
                put_list(&mut fields, record, EntrantList::Attending);
            }
        }
        fields
    }
}

fn put_list(fields: &mut FieldMutations, record: &EventRecord, list: EntrantList) {
    let value = Value::Array(
        record
            .list(list)
            .iter()
            .map(|id| Value::from(id.as_str()))
            .collect(),
    );
    fields.insert(list.field().to_string(), value);
}

/// Check that `entrant` may take `event`, reporting the lifecycle error in
/// domain terms.
fn guard(entrant: &EntrantId, from: EntrantState, event: LifecycleEvent) -> Result<EntrantState> {
    transition(from, event).map_err(|e| LotteryError::InvalidTransition {
        entrant: entrant.clone(),
        from: e.from,
        event: e.event,
    })
}

impl EventCommand {
    /// Operation name, matching [`CommandOutcome::name`].
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::RunLottery => "run_lottery",
            Self::CancelNonResponsive => "cancel_non_responsive",
            Self::ConfirmAttendance { .. } => "confirm_attendance",
            Self::DeclineInvitation { .. } => "decline_invitation",
        }
    }

    /// Lifecycle event the command requests, if it targets a single entrant.
    #[must_use]
    pub const fn lifecycle_event(&self) -> Option<LifecycleEvent> {
        match self {
            Self::Join { .. } => Some(LifecycleEvent::Join),
            Self::Leave { .. } => Some(LifecycleEvent::Leave),
            Self::ConfirmAttendance { .. } => Some(LifecycleEvent::Confirm),
            Self::DeclineInvitation { .. } => Some(LifecycleEvent::Decline),
            Self::RunLottery | Self::CancelNonResponsive => None,
        }
    }

    /// Apply the command to `record`.
    ///
    /// # Errors
    ///
    /// - `AlreadyOnList`: join by an entrant already on a list
    /// - `NotWaiting`: leave by an entrant not on the waiting list
    /// - `NoCapacitySet`, `EmptyWaitingList`, `CapacityReached`: lottery
    ///   preconditions
    /// - `NothingToCancel`: every selected entrant has signed up
    /// - `InvalidTransition`: confirm or decline by an entrant not selected
    ///
    /// On error `record` is unchanged.
    pub fn apply(self, record: &mut EventRecord, rng: &dyn RandomSource) -> Result<CommandOutcome> {
        match self {
            Self::Join { entrant } => {
                if let Some(list) = record.list_of(&entrant) {
                    return Err(LotteryError::AlreadyOnList { entrant, list });
                }
                guard(&entrant, EntrantState::None, LifecycleEvent::Join)?;
                record.waiting_list.insert(entrant.clone());
                Ok(CommandOutcome::Joined(entrant))
            }

            Self::Leave { entrant } => {
                if !record.waiting_list.contains(&entrant) {
                    return Err(LotteryError::NotWaiting(entrant));
                }
                guard(&entrant, EntrantState::Waiting, LifecycleEvent::Leave)?;
                record.waiting_list.remove(&entrant);
                Ok(CommandOutcome::Left(entrant))
            }

            Self::RunLottery => {
                let capacity = record
                    .capacity
                    .ok_or_else(|| LotteryError::NoCapacitySet(record.id.clone()))?;
                if record.waiting_list.is_empty() {
                    return Err(LotteryError::EmptyWaitingList(record.id.clone()));
                }
                let open = capacity.remaining(record.seats_taken());
                if open == 0 {
                    return Err(LotteryError::CapacityReached(record.id.clone()));
                }

                let seats = Capacity::new(u32::try_from(open).unwrap_or(u32::MAX));
                let draw = select_winners(&record.waiting_list, seats, &record.selected_list, rng);
                for winner in &draw.winners {
                    guard(winner, EntrantState::Waiting, LifecycleEvent::Select)?;
                }

                record.waiting_list = draw.remaining;
                record.selected_list.extend(draw.winners.iter().cloned());
                record.total_selected += draw.winners.len() as u64;
                Ok(CommandOutcome::LotteryDrawn {
                    winners: draw.winners,
                })
            }

            Self::CancelNonResponsive => {
                let to_cancel: Vec<EntrantId> = record
                    .selected_list
                    .difference(&record.signed_up_users)
                    .cloned()
                    .collect();
                if to_cancel.is_empty() {
                    return Err(LotteryError::NothingToCancel(record.id.clone()));
                }
                for entrant in &to_cancel {
                    guard(entrant, EntrantState::Selected, LifecycleEvent::Cancel)?;
                }
                for entrant in &to_cancel {
                    record.selected_list.remove(entrant);
                }
                record.total_cancelled += to_cancel.len() as u64;
                Ok(CommandOutcome::Cancelled {
                    entrants: to_cancel,
                })
            }

            Self::ConfirmAttendance { entrant } => {
                guard(&entrant, record.state_of(&entrant), LifecycleEvent::Confirm)?;
                record.selected_list.remove(&entrant);
                record.signed_up_users.insert(entrant.clone());
                Ok(CommandOutcome::Confirmed(entrant))
            }

            Self::DeclineInvitation { entrant } => {
                guard(&entrant, record.state_of(&entrant), LifecycleEvent::Decline)?;
                record.selected_list.remove(&entrant);
                record.total_cancelled += 1;
                Ok(CommandOutcome::Declined(entrant))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::event::EntrantSet;
    use crate::lottery::SeededRandom;
    use crate::types::EventId;

    fn ids(names: &[&str]) -> EntrantSet {
        names.iter().map(|n| EntrantId::new(*n)).collect()
    }

    fn record(capacity: Option<u32>) -> EventRecord {
        EventRecord::new(EventId::new("gala"), "Gala", capacity.map(Capacity::new))
    }

    fn join(name: &str) -> EventCommand {
        EventCommand::Join {
            entrant: EntrantId::new(name),
        }
    }

    #[test]
    fn join_then_leave_restores_waiting_list() {
        let rng = SeededRandom::new(0);
        let mut event = record(Some(2));
        event.waiting_list = ids(&["a"]);
        let before = event.waiting_list.clone();

        join("b").apply(&mut event, &rng).unwrap();
        EventCommand::Leave {
            entrant: EntrantId::new("b"),
        }
        .apply(&mut event, &rng)
        .unwrap();

        assert_eq!(event.waiting_list, before);
    }

    #[test]
    fn joining_twice_is_rejected() {
        let rng = SeededRandom::new(0);
        let mut event = record(None);
        join("a").apply(&mut event, &rng).unwrap();

        let err = join("a").apply(&mut event, &rng).unwrap_err();
        assert_eq!(
            err,
            LotteryError::AlreadyOnList {
                entrant: EntrantId::new("a"),
                list: EntrantList::Waiting
            }
        );
    }

    #[test]
    fn selected_entrant_cannot_rejoin() {
        let rng = SeededRandom::new(0);
        let mut event = record(Some(1));
        event.selected_list = ids(&["a"]);

        assert!(matches!(
            join("a").apply(&mut event, &rng),
            Err(LotteryError::AlreadyOnList {
                list: EntrantList::Selected,
                ..
            })
        ));
    }

    #[test]
    fn lottery_requires_capacity_and_candidates() {
        let rng = SeededRandom::new(0);
        let mut unlimited = record(None);
        unlimited.waiting_list = ids(&["a"]);
        assert_eq!(
            EventCommand::RunLottery.apply(&mut unlimited, &rng),
            Err(LotteryError::NoCapacitySet(EventId::new("gala")))
        );

        let mut empty = record(Some(5));
        let before = empty.clone();
        assert_eq!(
            EventCommand::RunLottery.apply(&mut empty, &rng),
            Err(LotteryError::EmptyWaitingList(EventId::new("gala")))
        );
        assert_eq!(empty, before);
    }

    #[test]
    fn lottery_moves_winners_and_counts_cumulatively() {
        let rng = SeededRandom::new(42);
        let mut event = record(Some(3));
        event.waiting_list = ids(&["a", "b", "c", "d", "e"]);

        let outcome = EventCommand::RunLottery.apply(&mut event, &rng).unwrap();
        let CommandOutcome::LotteryDrawn { winners } = outcome else {
            unreachable!("draw returns winners");
        };
        assert_eq!(winners.len(), 3);
        assert_eq!(event.selected_list.len(), 3);
        assert_eq!(event.waiting_list.len(), 2);
        assert_eq!(event.total_selected, 3);
        event.check_invariants().unwrap();

        // One winner declines; the redraw fills exactly the freed seat.
        EventCommand::DeclineInvitation {
            entrant: winners[0].clone(),
        }
        .apply(&mut event, &rng)
        .unwrap();
        EventCommand::RunLottery.apply(&mut event, &rng).unwrap();

        assert_eq!(event.selected_list.len(), 3);
        assert_eq!(event.waiting_list.len(), 1);
        assert_eq!(event.total_selected, 4);
        assert_eq!(event.total_cancelled, 1);
    }

    #[test]
    fn full_event_reports_capacity_reached() {
        let rng = SeededRandom::new(0);
        let mut event = record(Some(2));
        event.waiting_list = ids(&["c"]);
        event.selected_list = ids(&["a"]);
        event.signed_up_users = ids(&["b"]);

        assert_eq!(
            EventCommand::RunLottery.apply(&mut event, &rng),
            Err(LotteryError::CapacityReached(EventId::new("gala")))
        );
    }

    #[test]
    fn cancel_removes_only_entrants_who_did_not_sign_up() {
        let rng = SeededRandom::new(0);
        let mut event = record(Some(3));
        event.selected_list = ids(&["A", "B", "C"]);
        event.signed_up_users = ids(&["B"]);

        let outcome = EventCommand::CancelNonResponsive
            .apply(&mut event, &rng)
            .unwrap();

        assert_eq!(
            outcome,
            CommandOutcome::Cancelled {
                entrants: vec![EntrantId::new("A"), EntrantId::new("C")]
            }
        );
        assert_eq!(event.selected_list, ids(&["B"]));
        assert_eq!(event.total_cancelled, 2);
    }

    #[test]
    fn cancel_with_everyone_signed_up_is_rejected() {
        let rng = SeededRandom::new(0);
        let mut event = record(Some(3));
        event.signed_up_users = ids(&["A"]);

        assert_eq!(
            EventCommand::CancelNonResponsive.apply(&mut event, &rng),
            Err(LotteryError::NothingToCancel(EventId::new("gala")))
        );
    }

    #[test]
    fn confirm_requires_selection() {
        let rng = SeededRandom::new(0);
        let mut event = record(Some(3));
        event.waiting_list = ids(&["a"]);
        let before = event.clone();

        let err = EventCommand::ConfirmAttendance {
            entrant: EntrantId::new("a"),
        }
        .apply(&mut event, &rng)
        .unwrap_err();

        assert_eq!(
            err,
            LotteryError::InvalidTransition {
                entrant: EntrantId::new("a"),
                from: EntrantState::Waiting,
                event: LifecycleEvent::Confirm,
            }
        );
        assert_eq!(event, before);
    }

    #[test]
    fn confirm_moves_entrant_to_attending_and_writes_both_lists() {
        let rng = SeededRandom::new(0);
        let mut event = record(Some(3));
        event.selected_list = ids(&["a"]);

        let outcome = EventCommand::ConfirmAttendance {
            entrant: EntrantId::new("a"),
        }
        .apply(&mut event, &rng)
        .unwrap();

        assert_eq!(event.signed_up_users, ids(&["a"]));
        assert!(event.selected_list.is_empty());

        let fields = outcome.mutations(&event);
        assert_eq!(fields["signedUpUsers"], serde_json::json!(["a"]));
        assert_eq!(fields["selectedList"], serde_json::json!([]));
        assert!(!fields.contains_key("waitingList"));
    }

    #[test]
    fn lottery_mutations_include_counter_in_same_write() {
        let rng = SeededRandom::new(3);
        let mut event = record(Some(1));
        event.waiting_list = ids(&["a", "b"]);

        let outcome = EventCommand::RunLottery.apply(&mut event, &rng).unwrap();
        let fields = outcome.mutations(&event);

        assert_eq!(fields["totalSelected"], serde_json::json!(1));
        assert_eq!(fields["waitingList"].as_array().unwrap().len(), 1);
        assert_eq!(fields["selectedList"].as_array().unwrap().len(), 1);
    }
}
