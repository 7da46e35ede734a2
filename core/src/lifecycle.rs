//! Entrant lifecycle state machine.
//!
//! Every (event, entrant) pair is in exactly one [`EntrantState`]. Organizer and
//! entrant actions are [`LifecycleEvent`]s; [`transition`] is the single source
//! of truth for which moves are legal:
//!
//! ```text
//!   None ──join──▶ Waiting ──select──▶ Selected ──confirm──▶ Attending
//!    ▲               │                   │
//!    └─────leave─────┘                   ├──cancel──▶ Cancelled ──join──▶ Waiting
//!                                        └──decline─▶ Cancelled
//! ```
//!
//! Capacity guards on `select` depend on the whole event, not on a single
//! entrant, so they are checked by the lottery command before any transition
//! is requested.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Where an entrant stands with respect to one event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntrantState {
    /// Not on any list.
    None,
    /// On the waiting list.
    Waiting,
    /// Won a draw, awaiting confirmation.
    Selected,
    /// Confirmed attendance.
    Attending,
    /// Removed from the selected list without confirming.
    Cancelled,
}

impl EntrantState {
    /// Whether the entrant currently occupies one of the event's lists.
    #[must_use]
    pub const fn is_listed(self) -> bool {
        matches!(self, Self::Waiting | Self::Selected | Self::Attending)
    }
}

impl fmt::Display for EntrantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "NONE",
            Self::Waiting => "WAITING",
            Self::Selected => "SELECTED",
            Self::Attending => "ATTENDING",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(name)
    }
}

/// An action that moves an entrant between states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// Entrant joins the waiting list.
    Join,
    /// Entrant leaves the waiting list.
    Leave,
    /// Entrant is drawn by the lottery.
    Select,
    /// Selected entrant confirms attendance.
    Confirm,
    /// Organizer cancels a selected entrant who did not respond.
    Cancel,
    /// Selected entrant turns the invitation down.
    Decline,
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Select => "select",
            Self::Confirm => "confirm",
            Self::Cancel => "cancel",
            Self::Decline => "decline",
        };
        f.write_str(name)
    }
}

/// A lifecycle event was applied to a state that does not accept it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot {event} an entrant in state {from}")]
pub struct InvalidTransition {
    /// State the entrant was in.
    pub from: EntrantState,
    /// Event that was rejected.
    pub event: LifecycleEvent,
}

/// Compute the state reached by applying `event` in state `from`.
///
/// # Errors
///
/// Returns [`InvalidTransition`] when the move is not in the transition table.
///
/// # Examples
///
/// ```
/// use event_lottery_core::lifecycle::{transition, EntrantState, LifecycleEvent};
///
/// assert_eq!(
///     transition(EntrantState::Waiting, LifecycleEvent::Select),
///     Ok(EntrantState::Selected)
/// );
/// assert!(transition(EntrantState::Attending, LifecycleEvent::Leave).is_err());
/// ```
pub const fn transition(
    from: EntrantState,
    event: LifecycleEvent,
) -> Result<EntrantState, InvalidTransition> {
    use EntrantState as S;
    use LifecycleEvent as E;

    match (from, event) {
        (S::None | S::Cancelled, E::Join) => Ok(S::Waiting),
        (S::Waiting, E::Leave) => Ok(S::None),
        (S::Waiting, E::Select) => Ok(S::Selected),
        (S::Selected, E::Confirm) => Ok(S::Attending),
        (S::Selected, E::Cancel | E::Decline) => Ok(S::Cancelled),
        _ => Err(InvalidTransition { from, event }),
    }
}
