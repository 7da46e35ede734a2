//! The event record: capacity, the three membership lists and their counters.
//!
//! [`EventRecord`] is a plain snapshot. It is decoded from a stored document,
//! mutated in memory by a [`crate::command::EventCommand`] and encoded back into
//! field mutations for a single conditional write.

use crate::document::Fields;
use crate::lifecycle::EntrantState;
use crate::types::{Capacity, EntrantId, EntrantList, EventId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Ordered set of entrants.
///
/// Ordered so that iteration (and therefore a seeded lottery) is reproducible.
pub type EntrantSet = BTreeSet<EntrantId>;

/// Canonical state of one event's waiting list and lottery.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Event identifier (the document id, not a stored field).
    #[serde(skip)]
    pub id: EventId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Seat limit; `None` means unlimited and no lottery.
    #[serde(default)]
    pub capacity: Option<Capacity>,
    /// Entrants hoping to be selected.
    #[serde(default)]
    pub waiting_list: EntrantSet,
    /// Lottery winners awaiting confirmation.
    #[serde(default)]
    pub selected_list: EntrantSet,
    /// Entrants who confirmed attendance.
    #[serde(default)]
    pub signed_up_users: EntrantSet,
    /// Cumulative number of selections across all draws.
    #[serde(default)]
    pub total_selected: u64,
    /// Cumulative number of selected entrants removed without confirming.
    #[serde(default)]
    pub total_cancelled: u64,
}

/// Counts shown on the organizer dashboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSummary {
    /// Seat limit, if any.
    pub capacity: Option<Capacity>,
    /// Size of the waiting list.
    pub waiting: usize,
    /// Size of the selected list.
    pub selected: usize,
    /// Number of attending entrants.
    pub attending: usize,
    /// Cumulative selections.
    pub total_selected: u64,
    /// Cumulative cancellations.
    pub total_cancelled: u64,
}

/// A structural rule of the record does not hold.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// An entrant appears on two lists at once.
    #[error("entrant {entrant} is on both {first} and {second}")]
    Overlap {
        /// Entrant found twice.
        entrant: EntrantId,
        /// First list containing the entrant.
        first: EntrantList,
        /// Second list containing the entrant.
        second: EntrantList,
    },
    /// More entrants are selected than the event seats.
    #[error("{selected} entrants selected but capacity is {capacity}")]
    OverCapacity {
        /// Size of the selected list.
        selected: usize,
        /// Configured capacity.
        capacity: Capacity,
    },
}

impl EventRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new(id: EventId, name: impl Into<String>, capacity: Option<Capacity>) -> Self {
        Self {
            id,
            name: name.into(),
            capacity,
            ..Self::default()
        }
    }

    /// Decode a record from stored document fields.
    ///
    /// Decoding is lenient: absent lists are empty, duplicate ids collapse and
    /// overlapping lists are accepted as stored (see [`Self::check_invariants`]).
    ///
    /// # Errors
    ///
    /// Returns the decoder error when a field has the wrong type.
    pub fn from_fields(id: EventId, fields: Fields) -> Result<Self, serde_json::Error> {
        let mut record: Self = serde_json::from_value(serde_json::Value::Object(fields))?;
        record.id = id;
        Ok(record)
    }

    /// Encode the record as document fields.
    ///
    /// # Errors
    ///
    /// Returns the encoder error if serialization fails.
    pub fn to_fields(&self) -> Result<Fields, serde_json::Error> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(fields) => Ok(fields),
            other => Err(serde::de::Error::custom(format!(
                "event record encoded as {other}, expected an object"
            ))),
        }
    }

    /// Borrow one of the membership lists.
    #[must_use]
    pub const fn list(&self, list: EntrantList) -> &EntrantSet {
        match list {
            EntrantList::Waiting => &self.waiting_list,
            EntrantList::Selected => &self.selected_list,
            EntrantList::Attending => &self.signed_up_users,
        }
    }

    /// Which list, if any, holds `entrant`.
    ///
    /// Checked from the most advanced list backwards, so an entrant left on
    /// both `selectedList` and `signedUpUsers` by an older client reads as
    /// attending.
    #[must_use]
    pub fn list_of(&self, entrant: &EntrantId) -> Option<EntrantList> {
        [
            EntrantList::Attending,
            EntrantList::Selected,
            EntrantList::Waiting,
        ]
        .into_iter()
        .find(|&list| self.list(list).contains(entrant))
    }

    /// Lifecycle state of `entrant` as far as the record can tell.
    ///
    /// Cancelled entrants are not tracked individually (only counted), so they
    /// read as [`EntrantState::None`].
    #[must_use]
    pub fn state_of(&self, entrant: &EntrantId) -> EntrantState {
        match self.list_of(entrant) {
            Some(EntrantList::Waiting) => EntrantState::Waiting,
            Some(EntrantList::Selected) => EntrantState::Selected,
            Some(EntrantList::Attending) => EntrantState::Attending,
            None => EntrantState::None,
        }
    }

    /// Distinct entrants holding a seat: selected or attending.
    ///
    /// An entrant stored on both lists holds one seat, not two.
    #[must_use]
    pub fn seats_taken(&self) -> usize {
        self.selected_list.union(&self.signed_up_users).count()
    }

    /// Seats a new draw may still fill, or `None` for unlimited events.
    #[must_use]
    pub fn remaining_capacity(&self) -> Option<usize> {
        self.capacity.map(|c| c.remaining(self.seats_taken()))
    }

    /// Dashboard counts.
    #[must_use]
    pub fn summary(&self) -> EventSummary {
        EventSummary {
            capacity: self.capacity,
            waiting: self.waiting_list.len(),
            selected: self.selected_list.len(),
            attending: self.signed_up_users.len(),
            total_selected: self.total_selected,
            total_cancelled: self.total_cancelled,
        }
    }

    /// Verify that the three lists are disjoint and the selected list fits the
    /// capacity.
    ///
    /// # Errors
    ///
    /// Returns the first [`InvariantViolation`] found.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let pairs = [
            (EntrantList::Waiting, EntrantList::Selected),
            (EntrantList::Waiting, EntrantList::Attending),
            (EntrantList::Selected, EntrantList::Attending),
        ];
        for (first, second) in pairs {
            if let Some(entrant) = self.list(first).intersection(self.list(second)).next() {
                return Err(InvariantViolation::Overlap {
                    entrant: entrant.clone(),
                    first,
                    second,
                });
            }
        }

        if let Some(capacity) = self.capacity {
            if self.selected_list.len() > capacity.value() as usize {
                return Err(InvariantViolation::OverCapacity {
                    selected: self.selected_list.len(),
                    capacity,
                });
            }
        }

        Ok(())
    }
}
