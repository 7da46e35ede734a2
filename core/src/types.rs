//! Identifier and value types for events and their entrants.
//!
//! Identifiers are opaque strings handed out by the document database, so both
//! [`EventId`] and [`EntrantId`] are newtypes over `String`:
//!
//! - `FromStr::from_str()` validates input (rejects empty or blank strings)
//! - `From::from()` and `new()` do not validate (for trusted, stored values)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when parsing an identifier from untrusted input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid identifier: {0}")]
pub struct ParseIdError(String);

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an identifier from a trusted string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Convert into the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.trim().is_empty() {
                    return Err(ParseIdError(format!(
                        "{} cannot be empty",
                        stringify!($name)
                    )));
                }
                Ok(Self(s.to_string()))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Unique identifier of an event document.
    ///
    /// # Examples
    ///
    /// ```
    /// use event_lottery_core::types::EventId;
    ///
    /// let id: EventId = "spring-gala".parse().unwrap();
    /// assert_eq!(id.as_str(), "spring-gala");
    /// assert!("".parse::<EventId>().is_err());
    /// ```
    EventId
);

string_id!(
    /// Unique identifier of an entrant (a user document id).
    EntrantId
);

/// Maximum number of entrants an event can seat.
///
/// An event without a capacity is unlimited and never runs a lottery, so the
/// record stores `Option<Capacity>` rather than a sentinel value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capacity(u32);

impl Capacity {
    /// Create a new capacity.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the inner value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    /// Seats still open once `occupied` entrants hold one.
    ///
    /// Saturates at zero when an organizer lowered the capacity below the
    /// number of entrants already selected or attending.
    #[must_use]
    pub fn remaining(self, occupied: usize) -> usize {
        (self.0 as usize).saturating_sub(occupied)
    }
}

impl fmt::Display for Capacity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the three membership lists an event keeps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrantList {
    /// Entrants hoping to be selected.
    Waiting,
    /// Lottery winners awaiting confirmation.
    Selected,
    /// Entrants who confirmed attendance (`signedUpUsers`).
    Attending,
}

impl EntrantList {
    /// All lists, in lifecycle order.
    pub const ALL: [Self; 3] = [Self::Waiting, Self::Selected, Self::Attending];

    /// Label used for export artifacts and messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Waiting => "waiting_list",
            Self::Selected => "selected",
            Self::Attending => "attending",
        }
    }

    /// Name of the document field holding this list.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::Waiting => "waitingList",
            Self::Selected => "selectedList",
            Self::Attending => "signedUpUsers",
        }
    }
}

impl fmt::Display for EntrantList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_ids_are_rejected() {
        assert!("   ".parse::<EntrantId>().is_err());
        assert!("".parse::<EventId>().is_err());
        assert_eq!("u-1".parse::<EntrantId>(), Ok(EntrantId::new("u-1")));
    }

    #[test]
    fn remaining_capacity_saturates() {
        let capacity = Capacity::new(3);
        assert_eq!(capacity.remaining(1), 2);
        assert_eq!(capacity.remaining(3), 0);
        assert_eq!(capacity.remaining(5), 0);
    }

    #[test]
    fn list_labels_match_stored_field_names() {
        assert_eq!(EntrantList::Waiting.field(), "waitingList");
        assert_eq!(EntrantList::Attending.label(), "attending");
        assert_eq!(EntrantList::Selected.to_string(), "selected");
    }
}
