//! Collaborators injected into the lottery services.
//!
//! Nothing here is implemented by this crate except [`SystemClock`]. Profile
//! lookup, notification delivery and roster export are owned by the
//! surrounding platform; in-memory versions live in `event-lottery-testing`.

use crate::document::StoreFuture;
use crate::types::{EntrantId, EntrantList};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Clock trait - abstracts time operations for testability.
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Contact details of a user, resolved for rosters and exports.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// User document id.
    #[serde(default)]
    pub id: EntrantId,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Contact email.
    #[serde(default)]
    pub email: Option<String>,
    /// Contact phone number.
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Whether the user may organize events.
    #[serde(default)]
    pub is_organizer: bool,
    /// Whether the user administers the platform.
    #[serde(default)]
    pub is_admin: bool,
}

impl UserProfile {
    /// Create a profile with only a name.
    #[must_use]
    pub fn named(id: impl Into<EntrantId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Export row in `Name,Email,Phone` column order; missing fields are empty.
    #[must_use]
    pub fn export_row(&self) -> [&str; 3] {
        [
            self.name.as_deref().unwrap_or_default(),
            self.email.as_deref().unwrap_or_default(),
            self.phone_number.as_deref().unwrap_or_default(),
        ]
    }
}

/// Resolves user ids to profiles.
pub trait ProfileLookup: Send + Sync {
    /// Look up one profile.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound`: no such user
    /// - `StoreError::Unavailable`: backend failure
    fn get<'a>(&'a self, user: &'a EntrantId) -> StoreFuture<'a, UserProfile>;
}

/// A roster ready to be written out as a table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterExport {
    /// Event display name.
    pub event_name: String,
    /// List the roster was taken from.
    pub list: EntrantList,
    /// Suggested artifact name (without extension).
    pub artifact_name: String,
    /// Resolved profiles, in list order.
    pub profiles: Vec<UserProfile>,
}

impl RosterExport {
    /// Column headers matching [`UserProfile::export_row`].
    pub const HEADER: [&'static str; 3] = ["Name", "Email", "Phone"];

    /// Label of the exported list.
    #[must_use]
    pub const fn list_label(&self) -> &'static str {
        self.list.label()
    }
}

/// Writes roster exports (CSV file, spreadsheet, ...).
pub trait RosterExporter: Send + Sync {
    /// Write `export`, returning a location or handle for the artifact.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` when the artifact cannot be written.
    fn export<'a>(&'a self, export: RosterExport) -> StoreFuture<'a, String>;
}

/// Delivers messages to entrants. Fire-and-forget: delivery is not confirmed.
pub trait Notifier: Send + Sync {
    /// Queue `message` for `recipients`.
    fn notify(&self, recipients: &[EntrantId], message: &str);
}
