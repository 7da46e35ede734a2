//! In-memory profile directory, notifier and exporter.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use event_lottery_core::document::{StoreError, StoreFuture, USERS_COLLECTION};
use event_lottery_core::environment::{
    Notifier, ProfileLookup, RosterExport, RosterExporter, UserProfile,
};
use event_lottery_core::types::EntrantId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};

/// Profile lookup backed by a `HashMap`.
///
/// Ids registered with [`InMemoryProfileDirectory::fail_lookups_for`] fail
/// with `Unavailable`, so roster tests can cover partial lookups.
#[derive(Clone, Debug, Default)]
pub struct InMemoryProfileDirectory {
    profiles: Arc<RwLock<HashMap<EntrantId, UserProfile>>>,
    failing: Arc<RwLock<HashSet<EntrantId>>>,
}

impl InMemoryProfileDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a profile.
    pub fn insert(&self, profile: UserProfile) {
        self.profiles
            .write()
            .unwrap()
            .insert(profile.id.clone(), profile);
    }

    /// Make lookups of `user` fail with a backend error.
    pub fn fail_lookups_for(&self, user: EntrantId) {
        self.failing.write().unwrap().insert(user);
    }
}

impl ProfileLookup for InMemoryProfileDirectory {
    fn get<'a>(&'a self, user: &'a EntrantId) -> StoreFuture<'a, UserProfile> {
        Box::pin(async move {
            if self.failing.read().unwrap().contains(user) {
                return Err(StoreError::Unavailable(format!("lookup of {user} failed")));
            }
            self.profiles
                .read()
                .unwrap()
                .get(user)
                .cloned()
                .ok_or_else(|| StoreError::NotFound {
                    collection: USERS_COLLECTION.to_string(),
                    id: user.to_string(),
                })
        })
    }
}

/// One message handed to a [`RecordingNotifier`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    /// Recipients, in the order given.
    pub recipients: Vec<EntrantId>,
    /// Message body.
    pub message: String,
}

/// Notifier that records every message instead of delivering it.
#[derive(Clone, Debug, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SentMessage>>>,
}

impl RecordingNotifier {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded so far.
    #[must_use]
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, recipients: &[EntrantId], message: &str) {
        self.sent.lock().unwrap().push(SentMessage {
            recipients: recipients.to_vec(),
            message: message.to_string(),
        });
    }
}

/// Exporter that keeps exports in memory and renders them as CSV text.
#[derive(Clone, Debug, Default)]
pub struct RecordingExporter {
    exports: Arc<Mutex<Vec<RosterExport>>>,
}

impl RecordingExporter {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exports received so far.
    #[must_use]
    pub fn exports(&self) -> Vec<RosterExport> {
        self.exports.lock().unwrap().clone()
    }

    /// Render an export the way a CSV writer would lay it out.
    #[must_use]
    pub fn render_csv(export: &RosterExport) -> String {
        let mut out = RosterExport::HEADER.join(",");
        out.push('\n');
        for profile in &export.profiles {
            out.push_str(&profile.export_row().join(","));
            out.push('\n');
        }
        out
    }
}

impl RosterExporter for RecordingExporter {
    fn export<'a>(&'a self, export: RosterExport) -> StoreFuture<'a, String> {
        Box::pin(async move {
            let location = format!("memory://{}.csv", export.artifact_name);
            self.exports.lock().unwrap().push(export);
            Ok(location)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_lottery_core::types::EntrantList;

    #[tokio::test]
    async fn directory_reports_missing_and_failing_profiles() {
        let directory = InMemoryProfileDirectory::new();
        directory.insert(UserProfile::named("u1", "Ada"));
        directory.fail_lookups_for(EntrantId::new("u2"));

        assert!(directory.get(&EntrantId::new("u1")).await.is_ok());
        assert!(matches!(
            directory.get(&EntrantId::new("u2")).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            directory.get(&EntrantId::new("u3")).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn csv_rendering_has_header_and_one_row_per_profile() {
        let export = RosterExport {
            event_name: "Gala".into(),
            list: EntrantList::Attending,
            artifact_name: "Gala_attending_20250101_000000".into(),
            profiles: vec![UserProfile::named("u1", "Ada")],
        };

        assert_eq!(RecordingExporter::render_csv(&export), "Name,Email,Phone\nAda,,\n");
    }
}
