//! Organizer views over an event's lists: resolved rosters, exports and
//! messages.
//!
//! Profiles are looked up concurrently. A profile that is missing or whose
//! lookup fails is skipped with a warning, so one bad user document never
//! blocks an export. [`DocumentProfiles`] reads them from the `users`
//! collection of the same document store that holds the events.

use crate::metrics::record_operation;
use crate::store::EventStateStore;
use chrono::{DateTime, Utc};
use event_lottery_core::document::{DocumentStore, StoreError, StoreFuture, USERS_COLLECTION};
use event_lottery_core::environment::{
    Clock, Notifier, ProfileLookup, RosterExport, RosterExporter, UserProfile,
};
use event_lottery_core::types::{EntrantId, EntrantList, EventId};
use event_lottery_core::{LotteryError, Result};
use futures::future::join_all;
use std::sync::Arc;

/// Name for an export artifact, without extension.
///
/// Every character of `event_name` outside `[A-Za-z0-9]` becomes `_`, followed
/// by the list label and a `yyyyMMdd_HHmmss` timestamp.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use event_lottery_core::types::EntrantList;
/// use event_lottery_runtime::roster::artifact_name;
///
/// let at = Utc.with_ymd_and_hms(2025, 3, 9, 14, 5, 0).unwrap();
/// assert_eq!(
///     artifact_name("Spring Gala!", EntrantList::Waiting, at),
///     "Spring_Gala__waiting_list_20250309_140500"
/// );
/// ```
#[must_use]
pub fn artifact_name(event_name: &str, list: EntrantList, at: DateTime<Utc>) -> String {
    let sanitized: String = event_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{sanitized}_{}_{}", list.label(), at.format("%Y%m%d_%H%M%S"))
}

/// [`ProfileLookup`] over the `users` collection of a [`DocumentStore`].
#[derive(Clone)]
pub struct DocumentProfiles {
    documents: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for DocumentProfiles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentProfiles").finish_non_exhaustive()
    }
}

impl DocumentProfiles {
    /// Look profiles up in `documents`.
    #[must_use]
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }
}

impl ProfileLookup for DocumentProfiles {
    fn get<'a>(&'a self, user: &'a EntrantId) -> StoreFuture<'a, UserProfile> {
        Box::pin(async move {
            let document = self.documents.get(USERS_COLLECTION, user.as_str()).await?;
            let mut profile: UserProfile =
                serde_json::from_value(serde_json::Value::Object(document.fields)).map_err(|e| {
                    StoreError::Unavailable(format!("user {user} does not decode: {e}"))
                })?;
            profile.id = user.clone();
            Ok(profile)
        })
    }
}

/// Roster resolution, export and messaging for one deployment.
#[derive(Clone)]
pub struct RosterService {
    events: EventStateStore,
    profiles: Arc<dyn ProfileLookup>,
    exporter: Arc<dyn RosterExporter>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RosterService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterService")
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl RosterService {
    /// Create a service over `events` with its collaborators.
    #[must_use]
    pub fn new(
        events: EventStateStore,
        profiles: Arc<dyn ProfileLookup>,
        exporter: Arc<dyn RosterExporter>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            profiles,
            exporter,
            notifier,
            clock,
        }
    }

    /// Resolve the profiles on `list`, in list order.
    ///
    /// # Errors
    ///
    /// Returns whatever reading the event returns; lookup failures are
    /// skipped, not reported.
    pub async fn roster(&self, event_id: &EventId, list: EntrantList) -> Result<Vec<UserProfile>> {
        let record = self.events.snapshot(event_id).await?;
        let ids: Vec<EntrantId> = record.list(list).iter().cloned().collect();
        Ok(self.resolve(event_id, &ids).await)
    }

    /// Hand the resolved `list` to the exporter.
    ///
    /// Returns the location the exporter reports.
    ///
    /// # Errors
    ///
    /// - `EmptyRoster`: the list has no entrants
    /// - `StoreUnavailable`: the exporter failed
    /// - whatever reading the event returns
    #[tracing::instrument(
        skip_all,
        fields(event_id = %event_id, list = %list),
        name = "export_roster"
    )]
    pub async fn export_roster(&self, event_id: &EventId, list: EntrantList) -> Result<String> {
        let result = self.export_inner(event_id, list).await;
        record_operation("export_roster", &result);
        result
    }

    async fn export_inner(&self, event_id: &EventId, list: EntrantList) -> Result<String> {
        let record = self.events.snapshot(event_id).await?;
        let ids: Vec<EntrantId> = record.list(list).iter().cloned().collect();
        if ids.is_empty() {
            return Err(LotteryError::EmptyRoster {
                event: event_id.clone(),
                list,
            });
        }

        let profiles = self.resolve(event_id, &ids).await;
        let export = RosterExport {
            artifact_name: artifact_name(&record.name, list, self.clock.now()),
            event_name: record.name,
            list,
            profiles,
        };
        let rows = export.profiles.len();

        let location = self
            .exporter
            .export(export)
            .await
            .map_err(|e| LotteryError::from_store(event_id, e))?;
        tracing::info!(rows, listed = ids.len(), %location, "Roster exported");
        Ok(location)
    }

    /// Send `message` to everyone on `list`, returning the recipient count.
    ///
    /// The message is trimmed before sending. Delivery is fire-and-forget.
    ///
    /// # Errors
    ///
    /// - `EmptyMessage`: the message is blank
    /// - `EmptyRoster`: the list has no entrants
    /// - whatever reading the event returns
    #[tracing::instrument(
        skip_all,
        fields(event_id = %event_id, list = %list),
        name = "message_entrants"
    )]
    pub async fn message_entrants(
        &self,
        event_id: &EventId,
        list: EntrantList,
        message: &str,
    ) -> Result<usize> {
        let result = self.message_inner(event_id, list, message).await;
        record_operation("message_entrants", &result);
        result
    }

    async fn message_inner(
        &self,
        event_id: &EventId,
        list: EntrantList,
        message: &str,
    ) -> Result<usize> {
        let message = message.trim();
        if message.is_empty() {
            return Err(LotteryError::EmptyMessage);
        }

        let record = self.events.snapshot(event_id).await?;
        let recipients: Vec<EntrantId> = record.list(list).iter().cloned().collect();
        if recipients.is_empty() {
            return Err(LotteryError::EmptyRoster {
                event: event_id.clone(),
                list,
            });
        }

        self.notifier.notify(&recipients, message);
        tracing::info!(recipients = recipients.len(), "Message queued");
        Ok(recipients.len())
    }

    async fn resolve(&self, event_id: &EventId, ids: &[EntrantId]) -> Vec<UserProfile> {
        let lookups = join_all(ids.iter().map(|id| self.profiles.get(id))).await;

        ids.iter()
            .zip(lookups)
            .filter_map(|(id, lookup)| match lookup {
                Ok(profile) => Some(profile),
                Err(error) => {
                    tracing::warn!(
                        event_id = %event_id,
                        entrant_id = %id,
                        %error,
                        "Skipping entrant whose profile could not be resolved"
                    );
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn artifact_name_replaces_every_non_alphanumeric() {
        let at = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 58).single();
        assert_eq!(
            at.map(|at| artifact_name("Café & Co.", EntrantList::Attending, at)),
            Some("Caf____Co__attending_20241231_235958".to_string())
        );
    }
}
