//! Event lottery demo binary
//!
//! Runs one event through its whole life against in-memory collaborators:
//! entrants join, the organizer draws, one winner confirms, one declines, the
//! rest are cancelled, the freed seats are redrawn and the attendee list is
//! exported.
//!
//! Configuration comes from the environment (`LOTTERY_*`, `RUST_LOG`); set
//! `LOTTERY_RNG_SEED` for a reproducible draw.

use anyhow::Context;
use event_lottery_core::EventRecord;
use event_lottery_core::environment::UserProfile;
use event_lottery_core::types::{Capacity, EntrantId, EntrantList, EventId};
use event_lottery_runtime::{EventStateStore, LotteryConfig, RosterService, register_lottery_metrics};
use event_lottery_testing::mocks::test_clock;
use event_lottery_testing::{
    InMemoryDocumentStore, InMemoryProfileDirectory, RecordingExporter, RecordingNotifier,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const ENTRANTS: [(&str, &str); 8] = [
    ("u-ada", "Ada Lovelace"),
    ("u-alan", "Alan Turing"),
    ("u-barbara", "Barbara Liskov"),
    ("u-edsger", "Edsger Dijkstra"),
    ("u-frances", "Frances Allen"),
    ("u-grace", "Grace Hopper"),
    ("u-ken", "Ken Thompson"),
    ("u-margaret", "Margaret Hamilton"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = LotteryConfig::from_env();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate().context("invalid lottery configuration")?;
    register_lottery_metrics();
    info!(?config, "Configuration loaded");

    println!("=== Event Lottery Demo ===\n");

    let documents = InMemoryDocumentStore::new();
    let directory = InMemoryProfileDirectory::new();
    let exporter = RecordingExporter::new();
    let notifier = RecordingNotifier::new();

    let store = EventStateStore::from_config(Arc::new(documents), &config);
    let roster = RosterService::new(
        store.clone(),
        Arc::new(directory.clone()),
        Arc::new(exporter.clone()),
        Arc::new(notifier.clone()),
        Arc::new(test_clock()),
    );

    let gala = EventId::new("spring-gala");
    store
        .create_event(&EventRecord::new(gala.clone(), "Spring Gala", Some(Capacity::new(3))))
        .await?;
    println!("Created \"Spring Gala\" with 3 seats");

    for (id, name) in ENTRANTS {
        let mut profile = UserProfile::named(id, name);
        profile.email = Some(format!("{}@example.com", id.trim_start_matches("u-")));
        directory.insert(profile);
        store.join(&gala, &EntrantId::new(id)).await?;
    }
    println!("{} entrants joined the waiting list", ENTRANTS.len());

    let preview = store.lottery_preview(&gala).await?;
    println!(
        "\n>>> Drawing {} of {} waiting entrants",
        preview.winners, preview.waiting
    );
    let draw = store.run_lottery(&gala).await?;
    for winner in draw.winners() {
        println!("  selected: {winner}");
    }

    roster
        .message_entrants(&gala, EntrantList::Selected, "You've been selected! Please confirm.")
        .await?;

    let mut winners = draw.winners().iter();
    if let Some(first) = winners.next() {
        store.confirm_attendance(&gala, first).await?;
        println!("\n{first} confirmed");
    }
    if let Some(second) = winners.next() {
        store.decline_invitation(&gala, second).await?;
        println!("{second} declined");
    }

    match store.cancel_non_responsive(&gala).await {
        Ok(receipt) => println!("Cancelled non-responsive: {:?}", receipt.cancelled()),
        Err(err) => println!("Cancel skipped: {err}"),
    }

    println!("\n>>> Redrawing freed seats");
    let redraw = store.run_lottery(&gala).await?;
    for winner in redraw.winners() {
        println!("  selected: {winner}");
        store.confirm_attendance(&gala, winner).await?;
    }

    let summary = store.summary(&gala).await?;
    println!(
        "\nWaiting: {}  Selected: {}  Attending: {}  Total selected: {}  Total cancelled: {}",
        summary.waiting,
        summary.selected,
        summary.attending,
        summary.total_selected,
        summary.total_cancelled
    );

    let location = roster.export_roster(&gala, EntrantList::Attending).await?;
    println!("\nExported attendees to {location}");
    for export in exporter.exports() {
        print!("{}", RecordingExporter::render_csv(&export));
    }

    println!("\nMessages sent: {}", notifier.sent().len());
    println!("\n=== Demo Complete ===");
    Ok(())
}
