use super::calendar::{diff, CalendarEvent, EventFilter, Feed};
use super::event_store::EventStore;
use super::{EventNotifier, EventSource};
use crate::error::NotifierResult;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// What happened during one fetch -> diff -> notify -> persist pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Events fetched and kept by the filter
    pub fetched: usize,
    pub new_events: usize,
    pub notified: usize,
    pub failed_feeds: usize,
    pub failed_notifications: usize,
    /// Whether the record was written to disk
    pub persisted: bool,
}

/// One notification pass over every configured feed
pub struct NotificationCycle<S, N> {
    feeds: Vec<Feed>,
    source: S,
    notifier: N,
    store: EventStore,
    filter: EventFilter,
    /// Set while the record on disk lags behind the known set
    unsaved: AtomicBool,
}

impl<S: EventSource, N: EventNotifier> NotificationCycle<S, N> {
    pub fn new(
        feeds: Vec<Feed>,
        source: S,
        notifier: N,
        store: EventStore,
        filter: EventFilter,
    ) -> Self {
        Self {
            feeds,
            source,
            notifier,
            store,
            filter,
            unsaved: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Fetch every feed in order. A failing feed is logged and counted.
    pub async fn fetch_feeds(&self) -> (Vec<CalendarEvent>, usize) {
        let mut events = Vec::new();
        let mut failed = 0;

        for feed in &self.feeds {
            match self.source.fetch_events(feed).await {
                Ok(feed_events) => events.extend(feed_events),
                Err(e) => {
                    error!("Failed to fetch feed {}: {}", feed, e);
                    failed += 1;
                }
            }
        }

        (events, failed)
    }

    /// Run a single pass, updating `known` with every delivered event.
    ///
    /// Never fails: feed, webhook and disk errors are logged and reported.
    /// The record is written when something was delivered, or when an
    /// earlier write failed.
    pub async fn run_once(&self, known: &mut HashSet<String>, now: DateTime<Utc>) -> CycleReport {
        let (events, failed_feeds) = self.fetch_feeds().await;
        let events = self.filter.apply(events, now);
        let new_events = diff(&events, known);

        let mut report = CycleReport {
            fetched: events.len(),
            new_events: new_events.len(),
            failed_feeds,
            ..Default::default()
        };

        for event in &new_events {
            // Same occurrence listed twice, e.g. by two overlapping feeds
            if known.contains(&event.id) {
                continue;
            }
            match self.notifier.notify(event).await {
                Ok(()) => {
                    known.insert(event.id.clone());
                    report.notified += 1;
                }
                Err(e) => {
                    error!("Failed to announce '{}' ({}): {}", event.title, event.id, e);
                    report.failed_notifications += 1;
                }
            }
        }

        // A failed save is retried on every pass until it goes through
        if report.notified > 0 || self.unsaved.load(Ordering::Relaxed) {
            match self.store.save(known).await {
                Ok(()) => {
                    self.unsaved.store(false, Ordering::Relaxed);
                    report.persisted = true;
                }
                Err(e) => {
                    self.unsaved.store(true, Ordering::Relaxed);
                    error!(
                        "Failed to persist notified events, they may be announced again after a restart: {}",
                        e
                    );
                }
            }
        }

        report
    }

    /// Record every currently listed event as already announced, without
    /// notifying. Returns how many identifiers were added.
    pub async fn seed(&self, known: &mut HashSet<String>) -> NotifierResult<usize> {
        let (events, failed_feeds) = self.fetch_feeds().await;
        if failed_feeds > 0 {
            warn!("{} feed(s) could not be fetched while seeding", failed_feeds);
        }

        let before = known.len();
        known.extend(events.into_iter().map(|event| event.id));
        self.store.save(known).await?;

        Ok(known.len() - before)
    }
}

/// Run passes until `shutdown` fires, sleeping `interval` between them.
///
/// The known set is owned by the loop and handed back when it stops.
pub async fn run_scheduler_loop<S: EventSource, N: EventNotifier>(
    cycle: &NotificationCycle<S, N>,
    mut known: HashSet<String>,
    interval: Duration,
    mut shutdown: oneshot::Receiver<()>,
) -> HashSet<String> {
    info!(
        "Watching {} feed(s) every {}s, {} event(s) already announced",
        cycle.feeds.len(),
        interval.as_secs(),
        known.len()
    );

    loop {
        let report = cycle.run_once(&mut known, Utc::now()).await;
        if report.new_events > 0 || report.failed_feeds > 0 {
            info!(
                "Cycle done: {} fetched, {} new, {} announced, {} failed, {} feed error(s)",
                report.fetched,
                report.new_events,
                report.notified,
                report.failed_notifications,
                report.failed_feeds
            );
        }

        tokio::select! {
            _ = sleep(interval) => {}
            _ = &mut shutdown => {
                info!("Received shutdown signal, stopping scheduler");
                break;
            }
        }
    }

    known
}
