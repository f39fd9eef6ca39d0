use crate::error::NotifierResult;
use async_trait::async_trait;

// Export components
pub mod calendar;
pub mod discord_webhook;
pub mod event_store;
pub mod scheduler;

pub use calendar::{CalendarEvent, Feed};
pub use discord_webhook::DiscordWebhook;
pub use event_store::EventStore;

/// Where calendar events come from
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch and parse every event of one feed
    async fn fetch_events(&self, feed: &Feed) -> NotifierResult<Vec<CalendarEvent>>;
}

/// Where new events are announced
#[async_trait]
pub trait EventNotifier: Send + Sync {
    /// Announce a single event. An error means it was not delivered.
    async fn notify(&self, event: &CalendarEvent) -> NotifierResult<()>;
}
