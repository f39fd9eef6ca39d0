use super::models::{CalendarEvent, Feed};
use super::parse::parse_feed;
use crate::components::EventSource;
use crate::error::{feed_error, NotifierResult};
use async_trait::async_trait;
use chrono_tz::Tz;
use reqwest::Client;
use tracing::debug;

/// Downloads and parses iCal feeds over HTTP
#[derive(Debug, Clone)]
pub struct IcalFeedClient {
    client: Client,
    timezone: Tz,
}

impl IcalFeedClient {
    /// `timezone` resolves floating times and unknown TZIDs
    pub fn new(client: Client, timezone: Tz) -> Self {
        Self { client, timezone }
    }

    async fn download(&self, feed: &Feed) -> NotifierResult<String> {
        let response = self
            .client
            .get(feed.url.clone())
            .header(reqwest::header::ACCEPT, "text/calendar, */*")
            .send()
            .await
            .map_err(|e| feed_error(&format!("Failed to fetch {}: {}", feed, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(feed_error(&format!(
                "Failed to fetch {}: HTTP {}",
                feed, status
            )));
        }

        response
            .text()
            .await
            .map_err(|e| feed_error(&format!("Failed to read body of {}: {}", feed, e)))
    }
}

#[async_trait]
impl EventSource for IcalFeedClient {
    async fn fetch_events(&self, feed: &Feed) -> NotifierResult<Vec<CalendarEvent>> {
        let body = self.download(feed).await?;
        let events = parse_feed(&body, feed.tag.as_deref(), self.timezone)?;
        debug!("Fetched {} events from {}", events.len(), feed);
        Ok(events)
    }
}
