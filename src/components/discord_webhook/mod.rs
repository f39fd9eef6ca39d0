pub mod notifications;

pub use notifications::{MessageFormatter, WebhookMessage};

use crate::components::calendar::CalendarEvent;
use crate::components::EventNotifier;
use crate::error::{webhook_error, NotifierResult};
use async_trait::async_trait;
use reqwest::Client;
use tracing::info;
use url::Url;

/// Posts event announcements to a Discord webhook
#[derive(Debug, Clone)]
pub struct DiscordWebhook {
    client: Client,
    url: Url,
    formatter: MessageFormatter,
}

impl DiscordWebhook {
    pub fn new(client: Client, url: Url, formatter: MessageFormatter) -> Self {
        Self {
            client,
            url,
            formatter,
        }
    }

    /// Send an already formatted message
    pub async fn send(&self, message: &WebhookMessage) -> NotifierResult<()> {
        let response = self
            .client
            .post(self.url.clone())
            .json(message)
            .send()
            .await
            .map_err(|e| webhook_error(&format!("Failed to send message: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(webhook_error(&format!(
                "Webhook rejected message: HTTP {} - {}",
                status, error_body
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl EventNotifier for DiscordWebhook {
    async fn notify(&self, event: &CalendarEvent) -> NotifierResult<()> {
        let message = self.formatter.format(event);
        self.send(&message).await?;
        info!("Announced '{}' ({})", event.title, event.id);
        Ok(())
    }
}
