use crate::components::calendar::CalendarEvent;
use crate::utils::time::format_time_span;
use chrono_tz::Tz;
use rust_i18n::t;
use serde::Serialize;
use std::collections::HashMap;

/// Discord rejects message content longer than this
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Body of a webhook execution request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebhookMessage {
    pub content: String,
    pub allowed_mentions: AllowedMentions,
}

/// Restricts pings to the role the message was meant for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AllowedMentions {
    pub parse: Vec<String>,
    pub roles: Vec<String>,
}

/// Builds notification messages for new events
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    timezone: Tz,
    locale: String,
    roles: HashMap<String, u64>,
}

impl MessageFormatter {
    pub fn new(timezone: Tz, locale: impl Into<String>, roles: HashMap<String, u64>) -> Self {
        Self {
            timezone,
            locale: locale.into(),
            roles,
        }
    }

    /// Role to mention for an event, looked up by its tag
    pub fn role_for(&self, event: &CalendarEvent) -> Option<u64> {
        let tag = event.role_tag.as_deref()?;
        self.roles.get(&tag.to_uppercase()).copied()
    }

    pub fn format(&self, event: &CalendarEvent) -> WebhookMessage {
        let locale = self.locale.as_str();
        let headline = t!("new_event", locale = locale, title = event.title.as_str());
        let span = format_time_span(&event.start, &event.end, self.timezone);
        let when = t!("event_time", locale = locale, time = span.as_str());

        let mut allowed_mentions = AllowedMentions::default();
        let content = match self.role_for(event) {
            Some(role_id) => {
                allowed_mentions.roles.push(role_id.to_string());
                format!("<@&{}> {}\n{}", role_id, headline, when)
            }
            None => format!("{}\n{}", headline, when),
        };

        WebhookMessage {
            content: truncate_chars(content, MAX_CONTENT_CHARS),
            allowed_mentions,
        }
    }
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => {
            let mut truncated = text[..cut].to_string();
            truncated.pop();
            truncated.push('…');
            truncated
        }
        None => text,
    }
}
