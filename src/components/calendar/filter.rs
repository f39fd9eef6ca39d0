use super::models::CalendarEvent;
use chrono::{DateTime, Utc};

/// Decides which fetched events are worth announcing at all
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Lowercased keyword the title must contain
    keyword: Option<String>,
    include_past: bool,
}

impl EventFilter {
    pub fn new(keyword: Option<&str>, include_past: bool) -> Self {
        let keyword = keyword
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty());
        Self {
            keyword,
            include_past,
        }
    }

    pub fn matches(&self, event: &CalendarEvent, now: DateTime<Utc>) -> bool {
        if !self.include_past && event.start <= now {
            return false;
        }
        match &self.keyword {
            Some(keyword) => event.title.to_lowercase().contains(keyword),
            None => true,
        }
    }

    /// Keep matching events, in order
    pub fn apply(&self, events: Vec<CalendarEvent>, now: DateTime<Utc>) -> Vec<CalendarEvent> {
        events.into_iter().filter(|e| self.matches(e, now)).collect()
    }
}
