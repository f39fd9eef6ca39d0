use crate::error::{config_error, NotifierResult};
use chrono::{DateTime, Utc};
use std::fmt;
use url::Url;

/// Format of the start time inside an event identifier
const ID_TIME_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Calendar event as fetched from a feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    /// Stable identifier recorded in the event store
    pub id: String,
    pub uid: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Category used to pick a Discord role to mention
    pub role_tag: Option<String>,
}

impl CalendarEvent {
    pub fn new(
        uid: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        role_tag: Option<String>,
    ) -> Self {
        let uid = uid.into();
        Self {
            id: event_id(&uid, &start),
            uid,
            title: title.into(),
            start,
            end,
            role_tag,
        }
    }
}

/// Build the identifier of an occurrence: UID plus its UTC start time.
///
/// Recurring series and their overridden instances share one UID, so the
/// start time is needed to tell occurrences apart.
pub fn event_id(uid: &str, start: &DateTime<Utc>) -> String {
    format!("{}#{}", uid, start.format(ID_TIME_FORMAT))
}

/// A configured calendar feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub url: Url,
    /// Role tag applied to every event of this feed
    pub tag: Option<String>,
}

impl Feed {
    /// Parse one `ICAL_URL` entry, either `url` or `TAG=url`.
    ///
    /// `webcal://` subscriptions are fetched over HTTPS.
    pub fn parse(entry: &str) -> NotifierResult<Self> {
        let entry = entry.trim();

        let (tag, raw_url) = match entry.split_once('=') {
            Some((prefix, rest)) if is_tag(prefix) => {
                (Some(prefix.trim().to_uppercase()), rest.trim())
            }
            _ => (None, entry),
        };

        let raw_url = match raw_url.get(..9) {
            Some(scheme) if scheme.eq_ignore_ascii_case("webcal://") => {
                format!("https://{}", &raw_url[9..])
            }
            _ => raw_url.to_string(),
        };

        let url = Url::parse(&raw_url)
            .map_err(|e| config_error(&format!("Invalid feed URL '{}': {}", raw_url, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(config_error(&format!(
                "Unsupported feed URL scheme '{}' in '{}'",
                url.scheme(),
                raw_url
            )));
        }

        Ok(Self { url, tag })
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{} ({})", self.url, tag),
            None => write!(f, "{}", self.url),
        }
    }
}

/// Tags are short names like `DAS`; anything with URL punctuation is not one
fn is_tag(candidate: &str) -> bool {
    let candidate = candidate.trim();
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
