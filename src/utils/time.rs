use crate::error::{config_error, NotifierResult};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Date and time shown in notifications
const DATE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";
const TIME_FORMAT: &str = "%H:%M";

/// Parse an IANA timezone name such as `Europe/Paris`
pub fn parse_timezone(name: &str) -> NotifierResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|e| config_error(&format!("Invalid timezone '{}': {}", name, e)))
}

/// Format a single instant in `tz`
pub fn format_date_time(time: &DateTime<Utc>, tz: Tz) -> String {
    time.with_timezone(&tz).format(DATE_TIME_FORMAT).to_string()
}

/// Format a start/end pair in `tz`.
///
/// The end date is left out when both ends fall on the same local day, and
/// the end is left out entirely when it equals the start.
pub fn format_time_span(start: &DateTime<Utc>, end: &DateTime<Utc>, tz: Tz) -> String {
    let local_start = start.with_timezone(&tz);
    let local_end = end.with_timezone(&tz);

    if end <= start {
        format_date_time(start, tz)
    } else if local_start.date_naive() == local_end.date_naive() {
        format!(
            "{} - {}",
            local_start.format(DATE_TIME_FORMAT),
            local_end.format(TIME_FORMAT)
        )
    } else {
        format!(
            "{} - {}",
            local_start.format(DATE_TIME_FORMAT),
            local_end.format(DATE_TIME_FORMAT)
        )
    }
}
