//! Turning iCalendar text into [`CalendarEvent`]s.

use super::models::CalendarEvent;
use crate::error::{feed_error, NotifierResult};
use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use icalendar::parser::{read_calendar, unfold, Component};
use icalendar::{CalendarDateTime, DatePerhapsTime};
use tracing::{debug, warn};

/// Parse a whole feed body.
///
/// Events that cannot be interpreted (no UID, no usable DTSTART) are logged
/// and skipped so one bad entry does not hide the rest of the feed.
pub fn parse_feed(
    content: &str,
    feed_tag: Option<&str>,
    fallback_tz: Tz,
) -> NotifierResult<Vec<CalendarEvent>> {
    let content = content.trim_start_matches('\u{feff}').trim_start();
    if !content
        .get(..15)
        .is_some_and(|head| head.eq_ignore_ascii_case("BEGIN:VCALENDAR"))
    {
        return Err(feed_error("Response is not an iCalendar document"));
    }

    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded)
        .map_err(|e| feed_error(&format!("Failed to parse iCalendar data: {}", e)))?;

    let mut vevents = Vec::new();
    for component in &calendar.components {
        collect_vevents(component, &mut vevents);
    }

    let mut events = Vec::with_capacity(vevents.len());
    for vevent in vevents {
        if is_cancelled(vevent) {
            let uid = vevent.find_prop("UID").map(|p| p.val.to_string());
            debug!("Skipping cancelled event {:?}", uid);
            continue;
        }
        match parse_event(vevent, feed_tag, fallback_tz) {
            Ok(event) => events.push(event),
            Err(reason) => warn!("Skipping unreadable event: {}", reason),
        }
    }

    Ok(events)
}

fn collect_vevents<'c, 'a>(component: &'c Component<'a>, out: &mut Vec<&'c Component<'a>>) {
    if component.name == "VEVENT" {
        out.push(component);
    }
    for child in &component.components {
        collect_vevents(child, out);
    }
}

fn is_cancelled(vevent: &Component<'_>) -> bool {
    vevent
        .find_prop("STATUS")
        .map(|p| p.val.as_ref().eq_ignore_ascii_case("CANCELLED"))
        .unwrap_or(false)
}

fn parse_event(
    vevent: &Component<'_>,
    feed_tag: Option<&str>,
    fallback_tz: Tz,
) -> Result<CalendarEvent, String> {
    let uid = vevent
        .find_prop("UID")
        .map(|p| p.val.as_ref().trim().to_string())
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| "missing UID".to_string())?;

    let title = vevent
        .find_prop("SUMMARY")
        .map(|p| unescape_text(p.val.as_ref()))
        .unwrap_or_else(|| "(No title)".to_string());

    let dtstart = vevent
        .find_prop("DTSTART")
        .ok_or_else(|| format!("event {} has no DTSTART", uid))?;
    let dtstart = DatePerhapsTime::try_from(dtstart)
        .map_err(|_| format!("event {} has an unreadable DTSTART", uid))?;
    let all_day = matches!(dtstart, DatePerhapsTime::Date(_));
    let start = to_utc(dtstart, fallback_tz)
        .ok_or_else(|| format!("event {} starts at a time that does not exist", uid))?;

    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .and_then(|dt| to_utc(dt, fallback_tz))
        .unwrap_or_else(|| if all_day { start + Duration::days(1) } else { start });

    let role_tag = feed_tag.map(str::to_string).or_else(|| first_category(vevent));

    Ok(CalendarEvent::new(uid, title, start, end, role_tag))
}

/// Resolve an iCalendar time to UTC.
///
/// Date-only values are taken at midnight UTC. Floating times and unknown
/// TZIDs are read in `fallback_tz`.
pub fn to_utc(value: DatePerhapsTime, fallback_tz: Tz) -> Option<DateTime<Utc>> {
    match value {
        DatePerhapsTime::Date(date) => Some(date.and_hms_opt(0, 0, 0)?.and_utc()),
        DatePerhapsTime::DateTime(CalendarDateTime::Utc(dt)) => Some(dt),
        DatePerhapsTime::DateTime(CalendarDateTime::Floating(naive)) => fallback_tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
        DatePerhapsTime::DateTime(CalendarDateTime::WithTimezone { date_time, tzid }) => {
            let tz = tzid.parse::<Tz>().unwrap_or_else(|_| {
                warn!("Unknown TZID '{}', using {}", tzid, fallback_tz);
                fallback_tz
            });
            tz.from_local_datetime(&date_time)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
        }
    }
}

fn first_category(vevent: &Component<'_>) -> Option<String> {
    vevent
        .properties
        .iter()
        .filter(|p| p.name == "CATEGORIES")
        .flat_map(|p| p.val.as_ref().split(','))
        .map(|c| unescape_text(c).trim().to_uppercase())
        .find(|c| !c.is_empty())
}

/// Undo RFC 5545 TEXT escaping
fn unescape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
