use super::models::CalendarEvent;
use std::collections::HashSet;

/// Events whose identifier has not been notified yet, in fetch order.
///
/// `known` is only read. If a calendar reuses an identifier for a different
/// event, that event is treated as already sent.
///
/// Records written before identifiers carried the start time hold a bare
/// UID. Such a line covers every occurrence of that UID.
pub fn diff(fetched: &[CalendarEvent], known: &HashSet<String>) -> Vec<CalendarEvent> {
    fetched
        .iter()
        .filter(|event| !known.contains(&event.id) && !known.contains(&event.uid))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(uid: &str) -> CalendarEvent {
        let start = Utc.with_ymd_and_hms(2030, 1, 1, 9, 0, 0).unwrap();
        CalendarEvent::new(uid, format!("Event {}", uid), start, start, None)
    }

    fn ids(events: &[CalendarEvent]) -> Vec<&str> {
        events.iter().map(|e| e.uid.as_str()).collect()
    }

    #[test]
    fn test_everything_is_new_for_empty_store() {
        let fetched = vec![event("e1")];
        let new_events = diff(&fetched, &HashSet::new());
        assert_eq!(new_events, fetched);
    }

    #[test]
    fn test_known_events_are_filtered_out() {
        let e1 = event("e1");
        let known = HashSet::from([e1.id.clone()]);
        let fetched = vec![e1, event("e2")];

        assert_eq!(ids(&diff(&fetched, &known)), vec!["e2"]);
    }

    #[test]
    fn test_fetch_order_is_preserved() {
        let fetched = vec![event("c"), event("a"), event("d"), event("b")];
        let known = HashSet::from([fetched[2].id.clone()]);

        assert_eq!(ids(&diff(&fetched, &known)), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_diff_is_repeatable_and_leaves_known_untouched() {
        let fetched = vec![event("e1"), event("e2"), event("e3")];
        let known = HashSet::from([fetched[1].id.clone()]);
        let before = known.clone();

        let first = diff(&fetched, &known);
        let second = diff(&fetched, &known);

        assert_eq!(first, second);
        assert_eq!(known, before);
    }

    #[test]
    fn test_bare_uid_record_covers_its_occurrences() {
        let later = Utc.with_ymd_and_hms(2030, 1, 8, 9, 0, 0).unwrap();
        let fetched = vec![
            event("e1"),
            CalendarEvent::new("e1", "Event e1", later, later, None),
            event("e2"),
        ];
        let known = HashSet::from(["e1".to_string()]);

        assert_eq!(ids(&diff(&fetched, &known)), vec!["e2"]);
    }
}
