//! Expansion of feed events into concrete occurrences within a window.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::date_range::DateRange;
use crate::error::{CoreError, CoreResult};
use crate::event::{EventStatus, EventTime, Override, Recurrence, SourceEvent};
use crate::occurrence::{Occurrence, Origin, UNTITLED};
use crate::recurrence::series_instants;

/// Expand `events` into the occurrences that intersect `range`.
///
/// - a single event is emitted once if `[start, end]` overlaps the range
/// - a recurring event emits one occurrence per generated instant in the
///   range, minus EXDATEs and instants replaced by an override
/// - each override emits itself if its own start is in the range
///
/// Entries that cannot be resolved are logged and skipped. Output follows
/// feed order and is not sorted.
pub fn expand(events: &[SourceEvent], range: &DateRange) -> Vec<Occurrence> {
    let mut occurrences = Vec::new();

    for event in events {
        match expand_event(event, range) {
            Ok(mut expanded) => occurrences.append(&mut expanded),
            Err(e) => warn!(uid = %event.uid, "Skipping feed entry: {}", e),
        }
    }

    debug!(
        events = events.len(),
        occurrences = occurrences.len(),
        "Expanded feed events"
    );

    occurrences
}

/// Validate the window, then [`expand`].
pub fn expand_window(
    events: &[SourceEvent],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> CoreResult<Vec<Occurrence>> {
    let range = DateRange::new(start, end)?;
    Ok(expand(events, &range))
}

fn expand_event(event: &SourceEvent, range: &DateRange) -> CoreResult<Vec<Occurrence>> {
    if event.status == EventStatus::Cancelled {
        return Ok(Vec::new());
    }

    let start = resolve(&event.uid, "DTSTART", &event.start)?;
    let duration = event.duration();

    match &event.recurrence {
        None => {
            let end = start + duration;
            if range.overlaps(start, end) {
                Ok(vec![from_template(event, start, end)])
            } else {
                Ok(Vec::new())
            }
        }
        Some(recurrence) => expand_series(event, recurrence, duration, range),
    }
}

fn expand_series(
    event: &SourceEvent,
    recurrence: &Recurrence,
    duration: Duration,
    range: &DateRange,
) -> CoreResult<Vec<Occurrence>> {
    let instants = series_instants(&event.uid, &event.start, recurrence, range)?;

    // Cancelled overrides behave like EXDATEs
    let cancelled: HashSet<DateTime<Utc>> = recurrence
        .exdates
        .iter()
        .chain(
            event
                .overrides
                .iter()
                .filter(|o| o.cancelled)
                .map(|o| &o.recurrence_id),
        )
        .filter_map(EventTime::to_utc)
        .collect();

    let overridden: HashSet<DateTime<Utc>> = event
        .overrides
        .iter()
        .filter(|o| !o.cancelled)
        .filter_map(|o| o.recurrence_id.to_utc())
        .collect();

    let mut occurrences: Vec<Occurrence> = instants
        .into_iter()
        .filter(|t| !cancelled.contains(t) && !overridden.contains(t))
        .map(|t| from_template(event, t, t + duration))
        .collect();

    for instance in event.overrides.iter().filter(|o| !o.cancelled) {
        match from_override(event, instance, duration) {
            Ok(occurrence) if range.contains(occurrence.start) => occurrences.push(occurrence),
            Ok(_) => {}
            Err(e) => warn!(uid = %event.uid, "Skipping override: {}", e),
        }
    }

    Ok(occurrences)
}

fn from_template(event: &SourceEvent, start: DateTime<Utc>, end: DateTime<Utc>) -> Occurrence {
    Occurrence {
        id: Occurrence::feed_id(&event.uid, start),
        title: event.summary.clone().unwrap_or_else(|| UNTITLED.to_string()),
        description: event.description.clone(),
        location: event.location.clone(),
        start,
        end,
        all_day: event.is_all_day(),
        origin: Origin::Feed,
    }
}

fn from_override(
    event: &SourceEvent,
    instance: &Override,
    template_duration: Duration,
) -> CoreResult<Occurrence> {
    let start_time = instance.start.as_ref().unwrap_or(&instance.recurrence_id);
    let start = resolve(&event.uid, "override start", start_time)?;

    let end = match &instance.end {
        Some(end) => resolve(&event.uid, "override end", end)?.max(start),
        None => start + instance.duration.unwrap_or(template_duration),
    };

    Ok(Occurrence {
        id: Occurrence::feed_id(&event.uid, start),
        title: instance
            .summary
            .clone()
            .or_else(|| event.summary.clone())
            .unwrap_or_else(|| UNTITLED.to_string()),
        description: instance
            .description
            .clone()
            .or_else(|| event.description.clone()),
        location: instance.location.clone().or_else(|| event.location.clone()),
        start,
        end,
        all_day: start_time.is_date(),
        origin: Origin::Feed,
    })
}

fn resolve(uid: &str, what: &str, time: &EventTime) -> CoreResult<DateTime<Utc>> {
    time.to_utc().ok_or_else(|| {
        CoreError::MalformedEntry(format!("event '{}' has an unresolvable {} ({})", uid, what, time))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ics::parse_feed;
    use chrono::{NaiveDate, TimeZone};

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn single(uid: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> SourceEvent {
        SourceEvent {
            uid: uid.to_string(),
            summary: Some(uid.to_string()),
            description: None,
            location: None,
            start: EventTime::DateTimeUtc(start),
            end: Some(EventTime::DateTimeUtc(end)),
            duration: None,
            status: EventStatus::Confirmed,
            recurrence: None,
            overrides: vec![],
        }
    }

    fn daily(uid: &str, start: DateTime<Utc>, minutes: i64) -> SourceEvent {
        SourceEvent {
            recurrence: Some(Recurrence {
                rrule: "FREQ=DAILY".to_string(),
                exdates: vec![],
                rdates: vec![],
            }),
            ..single(uid, start, start + Duration::minutes(minutes))
        }
    }

    fn instance(key: DateTime<Utc>) -> Override {
        Override {
            recurrence_id: EventTime::DateTimeUtc(key),
            summary: None,
            description: None,
            location: None,
            start: None,
            end: None,
            duration: None,
            cancelled: false,
            sequence: 0,
        }
    }

    #[test]
    fn single_events_appear_iff_they_overlap_window() {
        let range = DateRange::new(utc(2024, 1, 10, 0, 0), utc(2024, 1, 20, 0, 0)).unwrap();
        let events = vec![
            single("before", utc(2024, 1, 1, 9, 0), utc(2024, 1, 1, 10, 0)),
            single("straddles-start", utc(2024, 1, 9, 22, 0), utc(2024, 1, 10, 2, 0)),
            single("inside", utc(2024, 1, 15, 9, 0), utc(2024, 1, 15, 10, 0)),
            single("ends-at-start", utc(2024, 1, 9, 23, 0), utc(2024, 1, 10, 0, 0)),
            single("starts-at-end", utc(2024, 1, 20, 0, 0), utc(2024, 1, 20, 1, 0)),
            single("after", utc(2024, 1, 21, 9, 0), utc(2024, 1, 21, 10, 0)),
        ];

        let titles: Vec<String> = expand(&events, &range).into_iter().map(|o| o.title).collect();

        assert_eq!(
            titles,
            vec!["straddles-start", "inside", "ends-at-start", "starts-at-end"]
        );
    }

    #[test]
    fn daily_rule_over_seven_days_yields_seven_instances() {
        let range = DateRange::new(utc(2024, 1, 1, 9, 0), utc(2024, 1, 7, 9, 0)).unwrap();
        let occurrences = expand(&[daily("standup", utc(2024, 1, 1, 9, 0), 30)], &range);

        assert_eq!(occurrences.len(), 7);
        for pair in occurrences.windows(2) {
            assert_eq!(pair[1].start - pair[0].start, Duration::days(1));
        }
        for o in &occurrences {
            assert_eq!(o.end - o.start, Duration::minutes(30));
            assert_eq!(o.origin, Origin::Feed);
        }
    }

    #[test]
    fn exception_removes_only_that_instance() {
        let mut event = daily("standup", utc(2024, 1, 1, 9, 0), 30);
        if let Some(rec) = event.recurrence.as_mut() {
            rec.exdates.push(EventTime::DateTimeUtc(utc(2024, 1, 3, 9, 0)));
        }
        let range = DateRange::new(utc(2024, 1, 1, 0, 0), utc(2024, 1, 5, 23, 59)).unwrap();

        let starts: Vec<_> = expand(&[event], &range).into_iter().map(|o| o.start).collect();

        assert_eq!(
            starts,
            vec![
                utc(2024, 1, 1, 9, 0),
                utc(2024, 1, 2, 9, 0),
                utc(2024, 1, 4, 9, 0),
                utc(2024, 1, 5, 9, 0)
            ]
        );
    }

    #[test]
    fn exception_in_another_zone_matches_same_instant() {
        let mut event = daily("standup", utc(2024, 1, 1, 15, 0), 30);
        if let Some(rec) = event.recurrence.as_mut() {
            rec.exdates.push(EventTime::DateTimeZoned {
                datetime: NaiveDate::from_ymd_opt(2024, 1, 2)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap(),
                tzid: "America/New_York".to_string(),
            });
        }
        let range = DateRange::new(utc(2024, 1, 1, 0, 0), utc(2024, 1, 3, 23, 59)).unwrap();

        let starts: Vec<_> = expand(&[event], &range).into_iter().map(|o| o.start).collect();

        assert_eq!(starts, vec![utc(2024, 1, 1, 15, 0), utc(2024, 1, 3, 15, 0)]);
    }

    #[test]
    fn override_replaces_instance_without_duplicate() {
        let mut event = daily("standup", utc(2024, 1, 1, 9, 0), 30);
        event.overrides.push(Override {
            summary: Some("Standup (Demo)".to_string()),
            ..instance(utc(2024, 1, 2, 9, 0))
        });
        let range = DateRange::new(utc(2024, 1, 1, 0, 0), utc(2024, 1, 3, 23, 59)).unwrap();

        let occurrences = expand(&[event], &range);
        let on_jan_2: Vec<_> = occurrences
            .iter()
            .filter(|o| o.start.date_naive() == NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .collect();

        assert_eq!(occurrences.len(), 3);
        assert_eq!(on_jan_2.len(), 1);
        assert_eq!(on_jan_2[0].title, "Standup (Demo)");
        // Override without its own end keeps the template duration
        assert_eq!(on_jan_2[0].end - on_jan_2[0].start, Duration::minutes(30));
    }

    #[test]
    fn rescheduled_override_uses_its_own_time() {
        let mut event = daily("standup", utc(2024, 1, 1, 9, 0), 30);
        // Moved from the 3rd to the evening of the 4th, off the daily cadence
        event.overrides.push(Override {
            start: Some(EventTime::DateTimeUtc(utc(2024, 1, 4, 18, 0))),
            ..instance(utc(2024, 1, 3, 9, 0))
        });
        let range = DateRange::new(utc(2024, 1, 1, 0, 0), utc(2024, 1, 4, 23, 59)).unwrap();

        let starts: Vec<_> = expand(&[event], &range).into_iter().map(|o| o.start).collect();

        assert_eq!(starts.len(), 4);
        assert!(starts.contains(&utc(2024, 1, 4, 18, 0)));
        assert!(!starts.contains(&utc(2024, 1, 3, 9, 0)));
    }

    #[test]
    fn override_moved_into_window_is_included() {
        let mut event = daily("standup", utc(2024, 1, 1, 9, 0), 30);
        // Original instance on the 20th, moved back into the window
        event.overrides.push(Override {
            start: Some(EventTime::DateTimeUtc(utc(2024, 1, 2, 14, 0))),
            ..instance(utc(2024, 1, 20, 9, 0))
        });
        let range = DateRange::new(utc(2024, 1, 1, 0, 0), utc(2024, 1, 2, 23, 59)).unwrap();

        let starts: Vec<_> = expand(&[event], &range).into_iter().map(|o| o.start).collect();

        assert_eq!(
            starts,
            vec![utc(2024, 1, 1, 9, 0), utc(2024, 1, 2, 9, 0), utc(2024, 1, 2, 14, 0)]
        );
    }

    #[test]
    fn cancelled_override_suppresses_instance() {
        let mut event = daily("standup", utc(2024, 1, 1, 9, 0), 30);
        event.overrides.push(Override {
            cancelled: true,
            ..instance(utc(2024, 1, 2, 9, 0))
        });
        let range = DateRange::new(utc(2024, 1, 1, 0, 0), utc(2024, 1, 3, 23, 59)).unwrap();

        assert_eq!(expand(&[event], &range).len(), 2);
    }

    #[test]
    fn unresolvable_entry_is_skipped_and_others_survive() {
        let broken = SourceEvent {
            start: EventTime::DateTimeZoned {
                datetime: NaiveDate::from_ymd_opt(2024, 1, 2)
                    .unwrap()
                    .and_hms_opt(10, 0, 0)
                    .unwrap(),
                tzid: "Not/AZone".to_string(),
            },
            ..single("broken", utc(2024, 1, 2, 10, 0), utc(2024, 1, 2, 11, 0))
        };
        let events = vec![
            single("a", utc(2024, 1, 2, 9, 0), utc(2024, 1, 2, 10, 0)),
            broken,
            single("b", utc(2024, 1, 3, 9, 0), utc(2024, 1, 3, 10, 0)),
        ];
        let range = DateRange::new(utc(2024, 1, 1, 0, 0), utc(2024, 1, 5, 0, 0)).unwrap();

        assert_eq!(expand(&events, &range).len(), 2);
    }

    #[test]
    fn feed_with_entry_missing_start_yields_valid_entries_only() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:entrega-1
SUMMARY:Entrega parcial
DTSTART:20240304T120000Z
DTEND:20240304T130000Z
END:VEVENT
BEGIN:VEVENT
UID:sem-data
SUMMARY:Sem data
END:VEVENT
BEGIN:VEVENT
UID:entrega-2
SUMMARY:Entrega final
DTSTART:20240610T120000Z
END:VEVENT
END:VCALENDAR"#;

        let events = parse_feed(ics).expect("Should parse");
        let range = DateRange::new(utc(2024, 1, 1, 0, 0), utc(2024, 12, 31, 0, 0)).unwrap();

        assert_eq!(expand(&events, &range).len(), 2);
    }

    #[test]
    fn standup_scenario() {
        let ics = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//GameFy//EN\r\n\
BEGIN:VEVENT\r\n\
UID:standup@gamefy\r\n\
SUMMARY:Standup\r\n\
DTSTART:20240101T090000Z\r\n\
DTEND:20240101T093000Z\r\n\
RRULE:FREQ=DAILY\r\n\
EXDATE:20240103T090000Z\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:standup@gamefy\r\n\
RECURRENCE-ID:20240105T090000Z\r\n\
SUMMARY:Standup (Remote)\r\n\
DTSTART:20240105T100000Z\r\n\
DTEND:20240105T103000Z\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

        let events = parse_feed(ics).expect("Should parse");
        let occurrences = expand_window(
            &events,
            utc(2024, 1, 1, 0, 0),
            Utc.with_ymd_and_hms(2024, 1, 7, 23, 59, 59).unwrap(),
        )
        .expect("Window is valid");

        assert_eq!(occurrences.len(), 6);
        assert!(occurrences.iter().all(|o| o.start != utc(2024, 1, 3, 9, 0)));

        let jan_5: Vec<_> = occurrences
            .iter()
            .filter(|o| o.start.date_naive() == NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
            .collect();
        assert_eq!(jan_5.len(), 1);
        assert_eq!(jan_5[0].title, "Standup (Remote)");
        assert_eq!(jan_5[0].start, utc(2024, 1, 5, 10, 0));
        assert_eq!(jan_5[0].id, "standup@gamefy_20240105T100000Z");
    }

    #[test]
    fn all_day_series_keeps_all_day_flag() {
        let event = SourceEvent {
            uid: "plantao".to_string(),
            summary: Some("Plantão de dúvidas".to_string()),
            description: None,
            location: None,
            start: EventTime::Date(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()),
            end: Some(EventTime::Date(NaiveDate::from_ymd_opt(2024, 4, 2).unwrap())),
            duration: None,
            status: EventStatus::Confirmed,
            recurrence: Some(Recurrence {
                rrule: "FREQ=WEEKLY;COUNT=3".to_string(),
                exdates: vec![],
                rdates: vec![],
            }),
            overrides: vec![],
        };
        let range = DateRange::new(utc(2024, 3, 1, 0, 0), utc(2024, 5, 1, 0, 0)).unwrap();

        let occurrences = expand(&[event], &range);

        assert_eq!(occurrences.len(), 3);
        assert!(occurrences.iter().all(|o| o.all_day));
        assert_eq!(occurrences[1].start, utc(2024, 4, 8, 0, 0));
        assert_eq!(occurrences[1].end, utc(2024, 4, 9, 0, 0));
    }

    #[test]
    fn count_is_consumed_before_a_later_window() {
        let mut event = daily("plantao", utc(2024, 1, 1, 9, 0), 60);
        if let Some(rec) = event.recurrence.as_mut() {
            rec.rrule = "FREQ=DAILY;COUNT=5".to_string();
        }
        let range = DateRange::new(utc(2024, 1, 3, 0, 0), utc(2024, 1, 31, 0, 0)).unwrap();

        let starts: Vec<_> = expand(&[event], &range).into_iter().map(|o| o.start).collect();

        assert_eq!(
            starts,
            vec![utc(2024, 1, 3, 9, 0), utc(2024, 1, 4, 9, 0), utc(2024, 1, 5, 9, 0)]
        );
    }

    #[test]
    fn all_day_series_with_date_until_exception_and_override() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:monitoria
SUMMARY:Monitoria
DTSTART;VALUE=DATE:20240401
DTEND;VALUE=DATE:20240402
RRULE:FREQ=WEEKLY;UNTIL=20240422
EXDATE;VALUE=DATE:20240408
END:VEVENT
BEGIN:VEVENT
UID:monitoria
RECURRENCE-ID;VALUE=DATE:20240415
SUMMARY:Monitoria (revisão)
DTSTART;VALUE=DATE:20240416
DTEND;VALUE=DATE:20240417
END:VEVENT
END:VCALENDAR"#;

        let events = parse_feed(ics).expect("Should parse");
        let range = DateRange::new(utc(2024, 3, 1, 0, 0), utc(2024, 5, 31, 0, 0)).unwrap();

        let occurrences = expand(&events, &range);
        let mut starts: Vec<_> = occurrences.iter().map(|o| (o.start, o.title.as_str())).collect();
        starts.sort();

        assert_eq!(
            starts,
            vec![
                (utc(2024, 4, 1, 0, 0), "Monitoria"),
                (utc(2024, 4, 16, 0, 0), "Monitoria (revisão)"),
                (utc(2024, 4, 22, 0, 0), "Monitoria"),
            ]
        );
        assert!(occurrences.iter().all(|o| o.all_day));
    }

    #[test]
    fn zoned_series_with_floating_until() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:aula-calculo
SUMMARY:Cálculo
DTSTART;TZID=America/Sao_Paulo:20240101T190000
DTEND;TZID=America/Sao_Paulo:20240101T210000
RRULE:FREQ=WEEKLY;UNTIL=20240122T190000
END:VEVENT
END:VCALENDAR"#;

        let events = parse_feed(ics).expect("Should parse");
        let range = DateRange::new(utc(2024, 1, 1, 0, 0), utc(2024, 3, 1, 0, 0)).unwrap();

        let occurrences = expand(&events, &range);

        assert_eq!(occurrences.len(), 4);
        assert_eq!(occurrences[0].start, utc(2024, 1, 1, 22, 0));
        assert_eq!(occurrences[0].end, utc(2024, 1, 2, 0, 0));
    }

    #[test]
    fn republished_override_yields_one_occurrence() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:s
SUMMARY:S
DTSTART:20240101T090000Z
RRULE:FREQ=DAILY;COUNT=3
END:VEVENT
BEGIN:VEVENT
UID:s
RECURRENCE-ID:20240102T090000Z
SEQUENCE:1
SUMMARY:S v1
DTSTART:20240102T090000Z
END:VEVENT
BEGIN:VEVENT
UID:s
RECURRENCE-ID:20240102T090000Z
SEQUENCE:2
SUMMARY:S v2
DTSTART:20240102T090000Z
END:VEVENT
END:VCALENDAR"#;

        let events = parse_feed(ics).expect("Should parse");
        let range = DateRange::new(utc(2024, 1, 1, 0, 0), utc(2024, 1, 31, 0, 0)).unwrap();

        let titles: Vec<String> = expand(&events, &range).into_iter().map(|o| o.title).collect();

        assert_eq!(titles, vec!["S", "S", "S v2"]);
    }

    #[test]
    fn moved_single_event_appears_once() {
        let ics = r#"BEGIN:VCALENDAR
VERSION:2.0
PRODID:TEST
BEGIN:VEVENT
UID:n
SUMMARY:Single
DTSTART:20240301T100000Z
DTEND:20240301T110000Z
END:VEVENT
BEGIN:VEVENT
UID:n
RECURRENCE-ID:20240301T100000Z
SUMMARY:Single moved
DTSTART:20240301T120000Z
DTEND:20240301T130000Z
END:VEVENT
END:VCALENDAR"#;

        let events = parse_feed(ics).expect("Should parse");
        let range = DateRange::new(utc(2024, 3, 1, 0, 0), utc(2024, 3, 2, 0, 0)).unwrap();

        let occurrences = expand(&events, &range);

        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].title, "Single moved");
        assert_eq!(occurrences[0].start, utc(2024, 3, 1, 12, 0));
    }

    #[test]
    fn inverted_window_is_rejected() {
        let err = expand_window(&[], utc(2024, 2, 1, 0, 0), utc(2024, 1, 1, 0, 0)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidWindow { .. }));
    }
}
