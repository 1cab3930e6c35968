//! Feed parsing using the icalendar crate's parser.
//!
//! Property, parameter and component names are matched case-insensitively.

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use icalendar::parser::{Component, Property, read_calendar, unfold};
use tracing::{debug, warn};

use crate::error::{CoreError, CoreResult};
use crate::event::{EventStatus, EventTime, Override, Recurrence, SourceEvent, push_override};

/// A VEVENT before overrides are attached to their master.
enum Entry {
    Master(SourceEvent),
    Override { uid: String, instance: Override },
}

/// Parse a whole calendar feed into source events.
///
/// The body must be an iCalendar stream, otherwise the feed is reported as
/// unavailable. Individual VEVENTs missing required data are logged and
/// skipped; when the stream as a whole does not parse, each VEVENT block is
/// read on its own so one broken entry does not hide the rest.
///
/// Overrides (RECURRENCE-ID) are attached to the master sharing their UID,
/// keeping the highest SEQUENCE per instance. An override of a single event
/// replaces it; an override without any master becomes a standalone event.
pub fn parse_feed(content: &str) -> CoreResult<Vec<SourceEvent>> {
    if !content.to_ascii_uppercase().contains("BEGIN:VCALENDAR") {
        return Err(CoreError::FeedUnavailable(
            "response is not an iCalendar stream".into(),
        ));
    }

    let unfolded = unfold(content);
    let entries: Vec<CoreResult<Entry>> = match read_calendar(&unfolded) {
        Ok(calendar) => {
            let mut vevents = Vec::new();
            collect_vevents(&calendar.components, &mut vevents);
            vevents.into_iter().map(parse_entry).collect()
        }
        Err(e) => {
            warn!("Feed does not parse as a whole, reading events one by one: {}", e);
            parse_blocks(&unfolded)?
        }
    };

    let mut masters: Vec<SourceEvent> = Vec::new();
    let mut pending: Vec<(String, Override)> = Vec::new();

    for (index, entry) in entries.into_iter().enumerate() {
        match entry {
            Ok(Entry::Master(event)) => masters.push(event),
            Ok(Entry::Override { uid, instance }) => pending.push((uid, instance)),
            Err(e) => warn!(entry = index, "Skipping feed entry: {}", e),
        }
    }

    // A recurring master takes precedence over a single one with the same UID
    let mut by_uid: HashMap<String, usize> = HashMap::new();
    for (i, event) in masters.iter().enumerate() {
        let keep = by_uid
            .get(&event.uid)
            .is_some_and(|&j| masters[j].is_recurring() || !event.is_recurring());
        if !keep {
            by_uid.insert(event.uid.clone(), i);
        }
    }

    let mut orphan_uids: Vec<String> = Vec::new();
    let mut orphans: HashMap<String, Vec<Override>> = HashMap::new();
    for (uid, instance) in pending {
        match by_uid.get(&uid) {
            Some(&i) => masters[i].add_override(instance),
            None => {
                if !orphans.contains_key(&uid) {
                    orphan_uids.push(uid.clone());
                }
                push_override(orphans.entry(uid).or_default(), instance);
            }
        }
    }

    for master in masters.iter_mut().filter(|m| !m.is_recurring()) {
        for instance in std::mem::take(&mut master.overrides) {
            master.apply_override(instance);
        }
    }

    for uid in orphan_uids {
        for instance in orphans.remove(&uid).unwrap_or_default() {
            if instance.cancelled {
                debug!(uid = %uid, "Dropping cancelled override without master");
            } else {
                masters.push(orphan_to_event(uid.clone(), instance));
            }
        }
    }

    Ok(masters)
}

/// Read each `BEGIN:VEVENT` .. `END:VEVENT` block separately. Blocks the
/// parser rejects become malformed entries; if none is readable the feed
/// is unavailable.
fn parse_blocks(unfolded: &str) -> CoreResult<Vec<CoreResult<Entry>>> {
    let mut entries = Vec::new();
    let mut readable = 0;

    for block in vevent_blocks(unfolded) {
        match read_calendar(&block) {
            Ok(calendar) => {
                readable += 1;
                let mut vevents = Vec::new();
                collect_vevents(&calendar.components, &mut vevents);
                entries.extend(vevents.into_iter().map(parse_entry));
            }
            Err(e) => entries.push(Err(CoreError::MalformedEntry(format!(
                "unreadable VEVENT: {}",
                e.lines().next().unwrap_or_default()
            )))),
        }
    }

    if readable == 0 {
        return Err(CoreError::FeedUnavailable(
            "could not parse any event in the feed".into(),
        ));
    }
    Ok(entries)
}

fn vevent_blocks(unfolded: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in unfolded.lines().map(|l| l.trim_end_matches('\r')) {
        if line.eq_ignore_ascii_case("BEGIN:VEVENT") {
            current = Some(vec![line]);
        } else if let Some(lines) = current.as_mut() {
            lines.push(line);
            if line.eq_ignore_ascii_case("END:VEVENT") {
                blocks.push(lines.join("\n"));
                current = None;
            }
        }
    }

    blocks
}

fn collect_vevents<'a>(components: &'a [Component<'a>], out: &mut Vec<&'a Component<'a>>) {
    for component in components {
        if component.name.as_str().eq_ignore_ascii_case("VEVENT") {
            out.push(component);
        } else {
            collect_vevents(&component.components, out);
        }
    }
}

fn parse_entry(vevent: &Component) -> CoreResult<Entry> {
    let uid = find_prop(vevent, "UID")
        .map(|p| p.val.to_string())
        .filter(|uid| !uid.trim().is_empty())
        .ok_or_else(|| CoreError::MalformedEntry("VEVENT has no UID".into()))?;

    let summary = text_prop(vevent, "SUMMARY");
    let description = text_prop(vevent, "DESCRIPTION");
    let location = text_prop(vevent, "LOCATION");
    let start = time_prop(vevent, "DTSTART");
    let end = time_prop(vevent, "DTEND");
    let duration = find_prop(vevent, "DURATION").and_then(|p| parse_duration(p.val.as_str()));

    let status = find_prop(vevent, "STATUS")
        .map(|p| match p.val.as_str().trim().to_ascii_uppercase().as_str() {
            "TENTATIVE" => EventStatus::Tentative,
            "CANCELLED" => EventStatus::Cancelled,
            _ => EventStatus::Confirmed,
        })
        .unwrap_or(EventStatus::Confirmed);

    // RECURRENCE-ID marks an instance override
    if let Some(recurrence_id) = time_prop(vevent, "RECURRENCE-ID") {
        let sequence = find_prop(vevent, "SEQUENCE")
            .and_then(|p| p.val.as_str().trim().parse().ok())
            .unwrap_or(0);

        return Ok(Entry::Override {
            uid,
            instance: Override {
                recurrence_id,
                summary,
                description,
                location,
                start,
                end,
                duration,
                cancelled: status == EventStatus::Cancelled,
                sequence,
            },
        });
    }

    let start = start.ok_or_else(|| {
        CoreError::MalformedEntry(format!("event '{}' has no DTSTART", uid))
    })?;

    let rrule = find_prop(vevent, "RRULE").map(|p| p.val.to_string());
    let recurrence = rrule.map(|rrule| Recurrence {
        rrule,
        exdates: date_list(vevent, "EXDATE"),
        rdates: date_list(vevent, "RDATE"),
    });

    Ok(Entry::Master(SourceEvent {
        uid,
        summary,
        description,
        location,
        start,
        end,
        duration,
        status,
        recurrence,
        overrides: Vec::new(),
    }))
}

fn orphan_to_event(uid: String, instance: Override) -> SourceEvent {
    SourceEvent {
        uid,
        summary: instance.summary,
        description: instance.description,
        location: instance.location,
        start: instance.start.unwrap_or(instance.recurrence_id),
        end: instance.end,
        duration: instance.duration,
        status: EventStatus::Confirmed,
        recurrence: None,
        overrides: Vec::new(),
    }
}

fn find_prop<'c>(vevent: &'c Component, name: &str) -> Option<&'c Property<'c>> {
    vevent
        .properties
        .iter()
        .find(|p| p.name.as_str().eq_ignore_ascii_case(name))
}

fn param<'p>(prop: &'p Property, key: &str) -> Option<&'p str> {
    prop.params
        .iter()
        .find(|p| p.key.as_str().eq_ignore_ascii_case(key))
        .and_then(|p| p.val.as_ref().map(|v| v.as_str()))
}

fn text_prop(vevent: &Component, name: &str) -> Option<String> {
    find_prop(vevent, name)
        .map(|p| unescape_text(p.val.as_str()))
        .filter(|s| !s.is_empty())
}

/// Single DATE or DATE-TIME value of a property such as DTSTART.
fn time_prop(vevent: &Component, name: &str) -> Option<EventTime> {
    find_prop(vevent, name).and_then(|p| parse_time_values(p).into_iter().next())
}

/// All values of a repeatable date-list property (EXDATE, RDATE).
fn date_list(vevent: &Component, name: &str) -> Vec<EventTime> {
    vevent
        .properties
        .iter()
        .filter(|p| p.name.as_str().eq_ignore_ascii_case(name))
        .flat_map(parse_time_values)
        .collect()
}

/// Parse a DATE / DATE-TIME property value into a list of EventTime values.
///
/// Handles:
/// - TZID parameter: `EXDATE;TZID=America/Sao_Paulo:20240108T100000`
/// - VALUE=DATE: `EXDATE;VALUE=DATE:20240108`
/// - UTC: `EXDATE:20240108T100000Z`
/// - Floating: `EXDATE:20240108T100000`
/// - Comma-separated values: `EXDATE;TZID=...:20240108T100000,20240115T100000`
fn parse_time_values(prop: &Property) -> Vec<EventTime> {
    let tzid = param(prop, "TZID").map(|v| v.trim_matches('"').to_string());
    let is_date = param(prop, "VALUE").is_some_and(|v| v.eq_ignore_ascii_case("DATE"));

    prop.val
        .as_str()
        .split(',')
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            // VALUE=PERIOD entries (RDATE only) are keyed by their start
            let s = s.split('/').next().unwrap_or(s);

            if is_date || s.len() == 8 {
                NaiveDate::parse_from_str(s, "%Y%m%d").ok().map(EventTime::Date)
            } else if let Some(s) = s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
                NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::DateTimeUtc(dt.and_utc()))
            } else if let Some(ref tz) = tzid {
                NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::DateTimeZoned {
                        datetime: dt,
                        tzid: tz.clone(),
                    })
            } else {
                NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(EventTime::DateTimeFloating)
            }
        })
        .collect()
}

/// Parse a DURATION value (P1D, PT30M, -PT5M). Negative durations are ignored.
fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.starts_with('-') {
        return None;
    }
    let duration = iso8601::duration(value.trim_start_matches('+')).ok()?;
    let std_duration: std::time::Duration = duration.into();
    Duration::from_std(std_duration).ok()
}

/// Undo RFC 5545 TEXT escaping.
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
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
