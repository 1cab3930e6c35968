//! RRULE enumeration for recurring feed events.
//!
//! Produces the raw instants a rule generates inside a window. Exceptions
//! and overrides are applied by the expander on canonical UTC instants, so
//! the textual form of EXDATE/RECURRENCE-ID values never matters.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use rrule::RRuleSet;
use tracing::warn;

use crate::constants::MAX_OCCURRENCES;
use crate::date_range::DateRange;
use crate::error::{CoreError, CoreResult};
use crate::event::{EventTime, Recurrence};

/// Build an iCalendar-format DTSTART/RRULE block for the rrule crate parser.
fn build_rrule_string(start: &EventTime, rrule: &str) -> String {
    // The rrule crate needs a datetime, so all-day dates become midnight UTC.
    // Zones unknown to chrono-tz fall back to their resolved UTC instant.
    let dtstart = match start {
        EventTime::Date(d) => format!("DTSTART:{}T000000Z", d.format("%Y%m%d")),
        EventTime::DateTimeUtc(dt) => format!("DTSTART:{}", dt.format("%Y%m%dT%H%M%SZ")),
        EventTime::DateTimeFloating(dt) => format!("DTSTART:{}Z", dt.format("%Y%m%dT%H%M%S")),
        EventTime::DateTimeZoned { datetime, tzid } => {
            let tzid = tzid.trim_matches('"');
            if tzid.parse::<chrono_tz::Tz>().is_ok() {
                format!("DTSTART;TZID={}:{}", tzid, datetime.format("%Y%m%dT%H%M%S"))
            } else {
                match start.to_utc() {
                    Some(dt) => format!("DTSTART:{}", dt.format("%Y%m%dT%H%M%SZ")),
                    None => format!("DTSTART:{}Z", datetime.format("%Y%m%dT%H%M%S")),
                }
            }
        }
    };

    format!("{}\nRRULE:{}", dtstart, normalize_rule(start, rrule))
}

/// Upper-case the rule and rewrite UNTIL as a UTC timestamp.
///
/// The rrule crate only accepts a UTC UNTIL next to a zoned DTSTART, while
/// feeds commonly write a DATE (all-day series) or a floating local time
/// (Exchange). Those are read in the series' own zone; a DATE covers its
/// whole day.
fn normalize_rule(start: &EventTime, rrule: &str) -> String {
    rrule
        .trim()
        .to_ascii_uppercase()
        .split(';')
        .map(|part| match part.split_once('=') {
            Some(("UNTIL", value)) => match until_utc(start, value) {
                Some(until) => format!("UNTIL={}", until.format("%Y%m%dT%H%M%SZ")),
                None => part.to_string(),
            },
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn until_utc(start: &EventTime, value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.ends_with('Z') {
        return None;
    }

    let local = if value.len() == 8 {
        NaiveDate::parse_from_str(value, "%Y%m%d").ok()?.and_hms_opt(23, 59, 59)?
    } else {
        NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?
    };

    let instant = match start {
        EventTime::DateTimeZoned { tzid, .. } => EventTime::DateTimeZoned {
            datetime: local,
            tzid: tzid.clone(),
        }
        .to_utc(),
        _ => None,
    };
    Some(instant.unwrap_or_else(|| local.and_utc()))
}

/// All instants of the series (RRULE plus RDATE) inside `range`, both ends
/// inclusive, sorted and without duplicates. EXDATEs are not applied here.
pub fn series_instants(
    uid: &str,
    start: &EventTime,
    recurrence: &Recurrence,
    range: &DateRange,
) -> CoreResult<Vec<DateTime<Utc>>> {
    let rrule_str = build_rrule_string(start, &recurrence.rrule);

    let rrule_set: RRuleSet = rrule_str.parse().map_err(|e| {
        CoreError::MalformedEntry(format!("Failed to parse RRULE for event '{}': {}", uid, e))
    })?;

    // Widen by a second on each side so both window bounds are included
    // whether or not the crate treats after/before as exclusive.
    let tz: rrule::Tz = Utc.into();
    let after = (range.start - Duration::seconds(1)).with_timezone(&tz);
    let before = (range.end + Duration::seconds(1)).with_timezone(&tz);

    let result = rrule_set.after(after).before(before).all(MAX_OCCURRENCES);
    if result.limited {
        warn!(
            uid = %uid,
            limit = MAX_OCCURRENCES,
            "Recurrence truncated; window holds more instances than the limit"
        );
    }

    let mut instants: Vec<DateTime<Utc>> = result
        .dates
        .iter()
        .map(|dt| dt.with_timezone(&Utc))
        .chain(recurrence.rdates.iter().filter_map(EventTime::to_utc))
        .filter(|dt| range.contains(*dt))
        .collect();

    instants.sort();
    instants.dedup();

    Ok(instants)
}
