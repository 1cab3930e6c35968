//! Feed-side event types.
//!
//! These are re-derived from the upstream ICS feed on every fetch and never
//! persisted. A `SourceEvent` is either a single event or the template of a
//! recurring series together with its exceptions and overrides.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// An iCalendar DATE or DATE-TIME value, kept in the form the feed used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTime {
    Date(NaiveDate),
    DateTimeUtc(DateTime<Utc>),
    DateTimeFloating(NaiveDateTime),
    DateTimeZoned { datetime: NaiveDateTime, tzid: String },
}

impl EventTime {
    /// Canonical instant for this value.
    ///
    /// Dates map to midnight UTC and floating times are read as UTC. Zoned
    /// times go through the tz database; an unknown TZID or a local time that
    /// does not exist (DST gap) yields `None`.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            EventTime::Date(d) => d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
            EventTime::DateTimeUtc(dt) => Some(*dt),
            EventTime::DateTimeFloating(dt) => Some(dt.and_utc()),
            EventTime::DateTimeZoned { datetime, tzid } => {
                let tz: chrono_tz::Tz = tzid.trim_matches('"').parse().ok()?;
                tz.from_local_datetime(datetime)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
            }
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, EventTime::Date(_))
    }

    /// Whether both values name the same instant. Values without an
    /// instant (unknown TZID) only match themselves.
    pub fn same_instant(&self, other: &EventTime) -> bool {
        match (self.to_utc(), other.to_utc()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            EventTime::DateTimeFloating(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M")),
            EventTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} ({})", datetime.format("%Y-%m-%d %H:%M"), tzid)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Confirmed,
    Tentative,
    Cancelled,
}

/// RRULE plus the explicit additions and removals of a recurring series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recurrence {
    /// The RRULE value without the `RRULE:` prefix, e.g. `FREQ=DAILY;COUNT=5`
    pub rrule: String,
    pub exdates: Vec<EventTime>,
    pub rdates: Vec<EventTime>,
}

/// Replacement for one instance of a recurring series (a VEVENT carrying RECURRENCE-ID).
///
/// Every field except the key is optional; missing values fall back to the
/// template when the instance is emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    /// Original start of the replaced instance
    pub recurrence_id: EventTime,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<EventTime>,
    pub end: Option<EventTime>,
    pub duration: Option<Duration>,
    /// STATUS:CANCELLED on the override removes the instance entirely
    pub cancelled: bool,
    /// SEQUENCE revision; a re-published override carries a higher one
    pub sequence: u32,
}

impl Override {
    /// Whether this override should replace `other` for the same instance.
    /// Higher SEQUENCE wins; on a tie the later entry wins.
    fn supersedes(&self, other: &Override) -> bool {
        self.sequence >= other.sequence
    }
}

/// Add `instance` to `overrides`, keeping one override per instance.
pub fn push_override(overrides: &mut Vec<Override>, instance: Override) {
    match overrides
        .iter_mut()
        .find(|o| o.recurrence_id.same_instant(&instance.recurrence_id))
    {
        Some(existing) if instance.supersedes(existing) => *existing = instance,
        Some(_) => {}
        None => overrides.push(instance),
    }
}

/// One declared event from the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEvent {
    pub uid: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: EventTime,
    pub end: Option<EventTime>,
    /// DURATION property, only consulted when DTEND is absent
    pub duration: Option<Duration>,
    pub status: EventStatus,
    pub recurrence: Option<Recurrence>,
    pub overrides: Vec<Override>,
}

impl SourceEvent {
    pub fn is_all_day(&self) -> bool {
        self.start.is_date()
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Length of the event (DTEND - DTSTART, else DURATION).
    ///
    /// All-day events without either last one day; timed events without
    /// either are instantaneous.
    pub fn duration(&self) -> Duration {
        let from_end = self
            .end
            .as_ref()
            .and_then(EventTime::to_utc)
            .zip(self.start.to_utc())
            .map(|(end, start)| end - start);

        match (from_end, self.duration) {
            (Some(d), _) => d.max(Duration::zero()),
            (None, Some(d)) => d,
            (None, None) if self.is_all_day() => Duration::days(1),
            (None, None) => Duration::zero(),
        }
    }

    pub fn add_override(&mut self, instance: Override) {
        push_override(&mut self.overrides, instance);
    }

    /// Fold an override into a non-recurring event, which has only the one
    /// instance to replace. Unset fields keep the event's own values.
    pub fn apply_override(&mut self, instance: Override) {
        if instance.cancelled {
            self.status = EventStatus::Cancelled;
            return;
        }

        let duration = self.duration();
        self.start = instance.start.unwrap_or(instance.recurrence_id);
        match (instance.end, instance.duration) {
            (Some(end), _) => {
                self.end = Some(end);
                self.duration = None;
            }
            (None, Some(d)) => {
                self.end = None;
                self.duration = Some(d);
            }
            (None, None) => {
                self.end = None;
                self.duration = Some(duration);
            }
        }

        if instance.summary.is_some() {
            self.summary = instance.summary;
        }
        if instance.description.is_some() {
            self.description = instance.description;
        }
        if instance.location.is_some() {
            self.location = instance.location;
        }
    }
}
