//! Date window for calendar queries.

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::constants::{DEFAULT_FUTURE_DAYS, DEFAULT_PAST_DAYS, MAX_WINDOW_DAYS};
use crate::error::{CoreError, CoreResult};

/// Closed window `[start, end]`. Construction guarantees `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> CoreResult<Self> {
        if end < start {
            return Err(CoreError::InvalidWindow { start, end });
        }
        Ok(DateRange { start, end })
    }

    /// Window of `past_days` before `now` to `future_days` after it.
    /// Offsets are clamped to `0..=MAX_WINDOW_DAYS`.
    pub fn around(now: DateTime<Utc>, past_days: i64, future_days: i64) -> Self {
        let past = Duration::days(past_days.clamp(0, MAX_WINDOW_DAYS));
        let future = Duration::days(future_days.clamp(0, MAX_WINDOW_DAYS));
        DateRange {
            start: now.checked_sub_signed(past).unwrap_or(DateTime::<Utc>::MIN_UTC),
            end: now.checked_add_signed(future).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Build a range from optional user-supplied bounds.
    /// - each bound is RFC 3339 or YYYY-MM-DD
    /// - a date-only `start` means 00:00:00, a date-only `end` means 23:59:59
    /// - a missing bound falls back to `defaults`
    pub fn from_args(
        start: Option<&str>,
        end: Option<&str>,
        defaults: &DateRange,
    ) -> CoreResult<Self> {
        let start = match start {
            Some(s) => parse_bound(s, BoundKind::Start)?,
            None => defaults.start,
        };
        let end = match end {
            Some(s) => parse_bound(s, BoundKind::End)?,
            None => defaults.end,
        };

        DateRange::new(start, end)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// Whether `[start, end]` intersects this window (both ends inclusive).
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        end >= self.start && start <= self.end
    }
}

impl Default for DateRange {
    /// 30 days back to 90 days ahead of now
    fn default() -> Self {
        DateRange::around(Utc::now(), DEFAULT_PAST_DAYS, DEFAULT_FUTURE_DAYS)
    }
}

#[derive(Clone, Copy)]
enum BoundKind {
    Start,
    End,
}

fn parse_bound(s: &str, kind: BoundKind) -> CoreResult<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
        CoreError::Config(format!(
            "Invalid date '{}'. Expected YYYY-MM-DD or an RFC 3339 timestamp",
            s
        ))
    })?;

    let time = match kind {
        BoundKind::Start => date.and_hms_opt(0, 0, 0),
        BoundKind::End => date.and_hms_opt(23, 59, 59),
    };

    time.map(|t| t.and_utc())
        .ok_or_else(|| CoreError::Config(format!("Invalid date '{}'", s)))
}
