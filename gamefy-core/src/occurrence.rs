//! Output records shared by the feed expander and the stored-event path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::date_range::DateRange;

pub const UNTITLED: &str = "(No title)";

/// Where a calendar item came from. Feed items are read-only for callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Feed,
    Stored,
}

/// One concrete, dated instance ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub origin: Origin,
}

/// Unified record of a calendar view. Feed occurrences and stored events
/// share the occurrence shape and are told apart by `origin`.
pub type CalendarItem = Occurrence;

impl Occurrence {
    /// Synthetic id that keeps the instances of one series distinct.
    pub fn feed_id(uid: &str, start: DateTime<Utc>) -> String {
        format!("{}_{}", uid, start.format("%Y%m%dT%H%M%SZ"))
    }

    pub fn is_editable(&self) -> bool {
        self.origin == Origin::Stored
    }
}

/// An application-managed event row, owned by the CRUD side of GameFy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
}

impl StoredEvent {
    pub fn overlaps(&self, range: &DateRange) -> bool {
        range.overlaps(self.start, self.end)
    }
}

impl From<StoredEvent> for CalendarItem {
    fn from(event: StoredEvent) -> Self {
        CalendarItem {
            id: event.id,
            title: event.title,
            description: event.description,
            location: event.location,
            start: event.start,
            end: event.end,
            all_day: event.all_day,
            origin: Origin::Stored,
        }
    }
}
