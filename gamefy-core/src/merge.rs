//! Merge of feed occurrences with natively stored events.

use crate::occurrence::{CalendarItem, Occurrence, StoredEvent};

/// Concatenate feed occurrences and stored events into one collection.
///
/// Stored events are mapped field-for-field and tagged `Stored`. Nothing is
/// de-duplicated or reordered; the two sources are disjoint id spaces.
pub fn merge(occurrences: Vec<Occurrence>, stored: Vec<StoredEvent>) -> Vec<CalendarItem> {
    let mut items = Vec::with_capacity(occurrences.len() + stored.len());
    items.extend(occurrences);
    items.extend(stored.into_iter().map(CalendarItem::from));
    items
}

/// Display order: by start, then id for a stable tie-break.
pub fn sort_chronologically(items: &mut [CalendarItem]) {
    items.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
}
