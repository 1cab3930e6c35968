//! Calendar view assembly with feed degradation.

use tracing::warn;

use crate::date_range::DateRange;
use crate::error::{CoreError, CoreResult};
use crate::merge::{merge, sort_chronologically};
use crate::occurrence::{CalendarItem, Occurrence};
use crate::store::EventStore;

/// Merged, chronologically sorted items for one window.
#[derive(Debug)]
pub struct CalendarView {
    pub items: Vec<CalendarItem>,
    /// Set when the feed failed and only stored events are shown
    pub feed_error: Option<CoreError>,
}

/// Combine a feed result with stored events for `range`.
///
/// A failed feed does not fail the view: it is logged, reported in
/// `feed_error`, and stored events are still returned. Store errors are
/// propagated.
pub fn assemble(
    feed: CoreResult<Vec<Occurrence>>,
    store: &dyn EventStore,
    range: &DateRange,
) -> CoreResult<CalendarView> {
    let (occurrences, feed_error) = match feed {
        Ok(occurrences) => (occurrences, None),
        Err(e) => {
            warn!("Calendar feed unavailable, showing stored events only: {}", e);
            (Vec::new(), Some(e))
        }
    };

    let stored = store.events_in(range)?;
    let mut items = merge(occurrences, stored);
    sort_chronologically(&mut items);

    Ok(CalendarView { items, feed_error })
}
