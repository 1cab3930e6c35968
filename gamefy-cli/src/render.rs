//! TUI rendering for calendar items.
//!
//! Extension traits that add colored terminal rendering to gamefy-core
//! types using owo_colors.

use chrono::{Local, NaiveDate};
use gamefy_core::{CalendarItem, Origin};
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for Origin {
    fn render(&self) -> String {
        match self {
            Origin::Feed => "[feed]".dimmed().to_string(),
            Origin::Stored => "[stored]".cyan().to_string(),
        }
    }
}

impl Render for CalendarItem {
    fn render(&self) -> String {
        let mut line = format!("{} {} {}", format_time(self), self.title, self.origin.render());
        if let Some(location) = &self.location {
            line.push_str(&format!(" {}", format!("@ {}", location).dimmed()));
        }
        line
    }
}

/// Calendar date the item is shown under. All-day items keep their UTC
/// date; timed items use the local date.
fn local_date(item: &CalendarItem) -> NaiveDate {
    if item.all_day {
        item.start.date_naive()
    } else {
        item.start.with_timezone(&Local).date_naive()
    }
}

/// Format a date as a human-readable label (e.g. "Today", "Tomorrow", "Wed Feb 25")
pub fn day_label(item: &CalendarItem, today: NaiveDate) -> String {
    let date = local_date(item);

    match (date - today).num_days() {
        0 => "Today".to_string(),
        1 => "Tomorrow".to_string(),
        -1 => "Yesterday".to_string(),
        _ => date.format("%a %b %-d").to_string(),
    }
}

/// Format the time portion of an item (e.g. "  15:00" or "all-day")
fn format_time(item: &CalendarItem) -> String {
    if item.all_day {
        format!("{:>7}", "all-day")
    } else {
        format!("{:>7}", item.start.with_timezone(&Local).format("%H:%M"))
    }
}
