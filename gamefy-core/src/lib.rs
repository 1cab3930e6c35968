//! Calendar core for GameFy.
//!
//! This crate turns an external iCalendar feed into concrete occurrences
//! inside a date window and merges them with natively stored events:
//! - `ics` parses the feed into `SourceEvent`s
//! - `expand` resolves recurrence, exceptions and overrides
//! - `merge` combines feed occurrences with `StoredEvent`s
//! - `feed` and `store` fetch both sources, `view` puts them together

pub mod constants;
pub mod date_range;
pub mod error;
pub mod event;
pub mod expand;
pub mod feed;
pub mod gamefy_config;
pub mod ics;
pub mod merge;
pub mod occurrence;
pub mod recurrence;
pub mod store;
pub mod view;

pub use date_range::DateRange;
pub use error::{CoreError, CoreResult};
pub use event::{EventStatus, EventTime, Override, Recurrence, SourceEvent};
pub use expand::{expand, expand_window};
pub use feed::FeedClient;
pub use gamefy_config::GamefyConfig;
pub use merge::{merge, sort_chronologically};
pub use occurrence::{CalendarItem, Occurrence, Origin, StoredEvent};
pub use store::{EventStore, JsonFileStore, MemoryStore};
pub use view::{CalendarView, assemble};
