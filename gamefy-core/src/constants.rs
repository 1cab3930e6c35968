/// Default window: this many days before now (spans past classes and deadlines)
pub const DEFAULT_PAST_DAYS: i64 = 30;

/// Default window: this many days after now
pub const DEFAULT_FUTURE_DAYS: i64 = 90;

/// Upper bound on generated instances per recurring event and window
pub const MAX_OCCURRENCES: u16 = 2000;

/// Largest offset, in days, the default window may extend either side of now
pub const MAX_WINDOW_DAYS: i64 = 36_500;
