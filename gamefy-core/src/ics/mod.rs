//! ICS feed parsing.
//!
//! This module reads calendar feeds according to RFC 5545.

mod parse;

pub use parse::parse_feed;
