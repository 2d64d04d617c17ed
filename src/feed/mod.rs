mod fetch;
mod parse;

pub use fetch::{fetch_feed, fetch_feed_bytes};
pub use parse::{Entry, Link, ParsedFeed, UNTITLED_ENTRY, parse_feed};
