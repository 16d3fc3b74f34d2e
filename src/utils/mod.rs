pub mod time;

pub use time::{format_clock, iso_from_millis, iso_utc, parse_date_bound};
