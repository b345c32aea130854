//! HTTP handlers, grouped by resource.

pub mod attendance;
pub mod companies;
pub mod descriptors;
pub mod health;
pub mod shifts;
pub mod users;

use chrono::{NaiveDate, NaiveDateTime};

pub(crate) const TIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
pub(crate) const DATE_FMT: &str = "%Y-%m-%d";

pub(crate) fn fmt_time(t: NaiveDateTime) -> String {
    t.format(TIME_FMT).to_string()
}

pub(crate) fn fmt_date(d: NaiveDate) -> String {
    d.format(DATE_FMT).to_string()
}

/// Round to two decimals for the confidence percentage.
pub(crate) fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Round to four decimals for the reported raw distance.
pub(crate) fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
