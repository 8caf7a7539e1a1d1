//! Business logic layer. Services own a shared database handle and an event
//! channel; handlers stay thin and delegate here.

pub mod activity;
pub mod categories;
pub mod ledger;
pub mod products;
pub mod reporting;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// UTC instant at the start of the given calendar day.
pub(crate) fn day_start_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// UTC instant at the start of the day after the given one, for exclusive
/// upper bounds over inclusive day ranges.
pub(crate) fn next_day_start_utc(date: NaiveDate) -> DateTime<Utc> {
    match date.succ_opt() {
        Some(next) => day_start_utc(next),
        None => DateTime::<Utc>::MAX_UTC,
    }
}
