use chrono::NaiveDate;
use tracing::info;

use super::week::weekday_date;
use crate::models::hours::{ExceptionTable, HourMap, Workday};

/// Hours intended for `day` in the week containing `target_date`.
///
/// Days missing from `default_hours` resolve to 0. Otherwise the default is
/// overridden by every exception range covering that day's date, in
/// declaration order, so the last matching range wins.
pub fn resolve_day_hours(
    target_date: NaiveDate,
    day: Workday,
    default_hours: &HourMap,
    exceptions: &ExceptionTable,
) -> u32 {
    let Some(&default) = default_hours.get(&day) else {
        return 0;
    };

    let date = weekday_date(target_date, day);

    exceptions
        .iter()
        .filter(|range| range.contains(date))
        .last()
        .map_or(default, |range| range.hours)
}

/// Intended hours for all five workdays of the week containing `target_date`.
pub fn intended_hours(
    target_date: NaiveDate,
    default_hours: &HourMap,
    exceptions: &ExceptionTable,
) -> HourMap {
    let intended: HourMap = Workday::ALL
        .iter()
        .map(|day| {
            (
                *day,
                resolve_day_hours(target_date, *day, default_hours, exceptions),
            )
        })
        .collect();

    info!("Intended hours for week of {}: {:?}", target_date, intended);
    intended
}
