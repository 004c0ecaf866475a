use chrono::{Datelike, Duration, NaiveDate};
use tracing::info;

use crate::models::hours::Workday;

/// Sunday that opens the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_sunday() as i64)
}

/// Saturday that closes the week containing `date`.
pub fn week_ending(date: NaiveDate) -> NaiveDate {
    week_start(date) + Duration::days(6)
}

/// Date of `day` inside the Sunday-Saturday week containing `date`.
pub fn weekday_date(date: NaiveDate, day: Workday) -> NaiveDate {
    week_start(date) + Duration::days(day.weekday().num_days_from_sunday() as i64)
}

/// Heading the portal's week picker shows for the week containing `date`.
///
/// Three layouts, depending on which boundaries the week crosses:
///
/// ```text
/// 18 - 24 November 2018
/// 25 November - 1 December 2018
/// 30 December 2018 - 5 January 2019
/// ```
pub fn week_label(date: NaiveDate) -> String {
    let start = week_start(date);
    let end = week_ending(date);

    let start_month = start.format("%B").to_string();
    let end_month = end.format("%B").to_string();

    let start_month_ui = if start_month == end_month {
        String::new()
    } else {
        format!("{} ", start_month)
    };
    let start_year_ui = if start.year() == end.year() {
        String::new()
    } else {
        format!("{} ", start.year())
    };

    let label = format!(
        "{} {}{}- {} {} {}",
        start.day(),
        start_month_ui,
        start_year_ui,
        end.day(),
        end_month,
        end.year()
    );

    info!("Week label for {}: {}", date, label);
    label
}
