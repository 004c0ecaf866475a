use chrono::{NaiveDate, Weekday};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The five days a timesheet carries hours for, Monday first.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Workday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Workday {
    pub const ALL: [Workday; 5] = [
        Workday::Monday,
        Workday::Tuesday,
        Workday::Wednesday,
        Workday::Thursday,
        Workday::Friday,
    ];

    /// Key used for this day in config files and timecard payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Workday::Monday => "monday",
            Workday::Tuesday => "tuesday",
            Workday::Wednesday => "wednesday",
            Workday::Thursday => "thursday",
            Workday::Friday => "friday",
        }
    }

    pub fn weekday(&self) -> Weekday {
        match self {
            Workday::Monday => Weekday::Mon,
            Workday::Tuesday => Weekday::Tue,
            Workday::Wednesday => Weekday::Wed,
            Workday::Thursday => Weekday::Thu,
            Workday::Friday => Weekday::Fri,
        }
    }
}

impl fmt::Display for Workday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hours per workday. Used for the default schedule, intended hours and
/// hours scraped from the portal.
pub type HourMap = BTreeMap<Workday, u32>;

/// Signed `intended - logged` per workday.
pub type HourDifference = BTreeMap<Workday, i64>;

/// One override of the default schedule, inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub hours: u32,
}

impl ExceptionRange {
    pub fn new(start: NaiveDate, end: NaiveDate, hours: u32) -> Self {
        Self { start, end, hours }
    }

    /// Parses a `YYYY-MM-DD` or `YYYY-MM-DD:YYYY-MM-DD` key.
    pub fn parse(key: &str, hours: u32) -> Result<Self, String> {
        let mut parts = key.splitn(2, ':');
        let start_str = parts.next().unwrap_or_default().trim();
        let end_str = parts
            .next()
            .map(str::trim)
            .filter(|end| !end.is_empty())
            .unwrap_or(start_str);

        let start = parse_date(start_str)?;
        let end = parse_date(end_str)?;
        if end < start {
            return Err(format!("Exception range '{}' ends before it starts", key));
        }

        Ok(Self { start, end, hours })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    fn key(&self) -> String {
        if self.start == self.end {
            self.start.format("%Y-%m-%d").to_string()
        } else {
            format!(
                "{}:{}",
                self.start.format("%Y-%m-%d"),
                self.end.format("%Y-%m-%d")
            )
        }
    }
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{}' in exception range: {}", value, e))
}

/// Exception ranges in declaration order. When several ranges cover the same
/// date the one declared last wins.
///
/// In config files this is a JSON object (`{"2018-11-01": 0, ...}`); the
/// document order of its keys is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionTable(Vec<ExceptionRange>);

impl ExceptionTable {
    pub fn new(ranges: Vec<ExceptionRange>) -> Self {
        Self(ranges)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExceptionRange> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<ExceptionRange> for ExceptionTable {
    fn from_iter<T: IntoIterator<Item = ExceptionRange>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for ExceptionTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for range in &self.0 {
            map.serialize_entry(&range.key(), &range.hours)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ExceptionTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = ExceptionTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of date ranges to hours")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut ranges = Vec::new();
                while let Some((key, hours)) = access.next_entry::<String, u32>()? {
                    ranges.push(ExceptionRange::parse(&key, hours).map_err(de::Error::custom)?);
                }
                Ok(ExceptionTable(ranges))
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// Timesheet state as shown by the portal. Only `Pending` can be edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimesheetState {
    Pending,
    Submitted,
    Processed,
    Other(String),
}

impl TimesheetState {
    pub fn is_pending(&self) -> bool {
        matches!(self, TimesheetState::Pending)
    }
}

impl FromStr for TimesheetState {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        Ok(match normalized.as_str() {
            "PENDING" => TimesheetState::Pending,
            // The portal spells it both ways
            "SUBMITTED" | "SUBMITED" => TimesheetState::Submitted,
            "PROCESSED" => TimesheetState::Processed,
            _ => TimesheetState::Other(normalized),
        })
    }
}

impl fmt::Display for TimesheetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimesheetState::Pending => f.write_str("PENDING"),
            TimesheetState::Submitted => f.write_str("SUBMITTED"),
            TimesheetState::Processed => f.write_str("PROCESSED"),
            TimesheetState::Other(s) => f.write_str(s),
        }
    }
}
