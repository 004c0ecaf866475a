use tracing::{info, warn};

use crate::models::hours::{HourDifference, HourMap, Workday};

/// What to do with the timesheet once logged hours are known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Logged hours already match; submit as is.
    Skip,
    /// Add these hours per day. Zero entries are written explicitly.
    Fill(HourMap),
    /// Some day already has more hours than intended.
    Abort,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub differences: HourDifference,
    pub decision: Decision,
}

impl Reconciliation {
    /// Days that need hours added, without the zero entries.
    pub fn shortfall(&self) -> HourMap {
        self.differences
            .iter()
            .filter(|(_, diff)| **diff > 0)
            .map(|(day, diff)| (*day, *diff as u32))
            .collect()
    }
}

/// Diffs intended against logged hours for the five workdays. Missing
/// entries on either side count as 0.
pub fn reconcile(intended: &HourMap, logged: &HourMap) -> Reconciliation {
    let differences: HourDifference = Workday::ALL
        .iter()
        .map(|day| {
            let wanted = intended.get(day).copied().unwrap_or(0) as i64;
            let have = logged.get(day).copied().unwrap_or(0) as i64;
            (*day, wanted - have)
        })
        .collect();

    let decision = if differences.values().any(|diff| *diff < 0) {
        warn!(
            "Logged hours {:?} exceed intended hours {:?}",
            logged, intended
        );
        Decision::Abort
    } else if differences.values().all(|diff| *diff == 0) {
        info!("Already logged desired hours: {:?}", intended);
        Decision::Skip
    } else {
        let to_add: HourMap = differences
            .iter()
            .map(|(day, diff)| (*day, *diff as u32))
            .collect();
        info!("Hours to add: {:?}", to_add);
        Decision::Fill(to_add)
    };

    Reconciliation {
        differences,
        decision,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hours(values: [u32; 5]) -> HourMap {
        Workday::ALL.iter().copied().zip(values).collect()
    }

    #[test]
    fn equal_hours_skip_with_zero_differences() {
        let week = hours([8, 8, 6, 8, 4]);
        let result = reconcile(&week, &week);
        assert_eq!(result.decision, Decision::Skip);
        assert!(result.differences.values().all(|d| *d == 0));
        assert_eq!(result.differences.len(), 5);
    }

    #[test]
    fn any_excess_aborts() {
        let intended = hours([8, 8, 8, 8, 8]);
        let logged = hours([0, 0, 9, 0, 0]);
        let result = reconcile(&intended, &logged);
        assert_eq!(result.decision, Decision::Abort);
        assert_eq!(result.differences[&Workday::Wednesday], -1);
        assert_eq!(result.differences[&Workday::Monday], 8);
    }

    #[test]
    fn shortfall_fills_with_full_map() {
        let intended = hours([8, 8, 8, 8, 8]);
        let logged = hours([8, 8, 0, 8, 8]);
        let result = reconcile(&intended, &logged);

        assert_eq!(result.decision, Decision::Fill(hours([0, 0, 8, 0, 0])));
        let shortfall = result.shortfall();
        assert_eq!(shortfall.len(), 1);
        assert_eq!(shortfall[&Workday::Wednesday], 8);
    }

    #[test]
    fn missing_entries_count_as_zero() {
        let intended: HourMap = [(Workday::Monday, 8)].into_iter().collect();
        let result = reconcile(&intended, &HourMap::new());
        assert_eq!(result.differences[&Workday::Monday], 8);
        assert_eq!(result.differences[&Workday::Friday], 0);
        assert!(matches!(result.decision, Decision::Fill(_)));

        let logged: HourMap = [(Workday::Tuesday, 2)].into_iter().collect();
        assert_eq!(reconcile(&HourMap::new(), &logged).decision, Decision::Abort);
    }
}
