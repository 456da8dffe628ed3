//! Lookup lists for filter controls and the conjunctive filter predicate.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::record::Record;

/// Options offered for the operational-category filter.
pub const OPERATIONAL_OPTIONS: &[&str] = &["Todas", "Mas de la Mitad", "Menos de la Mitad", "No"];

/// Sorted, de-duplicated, non-empty option lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookups {
    pub dates: Vec<String>,
    pub locations: Vec<String>,
    pub supervisors: Vec<String>,
    pub times_of_check: Vec<String>,
    pub operational_options: Vec<String>,
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn build_lookups(records: &[Record]) -> Lookups {
    let dates: BTreeSet<String> = records.iter().filter_map(Record::date_key).collect();
    Lookups {
        dates: dates.into_iter().collect(),
        locations: distinct(records.iter().map(|r| r.location.as_str())),
        supervisors: distinct(records.iter().map(|r| r.supervisor.as_str())),
        times_of_check: distinct(records.iter().map(|r| r.time_of_check.as_str())),
        operational_options: OPERATIONAL_OPTIONS.iter().map(|s| s.to_string()).collect(),
    }
}

/// Active constraints. Empty lists, `None` and empty strings mean "any".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub locations: Vec<String>,
    pub supervisor: Option<String>,
    pub time_of_check: Option<String>,
    pub operational: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl FilterState {
    pub fn is_empty(&self) -> bool {
        self.locations.iter().all(|l| l.is_empty())
            && active(&self.supervisor).is_none()
            && active(&self.time_of_check).is_none()
            && active(&self.operational).is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }

    /// The single selected location, used for export file names.
    pub fn single_location(&self) -> Option<&str> {
        match self.locations.as_slice() {
            [only] if !only.is_empty() => Some(only.as_str()),
            _ => None,
        }
    }

    /// Inclusive bounds: `date_from` at 00:00, `date_to` at 23:59:59.999.
    fn bounds(&self) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
        let start = self.date_from.and_then(|d| d.and_hms_opt(0, 0, 0));
        let end = self.date_to.and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999));
        (start, end)
    }

    /// Undated records are never excluded by the date range.
    pub fn matches(&self, record: &Record) -> bool {
        let locations: Vec<&str> = self
            .locations
            .iter()
            .map(String::as_str)
            .filter(|l| !l.is_empty())
            .collect();
        if !locations.is_empty() && !locations.contains(&record.location.as_str()) {
            return false;
        }
        if active(&self.supervisor).is_some_and(|s| s != record.supervisor) {
            return false;
        }
        if active(&self.time_of_check).is_some_and(|m| m != record.time_of_check) {
            return false;
        }
        if active(&self.operational).is_some_and(|o| o != record.operational_answer) {
            return false;
        }
        if let Some(date) = record.report_date {
            let (start, end) = self.bounds();
            if start.is_some_and(|s| date < s) || end.is_some_and(|e| date > e) {
                return false;
            }
        }
        true
    }

    /// Period caption: `Todo` without a range, otherwise `<from> a <to>`
    /// with `...` for an open side.
    pub fn period_label(&self) -> String {
        if self.date_from.is_none() && self.date_to.is_none() {
            return "Todo".to_string();
        }
        let side = |d: Option<NaiveDate>| {
            d.map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "...".to_string())
        };
        format!("{} a {}", side(self.date_from), side(self.date_to))
    }
}

/// Records satisfying every active constraint, in original order.
pub fn apply_filters<'a>(records: &'a [Record], filters: &FilterState) -> Vec<&'a Record> {
    if filters.is_empty() {
        return records.iter().collect();
    }
    records.iter().filter(|r| filters.matches(r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::parse_date;

    fn record(id: &str, location: &str, supervisor: &str, date: &str) -> Record {
        Record {
            id: id.to_string(),
            line: 2,
            report_date: parse_date(date),
            location: location.to_string(),
            supervisor: supervisor.to_string(),
            time_of_check: "Mañana".to_string(),
            started_at: String::new(),
            finished_at: String::new(),
            email: String::new(),
            respondent_name: String::new(),
            total_cameras: 4,
            cameras_with_fault: 1,
            operational_estimate: 3,
            operational_answer: "Todas".to_string(),
            poor_quality: None,
            fault_details: None,
            fault_type: None,
            general_faults: None,
            observations: None,
            attachments: None,
            recommendation: None,
            raw: Vec::new(),
        }
    }

    fn sample() -> Vec<Record> {
        vec![
            record("1", "B", "Ana", "2024-03-05T18:30:00"),
            record("2", "A", "Luis", "2024-03-06"),
            record("3", "A", "Ana", ""),
            record("4", "", "Ana", "2024-03-04"),
        ]
    }

    fn ids(subset: &[&Record]) -> Vec<String> {
        subset.iter().map(|r| r.id.clone()).collect()
    }

    // -------------------------------------------------------------------------
    // LOOKUPS
    // -------------------------------------------------------------------------

    #[test]
    fn test_lookups_sorted_distinct_non_empty() {
        let lookups = build_lookups(&sample());
        assert_eq!(lookups.locations, vec!["A", "B"]);
        assert_eq!(lookups.supervisors, vec!["Ana", "Luis"]);
        assert_eq!(lookups.times_of_check, vec!["Mañana"]);
        assert_eq!(lookups.dates, vec!["2024-03-04", "2024-03-05", "2024-03-06"]);
        assert_eq!(lookups.operational_options.len(), 4);
    }

    #[test]
    fn test_lookups_empty_collection() {
        let lookups = build_lookups(&[]);
        assert!(lookups.locations.is_empty());
        assert!(lookups.dates.is_empty());
    }

    // -------------------------------------------------------------------------
    // FILTERS
    // -------------------------------------------------------------------------

    #[test]
    fn test_empty_filter_is_identity() {
        let records = sample();
        let subset = apply_filters(&records, &FilterState::default());
        assert_eq!(subset.len(), records.len());
        for (a, b) in subset.iter().zip(records.iter()) {
            assert!(std::ptr::eq(*a, b));
        }
    }

    #[test]
    fn test_blank_strings_are_unset() {
        let records = sample();
        let filters = FilterState {
            locations: vec![String::new()],
            supervisor: Some(String::new()),
            ..Default::default()
        };
        assert!(filters.is_empty());
        assert_eq!(apply_filters(&records, &filters).len(), records.len());
    }

    #[test]
    fn test_location_multi_select() {
        let records = sample();
        let filters = FilterState {
            locations: vec!["A".to_string(), "B".to_string()],
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&records, &filters)), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_conjunction() {
        let records = sample();
        let filters = FilterState {
            locations: vec!["A".to_string()],
            supervisor: Some("Ana".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&records, &filters)), vec!["3"]);
    }

    #[test]
    fn test_date_range_end_of_day_inclusive() {
        let records = sample();
        let filters = FilterState {
            date_from: NaiveDate::from_ymd_opt(2024, 3, 5),
            date_to: NaiveDate::from_ymd_opt(2024, 3, 5),
            ..Default::default()
        };
        // Record 1 is at 18:30 on the end day; record 3 has no date.
        assert_eq!(ids(&apply_filters(&records, &filters)), vec!["1", "3"]);
    }

    #[test]
    fn test_open_ended_range() {
        let records = sample();
        let filters = FilterState {
            date_from: NaiveDate::from_ymd_opt(2024, 3, 6),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&records, &filters)), vec!["2", "3"]);
    }

    #[test]
    fn test_operational_category() {
        let mut records = sample();
        records[1].operational_answer = "No".to_string();
        let filters = FilterState {
            operational: Some("No".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&apply_filters(&records, &filters)), vec!["2"]);
    }

    #[test]
    fn test_filters_idempotent() {
        let records = sample();
        let filters = FilterState {
            supervisor: Some("Ana".to_string()),
            date_to: NaiveDate::from_ymd_opt(2024, 3, 5),
            ..Default::default()
        };
        let once: Vec<Record> = apply_filters(&records, &filters).into_iter().cloned().collect();
        let twice = apply_filters(&once, &filters);
        assert_eq!(ids(&twice), once.iter().map(|r| r.id.clone()).collect::<Vec<_>>());
    }

    // -------------------------------------------------------------------------
    // LABELS
    // -------------------------------------------------------------------------

    #[test]
    fn test_period_label() {
        assert_eq!(FilterState::default().period_label(), "Todo");
        let filters = FilterState {
            date_from: NaiveDate::from_ymd_opt(2024, 3, 1),
            ..Default::default()
        };
        assert_eq!(filters.period_label(), "2024-03-01 a ...");
    }

    #[test]
    fn test_single_location() {
        let mut filters = FilterState::default();
        assert_eq!(filters.single_location(), None);
        filters.locations = vec!["Patio".to_string()];
        assert_eq!(filters.single_location(), Some("Patio"));
        filters.locations.push("Bodega".to_string());
        assert_eq!(filters.single_location(), None);
    }
}
