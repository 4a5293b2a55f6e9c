//! Field-level filter primitives shared by every condition category.
//!
//! Each primitive evaluates to `Option<bool>`: `None` means the filter is
//! inactive (e.g. an empty allow-list) and does not take part in the
//! condition's AND/OR combination.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Longest window accepted by `last_n_days`: 100 years.
pub const MAX_LAST_N_DAYS: u32 = 36_500;

// ---------------------------------------------------------------------------
// Logical operator
// ---------------------------------------------------------------------------

/// How the active field predicates inside one condition are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

/// Combine per-field results. With no active predicates the condition is a
/// no-op and matches everything.
pub fn combine<I>(operator: LogicalOperator, checks: I) -> bool
where
    I: IntoIterator<Item = Option<bool>>,
{
    let mut active = checks.into_iter().flatten().peekable();
    if active.peek().is_none() {
        return true;
    }
    match operator {
        LogicalOperator::And => active.all(|b| b),
        LogicalOperator::Or => active.any(|b| b),
    }
}

// ---------------------------------------------------------------------------
// Numeric
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericOperator {
    Eq,
    Gt,
    Lt,
    Between,
}

/// `{ field, operator, value, value2? }` over a numeric record field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericFilter<F> {
    pub field: F,
    pub operator: NumericOperator,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<f64>,
}

impl<F: std::fmt::Debug> NumericFilter<F> {
    /// A record without the field never matches.
    pub fn matches(&self, actual: Option<f64>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self.operator {
            NumericOperator::Eq => actual == self.value,
            NumericOperator::Gt => actual > self.value,
            NumericOperator::Lt => actual < self.value,
            NumericOperator::Between => self
                .value2
                .is_some_and(|upper| actual >= self.value && actual <= upper),
        }
    }

    pub fn error(&self) -> Option<String> {
        if !self.value.is_finite() {
            return Some(format!("{:?}: value must be a finite number", self.field));
        }
        if self.operator != NumericOperator::Between {
            return None;
        }
        match self.value2 {
            None => Some(format!("{:?}: 'between' requires value2", self.field)),
            Some(upper) if !upper.is_finite() || self.value >= upper => Some(format!(
                "{:?}: invalid range, value ({}) must be less than value2 ({})",
                self.field, self.value, upper
            )),
            Some(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Date
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOperator {
    Before,
    After,
    Between,
    LastNDays,
}

/// `{ field, operator, value?, value2?, days? }` over a timestamp field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateFilter<F> {
    pub field: F,
    pub operator: DateOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
}

impl<F: std::fmt::Debug> DateFilter<F> {
    pub fn matches(&self, actual: Option<Timestamp>, now: Timestamp) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        match self.operator {
            DateOperator::Before => self.value.is_some_and(|v| actual < v),
            DateOperator::After => self.value.is_some_and(|v| actual > v),
            DateOperator::Between => match (self.value, self.value2) {
                (Some(start), Some(end)) => actual >= start && actual <= end,
                _ => false,
            },
            // A window reaching past the representable range has no lower bound.
            DateOperator::LastNDays => self.days.is_some_and(|days| {
                now.checked_sub_signed(Duration::days(i64::from(days)))
                    .map_or(true, |cutoff| actual >= cutoff)
            }),
        }
    }

    pub fn error(&self) -> Option<String> {
        match self.operator {
            DateOperator::Before | DateOperator::After if self.value.is_none() => Some(format!(
                "{:?}: '{:?}' requires a value",
                self.field, self.operator
            )),
            DateOperator::Between => match (self.value, self.value2) {
                (Some(start), Some(end)) if start >= end => Some(format!(
                    "{:?}: invalid date range, value ({start}) must be before value2 ({end})",
                    self.field
                )),
                (Some(_), Some(_)) => None,
                _ => Some(format!("{:?}: 'between' requires value and value2", self.field)),
            },
            DateOperator::LastNDays => match self.days.unwrap_or(0) {
                0 => Some(format!("{:?}: 'last_n_days' requires days >= 1", self.field)),
                days if days > MAX_LAST_N_DAYS => Some(format!(
                    "{:?}: 'last_n_days' allows at most {MAX_LAST_N_DAYS} days, got {days}",
                    self.field
                )),
                _ => None,
            },
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Set membership / boolean
// ---------------------------------------------------------------------------

/// Inclusion check against an allow-list (case-insensitive). Empty list is
/// inactive.
pub fn one_of(allowed: &[String], actual: Option<&str>) -> Option<bool> {
    if allowed.is_empty() {
        return None;
    }
    Some(actual.is_some_and(|v| allowed.iter().any(|a| a.eq_ignore_ascii_case(v))))
}

/// True when any of the record's values is in the allow-list.
pub fn any_of(allowed: &[String], actual: &[String]) -> Option<bool> {
    if allowed.is_empty() {
        return None;
    }
    Some(
        actual
            .iter()
            .any(|v| allowed.iter().any(|a| a.eq_ignore_ascii_case(v))),
    )
}

pub fn flag(expected: Option<bool>, actual: bool) -> Option<bool> {
    expected.map(|e| e == actual)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn numeric(operator: NumericOperator, value: f64, value2: Option<f64>) -> NumericFilter<&'static str> {
        NumericFilter {
            field: "askingPrice",
            operator,
            value,
            value2,
        }
    }

    #[test]
    fn numeric_gt_and_lt_are_strict() {
        assert!(!numeric(NumericOperator::Gt, 100.0, None).matches(Some(100.0)));
        assert!(numeric(NumericOperator::Gt, 100.0, None).matches(Some(100.5)));
        assert!(!numeric(NumericOperator::Lt, 100.0, None).matches(Some(100.0)));
    }

    #[test]
    fn numeric_between_is_inclusive() {
        let f = numeric(NumericOperator::Between, 10.0, Some(20.0));
        assert!(f.matches(Some(10.0)));
        assert!(f.matches(Some(20.0)));
        assert!(!f.matches(Some(20.01)));
    }

    #[test]
    fn numeric_missing_field_never_matches() {
        assert!(!numeric(NumericOperator::Eq, 1.0, None).matches(None));
    }

    #[test]
    fn numeric_between_rejects_reversed_and_equal_bounds() {
        assert!(numeric(NumericOperator::Between, 50_000.0, Some(40_000.0)).error().is_some());
        assert!(numeric(NumericOperator::Between, 5.0, Some(5.0)).error().is_some());
        assert!(numeric(NumericOperator::Between, 5.0, None).error().is_some());
        assert!(numeric(NumericOperator::Between, 5.0, Some(6.0)).error().is_none());
    }

    #[test]
    fn date_last_n_days_is_relative_to_now() {
        let now = Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap();
        let f = DateFilter {
            field: "createdAt",
            operator: DateOperator::LastNDays,
            value: None,
            value2: None,
            days: Some(7),
        };
        assert!(f.matches(Some(now - Duration::days(7)), now));
        assert!(!f.matches(Some(now - Duration::days(8)), now));
    }

    fn date(operator: DateOperator, value: Option<Timestamp>, value2: Option<Timestamp>, days: Option<u32>) -> DateFilter<&'static str> {
        DateFilter {
            field: "createdAt",
            operator,
            value,
            value2,
            days,
        }
    }

    #[test]
    fn date_last_n_days_with_huge_window_matches_instead_of_overflowing() {
        let now = Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap();
        let f = date(DateOperator::LastNDays, None, None, Some(100_000_000));
        assert!(f.matches(Some(now - Duration::days(365 * 50)), now));
        assert!(f.matches(Some(now), now));
    }

    #[test]
    fn date_last_n_days_rejects_window_over_limit() {
        assert!(date(DateOperator::LastNDays, None, None, Some(100_000_000)).error().is_some());
        assert!(date(DateOperator::LastNDays, None, None, Some(MAX_LAST_N_DAYS + 1)).error().is_some());
        assert!(date(DateOperator::LastNDays, None, None, Some(MAX_LAST_N_DAYS)).error().is_none());
        assert!(date(DateOperator::LastNDays, None, None, Some(0)).error().is_some());
    }

    #[test]
    fn date_between_is_inclusive() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let f = date(DateOperator::Between, Some(start), Some(end), None);
        assert!(f.matches(Some(start), end));
        assert!(f.matches(Some(end), end));
        assert!(!f.matches(Some(end + Duration::seconds(1)), end));
        assert!(!f.matches(Some(start - Duration::seconds(1)), end));
    }

    #[test]
    fn date_after_is_strict() {
        let cutoff = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let f = date(DateOperator::After, Some(cutoff), None, None);
        assert!(!f.matches(Some(cutoff), cutoff));
        assert!(f.matches(Some(cutoff + Duration::seconds(1)), cutoff));
    }

    #[test]
    fn date_before_is_strict() {
        let cutoff = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let f = DateFilter {
            field: "createdAt",
            operator: DateOperator::Before,
            value: Some(cutoff),
            value2: None,
            days: None,
        };
        assert!(!f.matches(Some(cutoff), cutoff));
        assert!(f.matches(Some(cutoff - Duration::seconds(1)), cutoff));
    }

    #[test]
    fn empty_allow_list_is_inactive() {
        assert_eq!(one_of(&[], Some("TX")), None);
        assert_eq!(one_of(&["tx".to_string()], Some("TX")), Some(true));
        assert_eq!(one_of(&["TX".to_string()], None), Some(false));
    }

    #[test]
    fn combine_ignores_inactive_predicates() {
        assert!(combine(LogicalOperator::And, [None, None]));
        assert!(combine(LogicalOperator::Or, [None, Some(true), Some(false)]));
        assert!(!combine(LogicalOperator::And, [None, Some(true), Some(false)]));
        assert!(!combine(LogicalOperator::Or, [Some(false)]));
    }
}
