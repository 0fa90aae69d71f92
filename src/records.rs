// 🧾 Record Types
// Typed domain records plus the raw CSV row shapes they are read from / written to.

use crate::dates::{first_of_month, format_ymd};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// ============================================================================
// PATIENT IDENTITY
// ============================================================================

/// Opaque patient identifier.
///
/// All-digit ids are stored without leading zeros, so "007" and "7" name the
/// same patient. Ordering: numeric ids compare as numbers ("9" < "10"),
/// numeric ids sort before non-numeric ones, and ties fall back to the text
/// so the order agrees with equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatientId(String);

impl PatientId {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let trimmed = raw.trim();
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            let digits = trimmed.trim_start_matches('0');
            return PatientId(if digits.is_empty() { "0" } else { digits }.to_string());
        }
        PatientId(trimmed.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<u128> {
        self.0.parse::<u128>().ok()
    }
}

impl Ord for PatientId {
    fn cmp(&self, other: &Self) -> Ordering {
        let by_kind = match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_kind.then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for PatientId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PatientId {
    fn from(raw: &str) -> Self {
        PatientId::new(raw)
    }
}

// ============================================================================
// INPUT RECORDS
// ============================================================================

/// One enrolled month for one patient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipRecord {
    pub patient_id: PatientId,
    /// Always the 1st of the month
    pub month: NaiveDate,
}

impl MembershipRecord {
    /// Any day-of-month is accepted and read as that month
    pub fn new(patient_id: impl Into<PatientId>, month: NaiveDate) -> Self {
        MembershipRecord {
            patient_id: patient_id.into(),
            month: first_of_month(month),
        }
    }
}

/// One source row of outpatient activity for a patient on a day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitEvent {
    pub patient_id: PatientId,
    pub date: NaiveDate,
    pub visit_count: u64,
}

impl VisitEvent {
    pub fn new(patient_id: impl Into<PatientId>, date: NaiveDate, visit_count: u64) -> Self {
        VisitEvent {
            patient_id: patient_id.into(),
            date,
            visit_count,
        }
    }
}

// ============================================================================
// DERIVED RECORDS
// ============================================================================

/// A closed interval of continuous enrollment, `start_date..=end_date`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EnrollmentSpan {
    pub patient_id: PatientId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl EnrollmentSpan {
    pub fn to_row(&self) -> SpanRow {
        SpanRow {
            patient_id: self.patient_id.to_string(),
            enrollment_start_date: format_ymd(self.start_date),
            enrollment_end_date: format_ymd(self.end_date),
        }
    }
}

/// Visit metrics for exactly one enrollment span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtilizationRecord {
    pub patient_id: PatientId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_visits: u64,
    pub distinct_visit_days: u64,
}

impl UtilizationRecord {
    pub fn empty(span: &EnrollmentSpan) -> Self {
        UtilizationRecord {
            patient_id: span.patient_id.clone(),
            start_date: span.start_date,
            end_date: span.end_date,
            total_visits: 0,
            distinct_visit_days: 0,
        }
    }

    pub fn has_visits(&self) -> bool {
        self.distinct_visit_days > 0
    }

    pub fn to_row(&self) -> ResultRow {
        ResultRow {
            patient_id: self.patient_id.to_string(),
            enrollment_start_date: format_ymd(self.start_date),
            enrollment_end_date: format_ymd(self.end_date),
            ct_outpatient_visits: self.total_visits,
            ct_days_with_outpatient_visit: self.distinct_visit_days,
        }
    }
}

// ============================================================================
// CSV ROW SHAPES (column names are part of the external contract)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MembershipRow {
    pub patient_id: String,
    pub month_year: String,
}

#[derive(Debug, Deserialize)]
pub struct VisitRow {
    pub patient_id: String,
    pub date: String,
    pub outpatient_visit_count: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpanRow {
    pub patient_id: String,
    pub enrollment_start_date: String,
    pub enrollment_end_date: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultRow {
    pub patient_id: String,
    pub enrollment_start_date: String,
    pub enrollment_end_date: String,
    pub ct_outpatient_visits: u64,
    pub ct_days_with_outpatient_visit: u64,
}

pub const RESULT_COLUMNS: [&str; 5] = [
    "patient_id",
    "enrollment_start_date",
    "enrollment_end_date",
    "ct_outpatient_visits",
    "ct_days_with_outpatient_visit",
];

pub const SPAN_COLUMNS: [&str; 3] = [
    "patient_id",
    "enrollment_start_date",
    "enrollment_end_date",
];

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_patient_id_numeric_order() {
        let mut ids: Vec<PatientId> = ["10", "9", "abc", "100", "Z1"]
            .iter()
            .map(|s| PatientId::from(*s))
            .collect();
        ids.sort();

        let order: Vec<&str> = ids.iter().map(|p| p.as_str()).collect();
        assert_eq!(order, vec!["9", "10", "100", "Z1", "abc"]);
    }

    #[test]
    fn test_leading_zeros_name_the_same_patient() {
        let a = PatientId::from("007");
        let b = PatientId::from(" 7 ");
        assert_eq!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Equal);
        assert_eq!(a.as_str(), "7");
        assert_eq!(PatientId::from("000").as_str(), "0");
        assert_eq!(PatientId::from("A007").as_str(), "A007");
    }

    #[test]
    fn test_patient_id_order_consistent_with_eq() {
        let a = PatientId::from("+7");
        let b = PatientId::from("7");
        assert_ne!(a, b);
        assert_ne!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn test_membership_normalizes_to_month_start() {
        let rec = MembershipRecord::new("P1", d(2024, 3, 17));
        assert_eq!(rec.month, d(2024, 3, 1));
        assert_eq!(rec.patient_id.as_str(), "P1");
    }

    #[test]
    fn test_result_row_formatting() {
        let span = EnrollmentSpan {
            patient_id: "42".into(),
            start_date: d(2024, 5, 1),
            end_date: d(2024, 6, 30),
        };
        let row = UtilizationRecord::empty(&span).to_row();

        assert_eq!(row.patient_id, "42");
        assert_eq!(row.enrollment_start_date, "2024-05-01");
        assert_eq!(row.enrollment_end_date, "2024-06-30");
        assert_eq!(row.ct_outpatient_visits, 0);
        assert_eq!(row.ct_days_with_outpatient_visit, 0);
    }
}
