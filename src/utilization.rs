// 📊 Visit Aggregator
// One UtilizationRecord per EnrollmentSpan: visits summed and distinct visit days
// counted inside the inclusive window [start_date, end_date].
//
// Visits are indexed once by patient (date-sorted), then each span binary-searches
// its start and scans forward to its end. No spans × visits cross product.

use crate::config::ZeroCountDayPolicy;
use crate::records::{EnrollmentSpan, PatientId, UtilizationRecord, VisitEvent};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::collections::HashMap;

// ============================================================================
// VISIT INDEX
// ============================================================================

/// Per-patient `(date, visit_count)` pairs, ascending by date
#[derive(Debug, Default)]
pub struct VisitIndex {
    by_patient: HashMap<PatientId, Vec<(NaiveDate, u64)>>,
}

impl VisitIndex {
    pub fn build(visits: &[VisitEvent]) -> Self {
        let mut by_patient: HashMap<PatientId, Vec<(NaiveDate, u64)>> = HashMap::new();
        for visit in visits {
            by_patient
                .entry(visit.patient_id.clone())
                .or_default()
                .push((visit.date, visit.visit_count));
        }
        for days in by_patient.values_mut() {
            days.sort_unstable_by_key(|(date, _)| *date);
        }
        VisitIndex { by_patient }
    }

    /// Rows of `patient_id` with `start <= date <= end`
    pub fn window(&self, patient_id: &PatientId, start: NaiveDate, end: NaiveDate) -> &[(NaiveDate, u64)] {
        let Some(days) = self.by_patient.get(patient_id) else {
            return &[];
        };
        let lo = days.partition_point(|(date, _)| *date < start);
        let hi = days.partition_point(|(date, _)| *date <= end);
        if lo >= hi {
            &[]
        } else {
            &days[lo..hi]
        }
    }

    pub fn patient_count(&self) -> usize {
        self.by_patient.len()
    }
}

// ============================================================================
// VISIT AGGREGATOR
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct VisitAggregator {
    pub zero_count_days: ZeroCountDayPolicy,
    pub parallel: bool,
}

impl VisitAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(zero_count_days: ZeroCountDayPolicy) -> Self {
        VisitAggregator {
            zero_count_days,
            ..Self::default()
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Aggregate visits into each span. Output order matches `spans`.
    ///
    /// Spans with no matching visits yield zero counts; visits whose patient
    /// has no span are ignored.
    pub fn aggregate(&self, spans: &[EnrollmentSpan], visits: &[VisitEvent]) -> Vec<UtilizationRecord> {
        let index = VisitIndex::build(visits);
        self.aggregate_indexed(spans, &index)
    }

    pub fn aggregate_indexed(&self, spans: &[EnrollmentSpan], index: &VisitIndex) -> Vec<UtilizationRecord> {
        if self.parallel {
            spans.par_iter().map(|span| self.aggregate_span(span, index)).collect()
        } else {
            spans.iter().map(|span| self.aggregate_span(span, index)).collect()
        }
    }

    pub fn aggregate_span(&self, span: &EnrollmentSpan, index: &VisitIndex) -> UtilizationRecord {
        let rows = index.window(&span.patient_id, span.start_date, span.end_date);

        let mut record = UtilizationRecord::empty(span);
        if rows.is_empty() {
            log::debug!(
                "No outpatient visits for patient {} in {}..{}",
                span.patient_id,
                span.start_date,
                span.end_date
            );
            return record;
        }

        record.total_visits = rows
            .iter()
            .fold(0u64, |total, (_, count)| total.saturating_add(*count));
        record.distinct_visit_days = self.count_days(rows);
        record
    }

    /// Rows are date-sorted, so each run of equal dates is one day
    fn count_days(&self, rows: &[(NaiveDate, u64)]) -> u64 {
        let mut days = 0;
        let mut i = 0;
        while i < rows.len() {
            let date = rows[i].0;
            let mut day_total: u64 = 0;
            while i < rows.len() && rows[i].0 == date {
                day_total = day_total.saturating_add(rows[i].1);
                i += 1;
            }
            let counts = match self.zero_count_days {
                ZeroCountDayPolicy::CountPresence => true,
                ZeroCountDayPolicy::RequirePositive => day_total > 0,
            };
            if counts {
                days += 1;
            }
        }
        days
    }
}

/// Shorthand for `VisitAggregator::new().aggregate(spans, visits)`
pub fn aggregate(spans: &[EnrollmentSpan], visits: &[VisitEvent]) -> Vec<UtilizationRecord> {
    VisitAggregator::new().aggregate(spans, visits)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn span(patient: &str, start: NaiveDate, end: NaiveDate) -> EnrollmentSpan {
        EnrollmentSpan {
            patient_id: patient.into(),
            start_date: start,
            end_date: end,
        }
    }

    #[test]
    fn test_sums_visits_and_counts_days() {
        let spans = vec![span("P1", d(2024, 1, 1), d(2024, 1, 31))];
        let visits = vec![
            VisitEvent::new("P1", d(2024, 1, 5), 2),
            VisitEvent::new("P1", d(2024, 1, 5), 1),
            VisitEvent::new("P1", d(2024, 1, 10), 1),
        ];

        let records = aggregate(&spans, &visits);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_visits, 4);
        assert_eq!(records[0].distinct_visit_days, 2);
    }

    #[test]
    fn test_span_without_visits_is_zero() {
        let spans = vec![span("P1", d(2024, 1, 1), d(2024, 3, 31))];
        let visits = vec![VisitEvent::new("P2", d(2024, 2, 1), 3)];

        let records = aggregate(&spans, &visits);

        assert_eq!(records[0].total_visits, 0);
        assert_eq!(records[0].distinct_visit_days, 0);
        assert!(!records[0].has_visits());
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let spans = vec![span("P1", d(2024, 1, 1), d(2024, 1, 31))];
        let visits = vec![
            VisitEvent::new("P1", d(2023, 12, 31), 5),
            VisitEvent::new("P1", d(2024, 1, 1), 1),
            VisitEvent::new("P1", d(2024, 1, 31), 1),
            VisitEvent::new("P1", d(2024, 2, 1), 5),
        ];

        let records = aggregate(&spans, &visits);

        assert_eq!(records[0].total_visits, 2);
        assert_eq!(records[0].distinct_visit_days, 2);
    }

    #[test]
    fn test_output_follows_span_order() {
        let spans = vec![
            span("B", d(2024, 3, 1), d(2024, 3, 31)),
            span("A", d(2024, 1, 1), d(2024, 1, 31)),
            span("B", d(2024, 1, 1), d(2024, 1, 31)),
        ];
        let visits = vec![
            VisitEvent::new("B", d(2024, 1, 15), 1),
            VisitEvent::new("A", d(2024, 1, 15), 2),
            VisitEvent::new("B", d(2024, 3, 2), 3),
        ];

        let records = aggregate(&spans, &visits);

        let got: Vec<(&str, u64)> = records
            .iter()
            .map(|r| (r.patient_id.as_str(), r.total_visits))
            .collect();
        assert_eq!(got, vec![("B", 3), ("A", 2), ("B", 1)]);
    }

    #[test]
    fn test_unsorted_visits() {
        let spans = vec![span("P1", d(2024, 1, 1), d(2024, 2, 29))];
        let visits = vec![
            VisitEvent::new("P1", d(2024, 2, 20), 1),
            VisitEvent::new("P1", d(2024, 1, 3), 1),
            VisitEvent::new("P1", d(2024, 2, 20), 2),
            VisitEvent::new("P1", d(2024, 1, 9), 1),
        ];

        let records = aggregate(&spans, &visits);

        assert_eq!(records[0].total_visits, 5);
        assert_eq!(records[0].distinct_visit_days, 3);
    }

    #[test]
    fn test_zero_count_row_counts_as_day_by_default() {
        let spans = vec![span("P1", d(2024, 1, 1), d(2024, 1, 31))];
        let visits = vec![
            VisitEvent::new("P1", d(2024, 1, 4), 0),
            VisitEvent::new("P1", d(2024, 1, 8), 1),
        ];

        let presence = VisitAggregator::new().aggregate(&spans, &visits);
        assert_eq!(presence[0].total_visits, 1);
        assert_eq!(presence[0].distinct_visit_days, 2);

        let positive = VisitAggregator::with_policy(ZeroCountDayPolicy::RequirePositive)
            .aggregate(&spans, &visits);
        assert_eq!(positive[0].total_visits, 1);
        assert_eq!(positive[0].distinct_visit_days, 1);
    }

    #[test]
    fn test_require_positive_sums_within_day() {
        let spans = vec![span("P1", d(2024, 1, 1), d(2024, 1, 31))];
        let visits = vec![
            VisitEvent::new("P1", d(2024, 1, 4), 0),
            VisitEvent::new("P1", d(2024, 1, 4), 2),
        ];

        let records = VisitAggregator::with_policy(ZeroCountDayPolicy::RequirePositive)
            .aggregate(&spans, &visits);

        assert_eq!(records[0].distinct_visit_days, 1);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut spans = Vec::new();
        let mut visits = Vec::new();
        for p in 0..40u32 {
            let id = p.to_string();
            spans.push(span(&id, d(2024, 1, 1), d(2024, 3, 31)));
            spans.push(span(&id, d(2024, 6, 1), d(2024, 6, 30)));
            for day in 1..=28 {
                if (day + p) % 3 == 0 {
                    visits.push(VisitEvent::new(id.as_str(), d(2024, 2, day), u64::from(p % 4)));
                    visits.push(VisitEvent::new(id.as_str(), d(2024, 6, day), 1));
                }
            }
        }

        let sequential = VisitAggregator::new().aggregate(&spans, &visits);
        let parallel = VisitAggregator::new().parallel(true).aggregate(&spans, &visits);

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let spans = vec![span("P1", d(2024, 1, 1), d(2024, 1, 31))];
        let visits = vec![
            VisitEvent::new("P1", d(2024, 1, 4), 10_000_000_000_000_000_000),
            VisitEvent::new("P1", d(2024, 1, 4), 10_000_000_000_000_000_000),
        ];

        let records = VisitAggregator::with_policy(ZeroCountDayPolicy::RequirePositive)
            .aggregate(&spans, &visits);

        assert_eq!(records[0].total_visits, u64::MAX);
        assert_eq!(records[0].distinct_visit_days, 1);
    }

    #[test]
    fn test_index_window() {
        let visits = vec![
            VisitEvent::new("P1", d(2024, 1, 10), 1),
            VisitEvent::new("P1", d(2024, 1, 20), 1),
        ];
        let index = VisitIndex::build(&visits);

        assert_eq!(index.patient_count(), 1);
        assert_eq!(index.window(&"P1".into(), d(2024, 1, 11), d(2024, 1, 19)).len(), 0);
        assert_eq!(index.window(&"P1".into(), d(2024, 1, 10), d(2024, 1, 20)).len(), 2);
        assert_eq!(index.window(&"P2".into(), d(2024, 1, 1), d(2024, 12, 31)).len(), 0);
    }
}
