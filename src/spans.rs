// 🧩 Enrollment Span Builder
// Collapses per-month membership into contiguous [start, end] coverage intervals.
//
// Run-length encoding over calendar months with fuzzy adjacency:
//   next <= (cursor + 1 month) + gap_tolerance  → same span
//   otherwise                                   → close at cursor's month end, restart

use crate::config::DEFAULT_GAP_TOLERANCE_DAYS;
use crate::dates::{add_one_month, month_end_from};
use crate::records::{EnrollmentSpan, MembershipRecord, PatientId};
use chrono::{Days, NaiveDate};
use rayon::prelude::*;
use std::collections::BTreeMap;

// ============================================================================
// SPAN BUILDER
// ============================================================================

#[derive(Debug, Clone)]
pub struct SpanBuilder {
    /// Slack in days past the expected next month (default: 2)
    pub gap_tolerance_days: u32,

    /// Run patients on rayon's pool
    pub parallel: bool,
}

impl SpanBuilder {
    pub fn new() -> Self {
        SpanBuilder {
            gap_tolerance_days: DEFAULT_GAP_TOLERANCE_DAYS,
            parallel: false,
        }
    }

    pub fn with_gap_tolerance(gap_tolerance_days: u32) -> Self {
        SpanBuilder {
            gap_tolerance_days,
            ..Self::new()
        }
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Build spans for every patient.
    ///
    /// Patients come out in ascending `PatientId` order, each patient's spans
    /// chronologically. Input order does not matter.
    pub fn build_spans(&self, records: &[MembershipRecord]) -> Vec<EnrollmentSpan> {
        let groups = group_months(records);

        if self.parallel {
            let per_patient: Vec<Vec<EnrollmentSpan>> = groups
                .into_par_iter()
                .map(|(patient_id, months)| self.patient_spans(patient_id, months))
                .collect();
            per_patient.into_iter().flatten().collect()
        } else {
            groups
                .into_iter()
                .flat_map(|(patient_id, months)| self.patient_spans(patient_id, months))
                .collect()
        }
    }

    /// Spans for a single patient; sorts its months first (the walk needs them ascending)
    pub fn patient_spans(
        &self,
        patient_id: PatientId,
        mut months: Vec<NaiveDate>,
    ) -> Vec<EnrollmentSpan> {
        months.sort_unstable();
        self.walk_sorted(&patient_id, &months)
    }

    fn walk_sorted(&self, patient_id: &PatientId, months: &[NaiveDate]) -> Vec<EnrollmentSpan> {
        let Some((&first, rest)) = months.split_first() else {
            return Vec::new();
        };

        let tolerance = Days::new(u64::from(self.gap_tolerance_days));
        let mut spans = Vec::new();
        let mut span_start = first;
        let mut cursor = first;

        for &next in rest {
            // Past the calendar's end every later month is within reach
            let latest = add_one_month(cursor)
                .checked_add_days(tolerance)
                .unwrap_or(NaiveDate::MAX);

            if next <= latest {
                // Continuous (covers duplicates: next == cursor)
                cursor = next;
            } else {
                spans.push(self.close(patient_id, span_start, cursor));
                span_start = next;
                cursor = next;
            }
        }

        spans.push(self.close(patient_id, span_start, cursor));
        spans
    }

    fn close(&self, patient_id: &PatientId, start: NaiveDate, cursor: NaiveDate) -> EnrollmentSpan {
        EnrollmentSpan {
            patient_id: patient_id.clone(),
            start_date: start,
            end_date: month_end_from(cursor),
        }
    }
}

impl Default for SpanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for `SpanBuilder::new().build_spans(records)`
pub fn build_spans(records: &[MembershipRecord]) -> Vec<EnrollmentSpan> {
    SpanBuilder::new().build_spans(records)
}

fn group_months(records: &[MembershipRecord]) -> BTreeMap<PatientId, Vec<NaiveDate>> {
    let mut groups: BTreeMap<PatientId, Vec<NaiveDate>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.patient_id.clone())
            .or_default()
            .push(record.month);
    }
    groups
}

// ============================================================================
// TESTS
// ============================================================================
