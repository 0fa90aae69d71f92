// 🧮 Run Summary
// Headline numbers for a finished run: span count, the set of distinct-day values,
// zero-visit spans, and fingerprints of the inputs that produced them.

use crate::records::{EnrollmentSpan, MembershipRecord, UtilizationRecord, VisitEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub completed_at: DateTime<Utc>,
    pub gap_tolerance_days: u32,

    pub membership_rows: usize,
    pub visit_rows: usize,
    pub patients: usize,

    /// Rows written to the span and result tables (always equal)
    pub span_rows: usize,

    /// Every value taken by `ct_days_with_outpatient_visit`, ascending
    pub distinct_day_values: Vec<u64>,
    pub distinct_day_value_count: usize,

    pub zero_visit_spans: usize,
    /// Visit rows with `outpatient_visit_count = 0`
    pub zero_count_visit_rows: usize,

    pub total_visits: u64,
    /// Visit volume not attributed to any span
    pub visits_outside_spans: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub membership_sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visits_sha256: Option<String>,
}

impl RunSummary {
    pub fn from_run(
        gap_tolerance_days: u32,
        membership: &[MembershipRecord],
        visits: &[VisitEvent],
        spans: &[EnrollmentSpan],
        records: &[UtilizationRecord],
    ) -> Self {
        let patients: HashSet<_> = spans.iter().map(|s| &s.patient_id).collect();

        let distinct_day_values: BTreeSet<u64> =
            records.iter().map(|r| r.distinct_visit_days).collect();

        let all_visits = visits
            .iter()
            .fold(0u64, |total, v| total.saturating_add(v.visit_count));
        let attributed = records
            .iter()
            .fold(0u64, |total, r| total.saturating_add(r.total_visits));

        RunSummary {
            run_id: uuid::Uuid::new_v4().to_string(),
            completed_at: Utc::now(),
            gap_tolerance_days,
            membership_rows: membership.len(),
            visit_rows: visits.len(),
            patients: patients.len(),
            span_rows: spans.len(),
            distinct_day_value_count: distinct_day_values.len(),
            distinct_day_values: distinct_day_values.into_iter().collect(),
            zero_visit_spans: records.iter().filter(|r| !r.has_visits()).count(),
            zero_count_visit_rows: visits.iter().filter(|v| v.visit_count == 0).count(),
            total_visits: attributed,
            visits_outside_spans: all_visits.saturating_sub(attributed),
            membership_sha256: None,
            visits_sha256: None,
        }
    }

    pub fn with_fingerprints(mut self, membership_sha256: String, visits_sha256: String) -> Self {
        self.membership_sha256 = Some(membership_sha256);
        self.visits_sha256 = Some(visits_sha256);
        self
    }

    pub fn summary(&self) -> String {
        format!(
            "{} spans for {} patients, {} distinct values of ct_days_with_outpatient_visit, {} spans without visits",
            self.span_rows, self.patients, self.distinct_day_value_count, self.zero_visit_spans
        )
    }

    /// Multi-line report for the terminal
    pub fn render(&self) -> String {
        let values = self
            .distinct_day_values
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let mut out = String::new();
        out.push_str(&format!("Run:                     {}\n", self.run_id));
        out.push_str(&format!("Membership rows:         {}\n", self.membership_rows));
        out.push_str(&format!("Visit rows:              {}\n", self.visit_rows));
        out.push_str(&format!("Patients with spans:     {}\n", self.patients));
        out.push_str(&format!("Gap tolerance (days):    {}\n", self.gap_tolerance_days));
        out.push_str(&format!("Enrollment spans:        {}\n", self.span_rows));
        out.push_str(&format!("Spans without visits:    {}\n", self.zero_visit_spans));
        out.push_str(&format!("Visits in spans:         {}\n", self.total_visits));
        out.push_str(&format!("Visits outside spans:    {}\n", self.visits_outside_spans));
        out.push_str(&format!(
            "Distinct day-count values: {} [{}]\n",
            self.distinct_day_value_count, values
        ));
        if self.zero_count_visit_rows > 0 {
            out.push_str(&format!(
                "Zero-count visit rows:   {}\n",
                self.zero_count_visit_rows
            ));
        }
        out
    }
}
