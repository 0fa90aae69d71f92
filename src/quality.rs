// ✅ Result Quality Checks
// Validates a utilization table (in memory or re-read from disk):
//   - required columns present
//   - counts non-negative, days <= visits
//   - span dates well formed (1st of month .. last of month, start <= end)
//   - spans of one patient ordered and non-overlapping
//   - optional expected answers (row count, number of distinct day-count values)

use crate::dates::{is_month_end, is_month_start, parse_date};
use crate::error::{PipelineError, Result};
use crate::loader::read_rows;
use crate::records::{UtilizationRecord, RESULT_COLUMNS};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

// ============================================================================
// REPORT TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Critical, // Output is wrong or unreadable
    Warning,  // Output is suspicious
    Info,     // Worth knowing, nothing to fix
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityIssue {
    pub severity: Severity,
    pub rule: String,
    /// 1-based CSV line, 0 for table-level issues
    pub line: u64,
    pub patient_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub checked_rows: usize,
    pub distinct_day_value_count: usize,
    pub issues: Vec<QualityIssue>,
}

impl QualityReport {
    pub fn passed(&self) -> bool {
        !self.has_critical_issues()
    }

    pub fn has_critical_issues(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Critical)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "Checked {} rows: {} issues ({} critical, {} warnings), {} distinct day-count values",
            self.checked_rows,
            self.issues.len(),
            self.count(Severity::Critical),
            self.count(Severity::Warning),
            self.distinct_day_value_count
        )
    }
}

/// Answers a run is expected to reproduce
#[derive(Debug, Clone, Copy, Default)]
pub struct Expectations {
    pub rows: Option<usize>,
    pub distinct_day_values: Option<usize>,
}

// ============================================================================
// ROW SHAPES
// ============================================================================

/// Result row as read back from disk; counts are signed so negatives can be reported
#[derive(Debug, Deserialize)]
struct ResultCheckRow {
    patient_id: String,
    enrollment_start_date: String,
    enrollment_end_date: String,
    ct_outpatient_visits: i64,
    ct_days_with_outpatient_visit: i64,
}

struct CheckedRow {
    line: u64,
    patient_id: String,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    visits: i64,
    days: i64,
}

// ============================================================================
// QUALITY ENGINE
// ============================================================================

pub struct QualityEngine {
    pub expectations: Expectations,
}

impl QualityEngine {
    pub fn new() -> Self {
        QualityEngine {
            expectations: Expectations::default(),
        }
    }

    pub fn with_expectations(expectations: Expectations) -> Self {
        QualityEngine { expectations }
    }

    /// Check records produced in this process (line numbers count from the header as line 1)
    pub fn validate_records(&self, records: &[UtilizationRecord]) -> QualityReport {
        let rows: Vec<CheckedRow> = records
            .iter()
            .enumerate()
            .map(|(i, r)| CheckedRow {
                line: i as u64 + 2,
                patient_id: r.patient_id.to_string(),
                start: Some(r.start_date),
                end: Some(r.end_date),
                visits: i64::try_from(r.total_visits).unwrap_or(i64::MAX),
                days: i64::try_from(r.distinct_visit_days).unwrap_or(i64::MAX),
            })
            .collect();
        self.check(&rows, Vec::new())
    }

    /// Re-read a result table and check it
    pub fn validate_file(&self, path: &Path) -> Result<QualityReport> {
        if !path.is_file() {
            return Err(PipelineError::MissingInput {
                role: "result",
                path: path.to_path_buf(),
            });
        }

        let missing = missing_columns(path)?;
        if !missing.is_empty() {
            let issues = missing
                .into_iter()
                .map(|column| QualityIssue {
                    severity: Severity::Critical,
                    rule: "required_column".to_string(),
                    line: 1,
                    patient_id: None,
                    message: format!("Missing required column: {column}"),
                })
                .collect();
            return Ok(QualityReport {
                checked_rows: 0,
                distinct_day_value_count: 0,
                issues,
            });
        }

        let raw: Vec<(u64, ResultCheckRow)> = read_rows(path)?;
        let mut issues = Vec::new();
        let rows: Vec<CheckedRow> = raw
            .into_iter()
            .map(|(line, row)| {
                let start = parse_date(&row.enrollment_start_date);
                let end = parse_date(&row.enrollment_end_date);
                for (field, value, parsed) in [
                    ("enrollment_start_date", &row.enrollment_start_date, start),
                    ("enrollment_end_date", &row.enrollment_end_date, end),
                ] {
                    if parsed.is_none() {
                        issues.push(QualityIssue {
                            severity: Severity::Critical,
                            rule: "date_valid".to_string(),
                            line,
                            patient_id: Some(row.patient_id.clone()),
                            message: format!("Invalid {field}: {value:?}"),
                        });
                    }
                }
                CheckedRow {
                    line,
                    patient_id: row.patient_id,
                    start,
                    end,
                    visits: row.ct_outpatient_visits,
                    days: row.ct_days_with_outpatient_visit,
                }
            })
            .collect();

        Ok(self.check(&rows, issues))
    }

    fn check(&self, rows: &[CheckedRow], mut issues: Vec<QualityIssue>) -> QualityReport {
        for row in rows {
            self.check_counts(row, &mut issues);
            self.check_dates(row, &mut issues);
        }
        self.check_ordering(rows, &mut issues);

        let distinct_days: BTreeSet<i64> = rows.iter().map(|r| r.days).collect();
        self.check_expectations(rows.len(), distinct_days.len(), &mut issues);

        QualityReport {
            checked_rows: rows.len(),
            distinct_day_value_count: distinct_days.len(),
            issues,
        }
    }

    fn check_counts(&self, row: &CheckedRow, issues: &mut Vec<QualityIssue>) {
        if row.visits < 0 || row.days < 0 {
            issues.push(issue(
                Severity::Critical,
                "counts_non_negative",
                row,
                format!("Negative count (visits={}, days={})", row.visits, row.days),
            ));
        }

        // Only possible when zero-count visit rows were counted as visit days
        if row.days > row.visits {
            issues.push(issue(
                Severity::Warning,
                "days_within_visits",
                row,
                format!(
                    "{} visit days but only {} visits (zero-count visit rows?)",
                    row.days, row.visits
                ),
            ));
        }
    }

    fn check_dates(&self, row: &CheckedRow, issues: &mut Vec<QualityIssue>) {
        let (Some(start), Some(end)) = (row.start, row.end) else {
            return;
        };

        if start > end {
            issues.push(issue(
                Severity::Critical,
                "span_ordered",
                row,
                format!("Span starts {start} after it ends {end}"),
            ));
        }
        if !is_month_start(start) {
            issues.push(issue(
                Severity::Warning,
                "span_month_start",
                row,
                format!("Span start {start} is not the 1st of a month"),
            ));
        }
        if !is_month_end(end) {
            issues.push(issue(
                Severity::Warning,
                "span_month_end",
                row,
                format!("Span end {end} is not the last day of a month"),
            ));
        }
    }

    /// Spans of a patient must appear chronologically and never overlap
    fn check_ordering(&self, rows: &[CheckedRow], issues: &mut Vec<QualityIssue>) {
        let mut last_end: HashMap<&str, NaiveDate> = HashMap::new();

        for row in rows {
            let (Some(start), Some(end)) = (row.start, row.end) else {
                continue;
            };
            if let Some(prev_end) = last_end.get(row.patient_id.as_str()) {
                if start <= *prev_end {
                    issues.push(issue(
                        Severity::Critical,
                        "spans_disjoint",
                        row,
                        format!("Span starting {start} overlaps or precedes span ending {prev_end}"),
                    ));
                }
            }
            last_end.insert(row.patient_id.as_str(), end);
        }
    }

    fn check_expectations(&self, rows: usize, distinct: usize, issues: &mut Vec<QualityIssue>) {
        if let Some(expected) = self.expectations.rows {
            if rows != expected {
                issues.push(table_issue(
                    "expected_rows",
                    format!("Expected {expected} rows, got {rows}"),
                ));
            }
        }
        if let Some(expected) = self.expectations.distinct_day_values {
            if distinct != expected {
                issues.push(table_issue(
                    "expected_distinct_day_values",
                    format!("Expected {expected} distinct ct_days_with_outpatient_visit values, got {distinct}"),
                ));
            }
        }
    }
}

impl Default for QualityEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn issue(severity: Severity, rule: &str, row: &CheckedRow, message: String) -> QualityIssue {
    QualityIssue {
        severity,
        rule: rule.to_string(),
        line: row.line,
        patient_id: Some(row.patient_id.clone()),
        message,
    }
}

fn table_issue(rule: &str, message: String) -> QualityIssue {
    QualityIssue {
        severity: Severity::Critical,
        rule: rule.to_string(),
        line: 0,
        patient_id: None,
        message,
    }
}

fn missing_columns(path: &Path) -> Result<Vec<&'static str>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| PipelineError::csv(path, e))?;
    let headers = rdr.headers().map_err(|e| PipelineError::csv(path, e))?;

    Ok(RESULT_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .collect())
}

// ============================================================================
// TESTS
// ============================================================================
