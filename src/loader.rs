// 📂 CSV Loader & Sink
// Reads the membership/visit sources into typed records and writes the span
// and result tables. Any unparseable field aborts the load with its line number.

use crate::dates::parse_date;
use crate::error::{PipelineError, Result};
use crate::records::{
    EnrollmentSpan, MembershipRecord, MembershipRow, PatientId, UtilizationRecord, VisitEvent,
    VisitRow, RESULT_COLUMNS, SPAN_COLUMNS,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::path::Path;

/// Largest accepted `outpatient_visit_count` per row
pub const MAX_VISIT_COUNT: u64 = u32::MAX as u64;

// ============================================================================
// READING
// ============================================================================

/// Fail with MissingInput before anything is opened
pub fn require_input(role: &'static str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PipelineError::MissingInput {
            role,
            path: path.to_path_buf(),
        })
    }
}

/// Deserialize every data row of a headed CSV, paired with its 1-based line number
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<(u64, T)>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| PipelineError::csv(path, e))?;

    let headers = rdr
        .headers()
        .map_err(|e| PipelineError::csv(path, e))?
        .clone();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| PipelineError::csv(path, e))?;
        let line = record.position().map_or(0, |p| p.line());
        let row: T = record
            .deserialize(Some(&headers))
            .map_err(|e| PipelineError::csv(path, e))?;
        rows.push((line, row));
    }

    Ok(rows)
}

pub fn load_membership(path: &Path) -> Result<Vec<MembershipRecord>> {
    let rows: Vec<(u64, MembershipRow)> = read_rows(path)?;

    let mut records = Vec::with_capacity(rows.len());
    for (line, row) in rows {
        let patient_id = parse_patient_id(path, line, &row.patient_id)?;
        let month = parse_date(&row.month_year).ok_or_else(|| PipelineError::Parse {
            file: path.to_path_buf(),
            line,
            field: "month_year",
            value: row.month_year.clone(),
            reason: "not a recognized calendar date".to_string(),
        })?;
        records.push(MembershipRecord::new(patient_id, month));
    }

    log::info!("Loaded {} membership rows from {}", records.len(), path.display());
    Ok(records)
}

pub fn load_visits(path: &Path) -> Result<Vec<VisitEvent>> {
    let rows: Vec<(u64, VisitRow)> = read_rows(path)?;

    let mut events = Vec::with_capacity(rows.len());
    for (line, row) in rows {
        let patient_id = parse_patient_id(path, line, &row.patient_id)?;
        let date = parse_date(&row.date).ok_or_else(|| PipelineError::Parse {
            file: path.to_path_buf(),
            line,
            field: "date",
            value: row.date.clone(),
            reason: "not a recognized calendar date".to_string(),
        })?;
        let visit_count =
            parse_visit_count(&row.outpatient_visit_count).map_err(|reason| PipelineError::Parse {
                file: path.to_path_buf(),
                line,
                field: "outpatient_visit_count",
                value: row.outpatient_visit_count.clone(),
                reason,
            })?;
        events.push(VisitEvent::new(patient_id, date, visit_count));
    }

    log::info!("Loaded {} visit rows from {}", events.len(), path.display());
    Ok(events)
}

fn parse_patient_id(path: &Path, line: u64, raw: &str) -> Result<PatientId> {
    if raw.trim().is_empty() {
        return Err(PipelineError::Parse {
            file: path.to_path_buf(),
            line,
            field: "patient_id",
            value: raw.to_string(),
            reason: "empty identifier".to_string(),
        });
    }
    Ok(PatientId::new(raw))
}

/// Non-negative integer up to `MAX_VISIT_COUNT`; integral floats such as "3.0" are accepted
pub fn parse_visit_count(raw: &str) -> std::result::Result<u64, String> {
    let trimmed = raw.trim();
    let count = match trimmed.parse::<u64>() {
        Ok(count) => count,
        Err(_) => match trimmed.parse::<f64>() {
            Ok(v) if !v.is_finite() => return Err("not a finite number".to_string()),
            Ok(v) if v < 0.0 => return Err("visit count is negative".to_string()),
            Ok(v) if v.fract() != 0.0 => {
                return Err("visit count is not a whole number".to_string())
            }
            Ok(v) if v > MAX_VISIT_COUNT as f64 => {
                return Err("visit count out of range".to_string())
            }
            Ok(v) => v as u64,
            Err(_) => return Err("not a number".to_string()),
        },
    };

    if count > MAX_VISIT_COUNT {
        return Err("visit count out of range".to_string());
    }
    Ok(count)
}

// ============================================================================
// WRITING
// ============================================================================

pub fn write_spans(path: &Path, spans: &[EnrollmentSpan]) -> Result<()> {
    write_table(path, &SPAN_COLUMNS, spans.iter().map(EnrollmentSpan::to_row))?;
    log::info!("Wrote {} spans to {}", spans.len(), path.display());
    Ok(())
}

pub fn write_results(path: &Path, records: &[UtilizationRecord]) -> Result<()> {
    write_table(path, &RESULT_COLUMNS, records.iter().map(UtilizationRecord::to_row))?;
    log::info!("Wrote {} utilization rows to {}", records.len(), path.display());
    Ok(())
}

/// Write header + rows to a sibling temp file, then rename over `path`.
/// The header is always written, even for an empty table.
fn write_table<R, I>(path: &Path, columns: &[&str], rows: I) -> Result<()>
where
    R: Serialize,
    I: IntoIterator<Item = R>,
{
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("table.csv");
    let tmp_path = parent.join(format!(".{file_name}.tmp"));

    let file = File::create(&tmp_path).map_err(|e| PipelineError::io(&tmp_path, e))?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);

    wtr.write_record(columns)
        .map_err(|e| PipelineError::csv(&tmp_path, e))?;
    for row in rows {
        wtr.serialize(row)
            .map_err(|e| PipelineError::csv(&tmp_path, e))?;
    }
    wtr.flush().map_err(|e| PipelineError::io(&tmp_path, e))?;
    drop(wtr);

    fs::rename(&tmp_path, path).map_err(|e| PipelineError::io(path, e))?;
    Ok(())
}

// ============================================================================
// PROVENANCE
// ============================================================================

/// SHA-256 of a file's bytes, lowercase hex
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher).map_err(|e| PipelineError::io(path, e))?;
    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// TESTS
// ============================================================================
