// 🔄 Batch Pipeline
// locate inputs → load → build spans → aggregate → check → write both tables → summarize
//
// Inputs are fully loaded before any computation and nothing is written until
// every stage has succeeded.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::loader::{file_sha256, load_membership, load_visits, require_input, write_results, write_spans};
use crate::quality::{QualityEngine, QualityReport, Severity};
use crate::records::{EnrollmentSpan, UtilizationRecord};
use crate::spans::SpanBuilder;
use crate::summary::RunSummary;
use crate::utilization::{VisitAggregator, VisitIndex};

#[derive(Debug)]
pub struct PipelineOutput {
    pub spans: Vec<EnrollmentSpan>,
    pub records: Vec<UtilizationRecord>,
    pub quality: QualityReport,
    pub summary: RunSummary,
}

pub fn run(config: &PipelineConfig) -> Result<PipelineOutput> {
    require_input("membership", &config.membership_path)?;
    require_input("visits", &config.visits_path)?;

    let membership = load_membership(&config.membership_path)?;
    let visits = load_visits(&config.visits_path)?;

    let builder = SpanBuilder::with_gap_tolerance(config.gap_tolerance_days).parallel(config.parallel);
    let spans = builder.build_spans(&membership);
    log::info!("Built {} enrollment spans", spans.len());

    let index = VisitIndex::build(&visits);
    log::info!(
        "Indexed {} visit rows for {} patients",
        visits.len(),
        index.patient_count()
    );

    let aggregator = VisitAggregator::with_policy(config.zero_count_days).parallel(config.parallel);
    let records = aggregator.aggregate_indexed(&spans, &index);

    let quality = QualityEngine::new().validate_records(&records);
    for issue in quality.issues.iter().filter(|i| i.severity != Severity::Info) {
        log::warn!("line {}: {} ({})", issue.line, issue.message, issue.rule);
    }

    let summary = RunSummary::from_run(
        config.gap_tolerance_days,
        &membership,
        &visits,
        &spans,
        &records,
    )
    .with_fingerprints(
        file_sha256(&config.membership_path)?,
        file_sha256(&config.visits_path)?,
    );

    if summary.zero_count_visit_rows > 0 {
        log::warn!(
            "{} visit rows have outpatient_visit_count = 0 (zero-count day policy: {:?})",
            summary.zero_count_visit_rows,
            config.zero_count_days
        );
    }

    write_spans(&config.span_output_path(), &spans)?;
    write_results(&config.result_output_path(), &records)?;

    Ok(PipelineOutput {
        spans,
        records,
        quality,
        summary,
    })
}
