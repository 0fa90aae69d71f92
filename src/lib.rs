// Enrollment Spans - Core Library
// Monthly membership → contiguous enrollment spans → outpatient utilization per span

pub mod config;
pub mod dates;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod quality;
pub mod records;
pub mod spans;
pub mod summary;
pub mod utilization;

// Re-export commonly used types
pub use config::{PipelineConfig, ZeroCountDayPolicy, DEFAULT_GAP_TOLERANCE_DAYS};
pub use error::{PipelineError, Result};
pub use loader::{load_membership, load_visits, write_results, write_spans};
pub use pipeline::{run, PipelineOutput};
pub use quality::{Expectations, QualityEngine, QualityIssue, QualityReport, Severity};
pub use records::{
    EnrollmentSpan, MembershipRecord, PatientId, UtilizationRecord, VisitEvent,
};
pub use spans::{build_spans, SpanBuilder};
pub use summary::RunSummary;
pub use utilization::{aggregate, VisitAggregator, VisitIndex};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
