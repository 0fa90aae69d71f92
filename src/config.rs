// ⚙️ Pipeline Configuration
// Defaults reproduce the conventional batch layout; every knob can be overridden.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Days of slack allowed past "cursor + 1 month" before a new span starts
pub const DEFAULT_GAP_TOLERANCE_DAYS: u32 = 2;

pub const DEFAULT_DATA_DIR: &str = "data";
pub const MEMBERSHIP_FILE: &str = "patient_id_month_year.csv";
pub const VISITS_FILE: &str = "outpatient_visits_file.csv";
pub const SPAN_OUTPUT_FILE: &str = "patient_enrollment_span.csv";
pub const RESULT_OUTPUT_FILE: &str = "result.csv";

/// How a visit row with `visit_count = 0` affects the distinct-day count.
///
/// `CountPresence` matches the historical output: any row present in the
/// window marks its date as a visit day, whatever the count. That makes a
/// zero-count row a "day with a visit", which is probably not what the metric
/// name promises; `RequirePositive` only counts days whose summed count is ≥ 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroCountDayPolicy {
    #[default]
    CountPresence,
    RequirePositive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub membership_path: PathBuf,
    pub visits_path: PathBuf,
    pub output_dir: PathBuf,
    pub gap_tolerance_days: u32,
    pub zero_count_days: ZeroCountDayPolicy,
    /// Shard builder/aggregator work across rayon's pool
    pub parallel: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_data_dir(DEFAULT_DATA_DIR)
    }
}

impl PipelineConfig {
    /// Conventional input names under `data_dir`, outputs in the working directory
    pub fn from_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        PipelineConfig {
            membership_path: data_dir.join(MEMBERSHIP_FILE),
            visits_path: data_dir.join(VISITS_FILE),
            output_dir: PathBuf::from("."),
            gap_tolerance_days: DEFAULT_GAP_TOLERANCE_DAYS,
            zero_count_days: ZeroCountDayPolicy::default(),
            parallel: false,
        }
    }

    pub fn with_membership_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.membership_path = path.into();
        self
    }

    pub fn with_visits_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.visits_path = path.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_gap_tolerance_days(mut self, days: u32) -> Self {
        self.gap_tolerance_days = days;
        self
    }

    pub fn with_zero_count_days(mut self, policy: ZeroCountDayPolicy) -> Self {
        self.zero_count_days = policy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn span_output_path(&self) -> PathBuf {
        self.output_dir.join(SPAN_OUTPUT_FILE)
    }

    pub fn result_output_path(&self) -> PathBuf {
        self.output_dir.join(RESULT_OUTPUT_FILE)
    }
}
