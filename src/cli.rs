// 🖥️ Command Line
// Running with no subcommand is the same as `run` with every default,
// so the bare binary reproduces the conventional batch.

use clap::{Args, Parser, Subcommand, ValueEnum};
use enrollment_spans::{PipelineConfig, ZeroCountDayPolicy, DEFAULT_GAP_TOLERANCE_DAYS};

/// Upper bound for `--gap-tolerance-days`; anything wider bridges a whole year
pub const MAX_GAP_TOLERANCE_DAYS: u32 = 366;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "enrollment-spans",
    version,
    about = "Consolidate monthly enrollment into spans and count outpatient visits per span"
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build spans, aggregate visits, write patient_enrollment_span.csv and result.csv
    Run(RunArgs),
    /// Check an existing result table
    Validate(ValidateArgs),
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Directory holding patient_id_month_year.csv and outpatient_visits_file.csv
    #[arg(long, value_name = "DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Membership table (overrides --data-dir)
    #[arg(long, value_name = "CSV")]
    pub membership: Option<PathBuf>,

    /// Visit table (overrides --data-dir)
    #[arg(long, value_name = "CSV")]
    pub visits: Option<PathBuf>,

    /// Where the span and result tables are written
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Days of slack past the expected next month before a new span starts
    #[arg(
        long,
        value_name = "DAYS",
        default_value_t = DEFAULT_GAP_TOLERANCE_DAYS,
        value_parser = clap::value_parser!(u32).range(..=i64::from(MAX_GAP_TOLERANCE_DAYS))
    )]
    pub gap_tolerance_days: u32,

    /// Whether a visit row with count 0 marks a visit day
    #[arg(long, value_enum, default_value_t = ZeroCountDays::Presence)]
    pub zero_count_days: ZeroCountDays,

    /// Process patients on all cores
    #[arg(long)]
    pub parallel: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Result table to check
    #[arg(long, value_name = "CSV", default_value = "result.csv")]
    pub result: PathBuf,

    /// Fail unless the table has exactly this many rows
    #[arg(long, value_name = "N")]
    pub expect_rows: Option<usize>,

    /// Fail unless ct_days_with_outpatient_visit takes exactly this many distinct values
    #[arg(long, value_name = "N")]
    pub expect_distinct_days: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ZeroCountDays {
    /// Any row present marks the day (historical behavior)
    #[default]
    Presence,
    /// Only days with a summed count >= 1
    Positive,
}

impl From<ZeroCountDays> for ZeroCountDayPolicy {
    fn from(value: ZeroCountDays) -> Self {
        match value {
            ZeroCountDays::Presence => ZeroCountDayPolicy::CountPresence,
            ZeroCountDays::Positive => ZeroCountDayPolicy::RequirePositive,
        }
    }
}

impl RunArgs {
    /// Defaults identical to clap's, for the bare invocation
    pub fn conventional() -> Self {
        RunArgs {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("."),
            gap_tolerance_days: DEFAULT_GAP_TOLERANCE_DAYS,
            ..RunArgs::default()
        }
    }

    pub fn to_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::from_data_dir(&self.data_dir)
            .with_output_dir(&self.output_dir)
            .with_gap_tolerance_days(self.gap_tolerance_days)
            .with_zero_count_days(self.zero_count_days.into())
            .with_parallel(self.parallel);
        if let Some(path) = &self.membership {
            config = config.with_membership_path(path);
        }
        if let Some(path) = &self.visits {
            config = config.with_visits_path(path);
        }
        config
    }
}
