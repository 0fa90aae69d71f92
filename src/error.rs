// 🚨 Error Taxonomy
// Loading errors abort the whole run; nothing is written after one of these.

use std::path::PathBuf;

/// Errors raised while locating, reading or writing tabular data.
///
/// A run with zero matching visits for a span is NOT an error: it surfaces as
/// zero counts and is tallied in the run summary instead.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A required input file does not exist
    #[error("{role} input not found: {}", .path.display())]
    MissingInput { role: &'static str, path: PathBuf },

    /// A field could not be interpreted as its expected type
    #[error("{}:{line}: cannot parse {field} {value:?}: {reason}", .file.display())]
    Parse {
        file: PathBuf,
        line: u64,
        field: &'static str,
        value: String,
        reason: String,
    },

    /// CSV framing or header problem
    #[error("CSV error in {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Filesystem failure
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        PipelineError::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for the "input cannot be located" class of failure
    pub fn is_missing_input(&self) -> bool {
        matches!(self, PipelineError::MissingInput { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
