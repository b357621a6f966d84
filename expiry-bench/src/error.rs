//! Error taxonomy for a benchmark run.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    /// Bad command-line input. Fatal before any server interaction.
    #[error("invalid argument '{field}': {reason}")]
    InvalidArgument { field: &'static str, reason: String },

    /// A required environment value is absent. Fatal.
    #[error("required environment variable {name} is not defined")]
    ConfigurationMissing { name: String },

    /// An external process exited unsuccessfully.
    #[error("process exited with {}: {}", exit_code_label(.exit_code), .stderr.trim())]
    ProcessFailure { exit_code: Option<i32>, stderr: String },

    /// Tool output did not have the expected shape.
    #[error("unparsable row '{row}': {reason}")]
    ParseError { row: String, reason: String },

    /// A step outlived its deadline. Aborts the remaining sequence.
    #[error("step '{step}' timed out after {after:?}")]
    Timeout { step: String, after: Duration },

    /// The operator interrupted the run between two steps.
    #[error("run cancelled before step '{step}'")]
    Cancelled { step: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (killed by signal)".to_string(),
    }
}

impl BenchError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        BenchError::InvalidArgument {
            field,
            reason: reason.into(),
        }
    }

    /// Errors after which no further step may run, regardless of policy.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BenchError::Timeout { .. } | BenchError::Cancelled { .. })
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
