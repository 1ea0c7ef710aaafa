//! Review and storage error types.
//!
//! Defined in `labreview-core` so the engine can tell a rejected run apart
//! from a degraded storage backend without string matching.

use thiserror::Error;

/// Reasons a batch review is rejected before any report is scored.
#[derive(Debug, Error)]
pub enum ReviewError {
    /// No course is selected in the application state.
    #[error("no course selected; select a course before starting a review")]
    MissingCourse,

    /// The selection contained no report slots.
    #[error("no reports selected; select at least one report to review")]
    EmptySelection,

    /// A selected slot references an experiment the course does not declare.
    #[error("experiment '{experiment_id}' is not part of course '{course_id}'")]
    UnknownExperiment {
        course_id: String,
        experiment_id: String,
    },

    /// Selected experiments have no review prompt configured.
    #[error("{} experiment(s) have selected reports but no prompt configured: {}", .names.len(), .names.join(", "))]
    UnconfiguredExperiments { names: Vec<String> },
}

/// Failures of the persistence collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be parsed.
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),

    /// The backend refused the write (quota, read-only medium, ...).
    #[error("storage write rejected: {0}")]
    WriteRejected(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Corrupt(e.to_string())
    }
}

impl StorageError {
    /// Returns `true` if the failure happened while parsing stored data.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, StorageError::Corrupt(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_message_lists_names() {
        let err = ReviewError::UnconfiguredExperiments {
            names: vec!["HDFS".into(), "YARN".into()],
        };
        assert_eq!(
            err.to_string(),
            "2 experiment(s) have selected reports but no prompt configured: HDFS, YARN"
        );
    }

    #[test]
    fn json_errors_are_corrupt() {
        let err: StorageError = serde_json::from_str::<Vec<u32>>("{oops")
            .unwrap_err()
            .into();
        assert!(err.is_corrupt());
    }
}
