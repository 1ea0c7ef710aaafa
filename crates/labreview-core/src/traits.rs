//! Persistence and progress seams.
//!
//! `ReviewStore` is implemented by the backends in `labreview-store`;
//! `ProgressReporter` by whatever displays a running review.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::engine::ProgressEvent;
use crate::error::StorageError;
use crate::model::ReportType;
use crate::report::TaskRunRecord;

// ---------------------------------------------------------------------------
// Prompt configuration
// ---------------------------------------------------------------------------

/// Identifies the prompt configuration of one experiment in one course.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PromptKey {
    pub course_id: String,
    pub experiment_id: String,
}

impl PromptKey {
    pub fn new(course_id: impl Into<String>, experiment_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            experiment_id: experiment_id.into(),
        }
    }
}

impl fmt::Display for PromptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.course_id, self.experiment_id)
    }
}

/// The review prompt configured for an experiment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(rename = "type")]
    pub report_type: ReportType,
    #[serde(default)]
    pub prompt: String,
}

impl PromptConfig {
    pub fn new(report_type: ReportType, prompt: impl Into<String>) -> Self {
        Self {
            report_type,
            prompt: prompt.into(),
        }
    }

    /// An experiment counts as configured once its prompt is non-blank.
    pub fn is_configured(&self) -> bool {
        !self.prompt.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Persistence collaborator
// ---------------------------------------------------------------------------

/// Durable key/value storage for finished runs and prompt configs.
///
/// Task records are kept most-recent-first.
#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Human-readable backend name (e.g. "file").
    fn name(&self) -> &str;

    /// Load all finished runs, most recent first.
    async fn load_task_records(&self) -> Result<Vec<TaskRunRecord>, StorageError>;

    /// Replace the stored run list.
    async fn save_task_records(&self, records: &[TaskRunRecord]) -> Result<(), StorageError>;

    /// Load the prompt configured for an experiment, if any.
    async fn load_prompt(&self, key: &PromptKey) -> Result<Option<PromptConfig>, StorageError>;

    /// Store the prompt for an experiment, replacing any previous one.
    async fn save_prompt(&self, key: &PromptKey, config: &PromptConfig)
        -> Result<(), StorageError>;

    /// Insert a finished run at the front of the list.
    async fn prepend_task_record(&self, record: TaskRunRecord) -> Result<(), StorageError> {
        let mut records = self.load_task_records().await?;
        records.insert(0, record);
        self.save_task_records(&records).await
    }

    /// Delete one run by id. Returns `false` if no run had that id.
    async fn delete_task_record(&self, id: &str) -> Result<bool, StorageError> {
        let mut records = self.load_task_records().await?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.save_task_records(&records).await?;
        Ok(true)
    }

    /// Delete every stored run.
    async fn clear_task_records(&self) -> Result<(), StorageError> {
        self.save_task_records(&[]).await
    }
}

/// Load the stored runs, treating any storage failure as "no prior records".
pub async fn load_task_records_or_empty(store: &dyn ReviewStore) -> Vec<TaskRunRecord> {
    match store.load_task_records().await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!("failed to load task records from {} store: {e}", store.name());
            Vec::new()
        }
    }
}

/// Load a prompt config, treating any storage failure as "not configured".
pub async fn load_prompt_or_none(store: &dyn ReviewStore, key: &PromptKey) -> Option<PromptConfig> {
    match store.load_prompt(key).await {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("failed to load prompt for {key}: {e}");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Progress/display collaborator
// ---------------------------------------------------------------------------

/// Receives progress events of a running review.
pub trait ProgressReporter: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

/// No-op progress reporter.
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn on_event(&self, _: &ProgressEvent) {}
}
