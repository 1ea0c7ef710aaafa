//! JSON file store.
//!
//! Keeps two files in a data directory:
//!
//! * `task_records.json`: array of finished runs, most recent first.
//! * `prompts.json`: `{ course_id: { experiment_id: { "type", "prompt" } } }`.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use labreview_core::error::StorageError;
use labreview_core::report::TaskRunRecord;
use labreview_core::traits::{PromptConfig, PromptKey, ReviewStore};

pub const TASK_RECORDS_FILE: &str = "task_records.json";
pub const PROMPTS_FILE: &str = "prompts.json";

type PromptTable = BTreeMap<String, BTreeMap<String, PromptConfig>>;

/// A `ReviewStore` backed by JSON files in one directory.
pub struct JsonFileStore {
    data_dir: PathBuf,
    // Held across every read-modify-write cycle within this process.
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn task_records_path(&self) -> PathBuf {
        self.data_dir.join(TASK_RECORDS_FILE)
    }

    fn prompts_path(&self) -> PathBuf {
        self.data_dir.join(PROMPTS_FILE)
    }

    async fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_atomic(&self, path: &Path, content: String) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.data_dir).await?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_records(&self) -> Result<Vec<TaskRunRecord>, StorageError> {
        match Self::read_optional(&self.task_records_path()).await? {
            Some(content) if !content.trim().is_empty() => Ok(serde_json::from_str(&content)?),
            _ => Ok(Vec::new()),
        }
    }

    /// Write the run list. Callers must hold `lock`.
    async fn write_records(&self, records: &[TaskRunRecord]) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(records)?;
        self.write_atomic(&self.task_records_path(), json).await?;
        tracing::debug!("saved {} task record(s) to {}", records.len(), self.data_dir.display());
        Ok(())
    }

    async fn read_prompts(&self) -> Result<PromptTable, StorageError> {
        match Self::read_optional(&self.prompts_path()).await? {
            Some(content) if !content.trim().is_empty() => Ok(serde_json::from_str(&content)?),
            _ => Ok(PromptTable::new()),
        }
    }
}

#[async_trait]
impl ReviewStore for JsonFileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn load_task_records(&self) -> Result<Vec<TaskRunRecord>, StorageError> {
        self.read_records().await
    }

    async fn save_task_records(&self, records: &[TaskRunRecord]) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        self.write_records(records).await
    }

    async fn load_prompt(&self, key: &PromptKey) -> Result<Option<PromptConfig>, StorageError> {
        let table = self.read_prompts().await?;
        Ok(table
            .get(&key.course_id)
            .and_then(|exps| exps.get(&key.experiment_id))
            .cloned())
    }

    async fn save_prompt(&self, key: &PromptKey, config: &PromptConfig) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut table = self.read_prompts().await?;
        table
            .entry(key.course_id.clone())
            .or_default()
            .insert(key.experiment_id.clone(), config.clone());
        let json = serde_json::to_string_pretty(&table)?;
        self.write_atomic(&self.prompts_path(), json).await
    }

    // An unreadable run list is never overwritten; the error goes back to the caller.
    async fn prepend_task_record(&self, record: TaskRunRecord) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_records().await?;
        records.insert(0, record);
        self.write_records(&records).await
    }

    async fn delete_task_record(&self, id: &str) -> Result<bool, StorageError> {
        let _guard = self.lock.lock().await;
        let mut records = self.read_records().await?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Ok(false);
        }
        self.write_records(&records).await?;
        Ok(true)
    }

    async fn clear_task_records(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        self.write_records(&[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Utc;
    use labreview_core::catalog::builtin_catalog;
    use labreview_core::engine::{ReviewEngine, ReviewEngineConfig};
    use labreview_core::error::ReviewError;
    use labreview_core::model::ReportType;
    use labreview_core::report::finalize_run;
    use labreview_core::traits::{load_prompt_or_none, load_task_records_or_empty};

    fn run(id: &str) -> TaskRunRecord {
        let catalog = builtin_catalog();
        finalize_run(id, &catalog.courses[1], &[], Utc::now())
    }

    #[tokio::test]
    async fn missing_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("not-yet"));
        assert!(store.load_task_records().await.unwrap().is_empty());
        assert!(store
            .load_prompt(&PromptKey::new("java", "java_exp1"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn task_records_persist_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.prepend_task_record(run("java-1")).await.unwrap();
        store.prepend_task_record(run("java-2")).await.unwrap();

        let reopened = JsonFileStore::new(dir.path());
        let records = reopened.load_task_records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "java-2");

        let raw = std::fs::read_to_string(dir.path().join(TASK_RECORDS_FILE)).unwrap();
        assert!(raw.contains("\"courseName\""));
        assert!(raw.contains("\"byExperiment\""));
    }

    #[tokio::test]
    async fn prompts_are_nested_by_course_and_experiment() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store
            .save_prompt(
                &PromptKey::new("java", "java_exp2"),
                &PromptConfig::new(ReportType::Dify, "check the workflow"),
            )
            .await
            .unwrap();
        store
            .save_prompt(
                &PromptKey::new("java", "java_exp3"),
                &PromptConfig::new(ReportType::Word, "check the report"),
            )
            .await
            .unwrap();

        let raw = std::fs::read_to_string(dir.path().join(PROMPTS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["java"]["java_exp2"]["type"], "dify");
        assert_eq!(value["java"]["java_exp3"]["prompt"], "check the report");

        let loaded = store
            .load_prompt(&PromptKey::new("java", "java_exp2"))
            .await
            .unwrap()
            .unwrap();
        assert!(loaded.is_configured());
    }

    #[tokio::test]
    async fn corrupt_records_are_kept_and_prepend_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TASK_RECORDS_FILE);
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonFileStore::new(dir.path());

        let err = store.load_task_records().await.unwrap_err();
        assert!(err.is_corrupt());

        let err = store.prepend_task_record(run("java-3")).await.unwrap_err();
        assert!(err.is_corrupt());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not json");

        assert!(store.delete_task_record("java-3").await.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{not json");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_prepends_keep_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFileStore::new(dir.path()));

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .prepend_task_record(run(&format!("java-{i}")))
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let mut ids: Vec<String> = store
            .load_task_records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[tokio::test]
    async fn corrupt_records_read_as_no_prior_records() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(TASK_RECORDS_FILE), "[{\"id\":").unwrap();
        let store = JsonFileStore::new(dir.path());
        assert!(load_task_records_or_empty(&store).await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_prompts_count_as_unconfigured() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PROMPTS_FILE), "not json at all").unwrap();
        let store: Arc<dyn ReviewStore> = Arc::new(JsonFileStore::new(dir.path()));
        assert!(load_prompt_or_none(store.as_ref(), &PromptKey::new("java", "java_exp1"))
            .await
            .is_none());

        let catalog = builtin_catalog();
        let course = catalog.course("java").unwrap();
        let slots = course.experiments[0].slots();
        let engine = ReviewEngine::new(store, ReviewEngineConfig::default());
        let err = engine.validate(course, &slots).await.unwrap_err();
        match err {
            ReviewError::UnconfiguredExperiments { names } => {
                assert_eq!(names, vec![course.experiments[0].name.clone()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn clear_removes_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.prepend_task_record(run("a")).await.unwrap();
        store.clear_task_records().await.unwrap();
        assert!(store.load_task_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());
        store.prepend_task_record(run("a")).await.unwrap();
        store.prepend_task_record(run("b")).await.unwrap();

        assert!(store.delete_task_record("a").await.unwrap());
        let ids: Vec<String> = store
            .load_task_records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["b"]);
    }
}
