//! In-memory store for tests and throwaway sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use labreview_core::error::StorageError;
use labreview_core::report::TaskRunRecord;
use labreview_core::traits::{PromptConfig, PromptKey, ReviewStore};

/// A `ReviewStore` that keeps everything in process memory.
///
/// Writes can be made to fail to exercise degraded-storage paths.
#[derive(Default)]
pub struct MemoryStore {
    task_records: Mutex<Vec<TaskRunRecord>>,
    prompts: Mutex<HashMap<PromptKey, PromptConfig>>,
    fail_writes: AtomicBool,
    write_count: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects every write.
    pub fn failing() -> Self {
        let store = Self::default();
        store.set_fail_writes(true);
        store
    }

    /// Toggle rejection of every write.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> u32 {
        self.write_count.load(Ordering::Relaxed)
    }

    fn records(&self) -> MutexGuard<'_, Vec<TaskRunRecord>> {
        self.task_records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn prompts(&self) -> MutexGuard<'_, HashMap<PromptKey, PromptConfig>> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(StorageError::WriteRejected("memory store is read-only".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load_task_records(&self) -> Result<Vec<TaskRunRecord>, StorageError> {
        Ok(self.records().clone())
    }

    async fn save_task_records(&self, records: &[TaskRunRecord]) -> Result<(), StorageError> {
        self.check_writable()?;
        *self.records() = records.to_vec();
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn load_prompt(&self, key: &PromptKey) -> Result<Option<PromptConfig>, StorageError> {
        Ok(self.prompts().get(key).cloned())
    }

    async fn save_prompt(&self, key: &PromptKey, config: &PromptConfig) -> Result<(), StorageError> {
        self.check_writable()?;
        self.prompts().insert(key.clone(), config.clone());
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn prepend_task_record(&self, record: TaskRunRecord) -> Result<(), StorageError> {
        self.check_writable()?;
        self.records().insert(0, record);
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use labreview_core::catalog::builtin_catalog;
    use labreview_core::model::ReportType;
    use labreview_core::report::finalize_run;

    fn run(id: &str) -> TaskRunRecord {
        let catalog = builtin_catalog();
        finalize_run(id, &catalog.courses[0], &[], Utc::now())
    }

    #[tokio::test]
    async fn prepend_keeps_most_recent_first() {
        let store = MemoryStore::new();
        store.prepend_task_record(run("a")).await.unwrap();
        store.prepend_task_record(run("b")).await.unwrap();

        let ids: Vec<String> = store
            .load_task_records()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_prepends_keep_every_record() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..20)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move { store.prepend_task_record(run(&format!("r{i}"))).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(store.load_task_records().await.unwrap().len(), 20);
        assert_eq!(store.write_count(), 20);
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let store = MemoryStore::new();
        store.prepend_task_record(run("a")).await.unwrap();
        store.prepend_task_record(run("b")).await.unwrap();

        assert!(store.delete_task_record("a").await.unwrap());
        assert!(!store.delete_task_record("a").await.unwrap());
        assert_eq!(store.load_task_records().await.unwrap().len(), 1);

        store.clear_task_records().await.unwrap();
        assert!(store.load_task_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_store_rejects_writes() {
        let store = MemoryStore::failing();
        let err = store.prepend_task_record(run("a")).await.unwrap_err();
        assert!(matches!(err, StorageError::WriteRejected(_)));
        let key = PromptKey::new("hadoop", "hdfs_exp");
        assert!(store
            .save_prompt(&key, &PromptConfig::new(ReportType::Word, "x"))
            .await
            .is_err());

        store.set_fail_writes(false);
        store
            .save_prompt(&key, &PromptConfig::new(ReportType::Word, "x"))
            .await
            .unwrap();
        assert!(store.load_prompt(&key).await.unwrap().is_some());
    }
}
