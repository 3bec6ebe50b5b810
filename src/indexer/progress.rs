//! Progress of one indexing run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GraphError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStatus {
    Idle,
    Indexing,
    Completed,
    Failed,
}

/// A problem with one file, or with the whole run when `recoverable` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub file: String,
    pub error: String,
    pub recoverable: bool,
}

/// Status and errors of the current or last `index` run of a repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexingProgress {
    pub run_id: Uuid,
    pub status: IndexStatus,
    pub total_files: usize,
    pub processed_files: usize,
    pub current_file: Option<String>,
    pub errors: Vec<FileError>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl IndexingProgress {
    /// A record for a repository that has never been indexed.
    pub fn idle() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: IndexStatus::Idle,
            total_files: 0,
            processed_files: 0,
            current_file: None,
            errors: Vec::new(),
            started_at: None,
            completed_at: None,
        }
    }

    /// A fresh run over `total_files` files.
    pub fn start(total_files: usize) -> Self {
        Self {
            status: IndexStatus::Indexing,
            total_files,
            started_at: Some(Utc::now()),
            ..Self::idle()
        }
    }

    pub fn begin_file(&mut self, file: &str) {
        self.current_file = Some(file.to_string());
    }

    pub fn finish_file(&mut self) {
        self.processed_files += 1;
        self.current_file = None;
    }

    pub fn record_error(&mut self, file: &str, error: impl Into<String>) {
        self.errors.push(FileError {
            file: file.to_string(),
            error: error.into(),
            recoverable: true,
        });
    }

    pub fn complete(&mut self) {
        self.status = IndexStatus::Completed;
        self.current_file = None;
        self.completed_at = Some(Utc::now());
    }

    /// Mark the run failed; the operation error is recorded as unrecoverable.
    pub fn fail(&mut self, error: &GraphError) {
        self.errors.push(FileError {
            file: self.current_file.clone().unwrap_or_default(),
            error: error.to_string(),
            recoverable: false,
        });
        self.status = IndexStatus::Failed;
        self.current_file = None;
        self.completed_at = Some(Utc::now());
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, IndexStatus::Completed | IndexStatus::Failed)
    }
}

impl Default for IndexingProgress {
    fn default() -> Self {
        Self::idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_gets_new_run_id() {
        let a = IndexingProgress::start(3);
        let b = IndexingProgress::start(3);
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.status, IndexStatus::Indexing);
        assert_eq!(a.total_files, 3);
        assert!(a.started_at.is_some());
        assert!(a.completed_at.is_none());
    }

    #[test]
    fn test_file_lifecycle() {
        let mut progress = IndexingProgress::start(2);
        progress.begin_file("a.ts");
        assert_eq!(progress.current_file.as_deref(), Some("a.ts"));
        progress.record_error("a.ts", "line 3: unterminated block");
        progress.finish_file();
        assert_eq!(progress.processed_files, 1);
        assert!(progress.current_file.is_none());
        progress.complete();

        assert_eq!(progress.status, IndexStatus::Completed);
        assert_eq!(progress.errors.len(), 1);
        assert!(progress.errors[0].recoverable);
        assert!(progress.is_finished());
    }

    #[test]
    fn test_fail_records_unrecoverable_error() {
        let mut progress = IndexingProgress::start(0);
        progress.fail(&GraphError::InvalidRepositoryId);
        assert_eq!(progress.status, IndexStatus::Failed);
        assert!(!progress.errors[0].recoverable);
        assert!(progress.completed_at.is_some());
    }

    #[test]
    fn test_serializes_lowercase_status_and_camel_case_fields() {
        let json = serde_json::to_value(IndexingProgress::idle()).unwrap();
        assert_eq!(json["status"], "idle");
        assert!(json.get("processedFiles").is_some());
        assert!(json.get("runId").is_some());
    }
}
