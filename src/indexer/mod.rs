//! Indexer: builds and refreshes repository graphs from source files.
//!
//! A run scans every file first, without holding any lock, then takes the
//! repository's write lock once and merges the results in input order.
//! Queries therefore never observe a half-merged graph.

pub mod progress;
pub mod walk;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::IndexerConfig;
use crate::error::{GraphError, Result};
use crate::graph::{GraphNode, GraphStore, GraphSummary, KnowledgeGraph, NodeType};
use crate::scanner::{self, ScanError, ScanOutput};
pub use progress::{FileError, IndexStatus, IndexingProgress};
pub use walk::collect_sources;

/// One input file: a repository-relative path and its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Result of a successful index or update run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexReport {
    pub summary: GraphSummary,
    pub progress: IndexingProgress,
}

/// An operation-level failure, with the progress recorded up to it.
#[derive(Error, Debug)]
#[error("indexing failed: {error}")]
pub struct IndexFailure {
    #[source]
    pub error: GraphError,
    pub progress: IndexingProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunMode {
    Index,
    Update,
}

impl RunMode {
    fn as_str(&self) -> &'static str {
        match self {
            RunMode::Index => "index",
            RunMode::Update => "update",
        }
    }
}

enum FileScan {
    Scanned(ScanOutput),
    /// The file could not be scanned at all; only its file node remains.
    Failed(String),
}

/// Writes scan results into a [`GraphStore`].
#[derive(Debug, Clone)]
pub struct Indexer {
    store: Arc<GraphStore>,
    config: IndexerConfig,
}

impl Indexer {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self::with_config(store, IndexerConfig::default())
    }

    pub fn with_config(store: Arc<GraphStore>, config: IndexerConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<GraphStore> {
        &self.store
    }

    /// Index `files` into the repository graph, creating it on first use.
    ///
    /// Entries of every listed file are replaced; other files are left
    /// alone. The progress record of the repository is overwritten with a
    /// new run and kept current while the run proceeds.
    pub fn index(
        &self,
        repository_id: &str,
        files: &[SourceFile],
    ) -> std::result::Result<IndexReport, IndexFailure> {
        let mut progress = IndexingProgress::start(files.len());
        self.store.set_progress(repository_id, progress.clone());

        let outcome = self.run(repository_id, files, RunMode::Index, &mut progress);
        let result = finish(outcome, &mut progress);
        self.store.set_progress(repository_id, progress);
        result
    }

    /// Re-scan `changed_files` in an indexed repository.
    ///
    /// Falls back to [`Indexer::index`] when the repository has no graph yet.
    /// The stored progress record is left untouched; the run's own progress
    /// comes back in the report.
    pub fn update(
        &self,
        repository_id: &str,
        changed_files: &[SourceFile],
    ) -> std::result::Result<IndexReport, IndexFailure> {
        if !self.store.contains(repository_id) {
            return self.index(repository_id, changed_files);
        }
        let mut progress = IndexingProgress::start(changed_files.len());
        let outcome = self.run(repository_id, changed_files, RunMode::Update, &mut progress);
        finish(outcome, &mut progress)
    }

    fn run(
        &self,
        repository_id: &str,
        files: &[SourceFile],
        mode: RunMode,
        progress: &mut IndexingProgress,
    ) -> Result<GraphSummary> {
        if repository_id.trim().is_empty() {
            return Err(GraphError::InvalidRepositoryId);
        }
        let started = Instant::now();
        info!(
            repository = repository_id,
            files = files.len(),
            mode = mode.as_str(),
            "indexing started"
        );

        let scans: Vec<FileScan> = if self.config.parallel_scan {
            files.par_iter().map(|file| self.scan_one(file)).collect()
        } else {
            files.iter().map(|file| self.scan_one(file)).collect()
        };

        let shared = self.store.get_or_create(repository_id)?;
        let mut graph = shared
            .write()
            .map_err(|_| GraphError::LockPoisoned("repository graph"))?;

        for (file, scan) in files.iter().zip(scans) {
            progress.begin_file(&file.path);
            self.publish(repository_id, mode, progress);

            match scan {
                FileScan::Scanned(output) => {
                    for error in &output.errors {
                        progress.record_error(&file.path, describe(error));
                    }
                    let previous = graph.remove_file(&file.path);
                    merge_file(&mut graph, output, previous, mode);
                }
                FileScan::Failed(message) => {
                    warn!(repository = repository_id, file = %file.path, error = %message, "file skipped");
                    progress.record_error(&file.path, message);
                    let previous = graph.remove_file(&file.path);
                    merge_file(&mut graph, scanner::bare_file(&file.path), previous, mode);
                }
            }

            progress.finish_file();
            self.publish(repository_id, mode, progress);
        }

        link_cross_file(&graph);
        graph.record_run(started.elapsed().as_millis() as u64);
        let summary = graph.summary();

        info!(
            repository = repository_id,
            version = summary.version,
            nodes = summary.stats.total_nodes,
            edges = summary.stats.total_edges,
            errors = progress.errors.len(),
            mode = mode.as_str(),
            "indexing completed"
        );
        Ok(summary)
    }

    /// Scan one file, turning oversize input and scanner panics into a
    /// per-file failure.
    fn scan_one(&self, file: &SourceFile) -> FileScan {
        if file.content.len() > self.config.max_file_bytes {
            return FileScan::Failed(format!(
                "file is {} bytes, limit is {}",
                file.content.len(),
                self.config.max_file_bytes
            ));
        }
        match panic::catch_unwind(AssertUnwindSafe(|| scanner::scan_file(&file.path, &file.content))) {
            Ok(output) => FileScan::Scanned(output),
            Err(payload) => FileScan::Failed(format!("scanner panicked: {}", panic_message(&*payload))),
        }
    }

    fn publish(&self, repository_id: &str, mode: RunMode, progress: &IndexingProgress) {
        if mode == RunMode::Index {
            self.store.set_progress(repository_id, progress.clone());
        }
    }
}

fn finish(
    outcome: Result<GraphSummary>,
    progress: &mut IndexingProgress,
) -> std::result::Result<IndexReport, IndexFailure> {
    match outcome {
        Ok(summary) => {
            progress.complete();
            Ok(IndexReport {
                summary,
                progress: progress.clone(),
            })
        }
        Err(error) => {
            warn!(error = %error, "indexing failed");
            progress.fail(&error);
            Err(IndexFailure {
                error,
                progress: progress.clone(),
            })
        }
    }
}

fn describe(error: &ScanError) -> String {
    match error.line {
        Some(line) => format!("line {}: {}", line, error.message),
        None => error.message.clone(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Add one file's fresh scan, carrying modification history over from the
/// nodes it replaces. A node carries history when an old node of the same
/// type had the same qualified name.
fn merge_file(graph: &mut KnowledgeGraph, output: ScanOutput, previous: Vec<GraphNode>, mode: RunMode) {
    let history: HashMap<(NodeType, String), (u32, DateTime<Utc>)> = previous
        .into_iter()
        .map(|n| ((n.node_type, n.qualified_name()), (n.modification_count, n.last_modified)))
        .collect();

    for mut node in output.nodes {
        if let Some(&(count, last_modified)) = history.get(&(node.node_type, node.qualified_name())) {
            match mode {
                RunMode::Index => {
                    node.modification_count = count;
                    node.last_modified = last_modified;
                }
                RunMode::Update => node.modification_count = count.saturating_add(1),
            }
        }
        graph.upsert_node(node);
    }
    for edge in output.edges {
        graph.add_edge(edge);
    }
}

/// Cross-file call linking.
///
/// Finds callable names defined in more than one file, which is where call
/// edges between files would be resolved. No edges are emitted: a name alone
/// cannot pick between the candidates. Returns the number of such names.
fn link_cross_file(graph: &KnowledgeGraph) -> usize {
    let mut files_by_name: BTreeMap<&str, HashSet<&str>> = BTreeMap::new();
    for node in graph.nodes() {
        if node.node_type.is_callable() {
            files_by_name
                .entry(node.name.as_str())
                .or_default()
                .insert(node.file.as_str());
        }
    }
    let candidates = files_by_name.values().filter(|files| files.len() > 1).count();
    debug!(
        repository = graph.repository_id(),
        candidates, "cross-file link pass found ambiguous callables"
    );
    candidates
}
