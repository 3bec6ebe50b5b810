//! Registry of repository graphs and their indexing progress.
//!
//! A `GraphStore` is an ordinary value shared through an `Arc`; the indexer
//! writes through it and the query engine reads through it. Each repository
//! graph sits behind its own `RwLock`, so work on one repository never
//! blocks another beyond the registry lookup.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use super::engine::KnowledgeGraph;
use super::types::{GraphExport, GraphNode, GraphSummary};
use crate::error::{GraphError, QueryError, Result};
use crate::indexer::progress::IndexingProgress;

/// One repository graph, lockable independently of the others.
pub type SharedGraph = Arc<RwLock<KnowledgeGraph>>;

#[derive(Debug, Default)]
pub struct GraphStore {
    graphs: RwLock<HashMap<String, SharedGraph>>,
    progress: RwLock<HashMap<String, IndexingProgress>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The graph for `repository_id`, if it has been indexed.
    pub fn get(&self, repository_id: &str) -> Result<Option<SharedGraph>> {
        let graphs = self
            .graphs
            .read()
            .map_err(|_| GraphError::LockPoisoned("graph registry"))?;
        Ok(graphs.get(repository_id).cloned())
    }

    /// The graph for `repository_id`, created empty on first use.
    pub fn get_or_create(&self, repository_id: &str) -> Result<SharedGraph> {
        if let Some(graph) = self.get(repository_id)? {
            return Ok(graph);
        }
        let mut graphs = self
            .graphs
            .write()
            .map_err(|_| GraphError::LockPoisoned("graph registry"))?;
        let graph = graphs
            .entry(repository_id.to_string())
            .or_insert_with(|| Arc::new(RwLock::new(KnowledgeGraph::new(repository_id))));
        Ok(Arc::clone(graph))
    }

    pub fn contains(&self, repository_id: &str) -> bool {
        matches!(self.get(repository_id), Ok(Some(_)))
    }

    /// Repository ids with a graph, sorted.
    pub fn repositories(&self) -> Vec<String> {
        let graphs = self.graphs.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<String> = graphs.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Drop a repository's graph and progress record. Returns whether a
    /// graph existed.
    pub fn evict(&self, repository_id: &str) -> Result<bool> {
        let removed = self
            .graphs
            .write()
            .map_err(|_| GraphError::LockPoisoned("graph registry"))?
            .remove(repository_id)
            .is_some();
        self.progress
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(repository_id);
        Ok(removed)
    }

    // ─── Progress ───────────────────────────────────────────────

    /// Progress of the current or last `index` run; idle when none ran.
    pub fn progress(&self, repository_id: &str) -> IndexingProgress {
        self.progress
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(repository_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_progress(&self, repository_id: &str, progress: IndexingProgress) {
        self.progress
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(repository_id.to_string(), progress);
    }

    // ─── Read accessors ─────────────────────────────────────────

    /// Run `f` against a repository graph under its read lock.
    pub fn read<T>(
        &self,
        repository_id: &str,
        f: impl FnOnce(&KnowledgeGraph) -> T,
    ) -> std::result::Result<T, QueryError> {
        let graph = self
            .get(repository_id)
            .map_err(|_| QueryError::LockPoisoned("graph registry"))?
            .ok_or_else(|| QueryError::RepositoryNotFound(repository_id.to_string()))?;
        let guard: RwLockReadGuard<'_, KnowledgeGraph> = graph
            .read()
            .map_err(|_| QueryError::LockPoisoned("repository graph"))?;
        Ok(f(&guard))
    }

    pub fn summary(&self, repository_id: &str) -> std::result::Result<GraphSummary, QueryError> {
        self.read(repository_id, KnowledgeGraph::summary)
    }

    /// Every node and edge of a repository, in insertion order.
    pub fn graph(&self, repository_id: &str) -> std::result::Result<GraphExport, QueryError> {
        self.read(repository_id, KnowledgeGraph::export)
    }

    pub fn node(&self, repository_id: &str, node_id: &str) -> std::result::Result<GraphNode, QueryError> {
        self.read(repository_id, |g| g.node(node_id).cloned())?
            .ok_or_else(|| QueryError::NodeNotFound(node_id.to_string()))
    }

    /// Real nodes matching a placeholder id such as `class:Base`.
    pub fn resolve_symbol(
        &self,
        repository_id: &str,
        symbolic_id: &str,
    ) -> std::result::Result<Vec<GraphNode>, QueryError> {
        self.read(repository_id, |g| {
            g.resolve_symbolic(symbolic_id).into_iter().cloned().collect()
        })
    }
}
