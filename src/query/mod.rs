//! Query engine: read-only algorithms over a repository graph.
//!
//! Every query takes the repository's read lock for its whole duration and
//! never mutates the graph. A missing repository or node is a
//! [`QueryError`], never a panic.

pub mod ranking;
pub mod traversal;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::QueryConfig;
use crate::error::QueryError;
use crate::graph::{EdgeType, GraphEdge, GraphNode, GraphStore, GraphSummary, NodeType};

pub type QueryResult<T> = std::result::Result<T, QueryError>;

// ─── Result types ───────────────────────────────────────────────────────────

/// Optional restrictions for [`QueryEngine::neighbors`]. `None` lets
/// everything through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborFilter {
    pub edge_types: Option<Vec<EdgeType>>,
    /// Neighbors that are placeholders never match a node-type filter.
    pub node_types: Option<Vec<NodeType>>,
}

impl NeighborFilter {
    fn accepts_edge(&self, edge_type: EdgeType) -> bool {
        self.edge_types
            .as_ref()
            .map_or(true, |types| types.contains(&edge_type))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborEntry {
    pub edge: GraphEdge,
    /// The vertex at the other end of `edge`.
    pub node_id: String,
    /// `None` when `node_id` is a placeholder.
    pub node: Option<GraphNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeighborsResult {
    pub node_id: String,
    pub incoming: Vec<NeighborEntry>,
    pub outgoing: Vec<NeighborEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_count(impacted: usize) -> Self {
        match impacted {
            n if n > 20 => RiskLevel::Critical,
            n if n > 10 => RiskLevel::High,
            n if n > 5 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactResult {
    pub node_id: String,
    pub max_depth: usize,
    /// Ids reached in one hop, in discovery order.
    pub direct: Vec<String>,
    /// Ids reached in two or more hops.
    pub transitive: Vec<String>,
    /// Test nodes among `direct` and `transitive`.
    pub tests: Vec<String>,
    pub total_impacted: usize,
    pub risk: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathResult {
    pub start: String,
    pub end: String,
    /// Vertex ids from `start` to `end`; empty when unreachable.
    pub path: Vec<String>,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubgraphResult {
    pub root: String,
    pub max_depth: usize,
    pub nodes: Vec<GraphNode>,
    /// Placeholder ids reached, which have no node.
    pub placeholders: Vec<String>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hotspot {
    pub node: GraphNode,
    pub modification_count: u32,
    pub complexity: f64,
    pub score: f64,
}

/// Who owns a node. Always empty until version-control history is wired in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnershipResult {
    pub node_id: String,
    pub primary_owners: Vec<String>,
    pub contributors: Vec<String>,
    pub ownership_score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Prefix,
    Substring,
    Documentation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub text: String,
    pub node_types: Option<Vec<NodeType>>,
    pub threshold: Option<f64>,
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            node_types: None,
            threshold: None,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub node: GraphNode,
    pub score: f64,
    pub matched: MatchKind,
}

// ─── Engine ─────────────────────────────────────────────────────────────────

/// Stateless query front end over a shared [`GraphStore`].
#[derive(Debug, Clone)]
pub struct QueryEngine {
    store: Arc<GraphStore>,
    config: QueryConfig,
}

impl QueryEngine {
    pub fn new(store: Arc<GraphStore>) -> Self {
        Self::with_config(store, QueryConfig::default())
    }

    pub fn with_config(store: Arc<GraphStore>, config: QueryConfig) -> Self {
        Self { store, config }
    }

    pub fn summary(&self, repository_id: &str) -> QueryResult<GraphSummary> {
        self.store.summary(repository_id)
    }

    /// Edges touching `node_id` in both directions, optionally filtered.
    pub fn neighbors(
        &self,
        repository_id: &str,
        node_id: &str,
        filter: &NeighborFilter,
    ) -> QueryResult<NeighborsResult> {
        self.store
            .read(repository_id, |g| traversal::neighbors(g, node_id, filter))?
    }

    /// What a change to `node_id` may affect, up to `max_depth` hops
    /// (configured default when `None`).
    pub fn impact(
        &self,
        repository_id: &str,
        node_id: &str,
        max_depth: Option<usize>,
    ) -> QueryResult<ImpactResult> {
        let depth = max_depth.unwrap_or(self.config.impact_depth);
        self.store
            .read(repository_id, |g| traversal::impact(g, node_id, depth))?
    }

    pub fn path(&self, repository_id: &str, start: &str, end: &str) -> QueryResult<PathResult> {
        self.store
            .read(repository_id, |g| traversal::shortest_path(g, start, end))?
    }

    pub fn subgraph(
        &self,
        repository_id: &str,
        start: &str,
        max_depth: Option<usize>,
    ) -> QueryResult<SubgraphResult> {
        let depth = max_depth.unwrap_or(self.config.subgraph_depth);
        self.store
            .read(repository_id, |g| traversal::subgraph(g, start, depth))?
    }

    pub fn hotspots(&self, repository_id: &str) -> QueryResult<Vec<Hotspot>> {
        let limit = self.config.hotspot_limit;
        self.store
            .read(repository_id, |g| ranking::hotspots(g, limit))
    }

    pub fn ownership(&self, repository_id: &str, node_id: &str) -> QueryResult<OwnershipResult> {
        let known = self.store.read(repository_id, |g| g.contains_vertex(node_id))?;
        if !known {
            return Err(QueryError::NodeNotFound(node_id.to_string()));
        }
        Ok(OwnershipResult {
            node_id: node_id.to_string(),
            primary_owners: Vec::new(),
            contributors: Vec::new(),
            ownership_score: 0.0,
        })
    }

    pub fn semantic_search(&self, repository_id: &str, query: &SearchQuery) -> QueryResult<Vec<SearchHit>> {
        let threshold = query.threshold.unwrap_or(self.config.search_threshold);
        let limit = query.limit.unwrap_or(self.config.search_limit);
        self.store
            .read(repository_id, |g| ranking::search(g, query, threshold, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> QueryEngine {
        let store = Arc::new(GraphStore::new());
        let graph = store.get_or_create("repo").unwrap();
        {
            let mut g = graph.write().unwrap();
            for id in ["a", "b", "c"] {
                g.upsert_node(GraphNode::new(id.into(), NodeType::Function, id.into(), "a.ts".into()));
            }
            g.add_edge(GraphEdge::new("a", "b", EdgeType::Calls));
            g.add_edge(GraphEdge::new("b", "c", EdgeType::Calls));
            g.add_edge(GraphEdge::new("c", "d", EdgeType::Calls));
        }
        QueryEngine::new(store)
    }

    #[test]
    fn test_missing_repository() {
        let engine = engine();
        assert_eq!(
            engine.hotspots("other").unwrap_err(),
            QueryError::RepositoryNotFound("other".into())
        );
    }

    #[test]
    fn test_defaults_come_from_config() {
        let engine = engine();
        let impact = engine.impact("repo", "a", None).unwrap();
        assert_eq!(impact.max_depth, 3);
        assert_eq!(impact.direct, vec!["b"]);
        assert_eq!(impact.transitive, vec!["c", "d"]);

        let shallow = QueryEngine::with_config(
            Arc::clone(&engine.store),
            QueryConfig {
                subgraph_depth: 1,
                ..QueryConfig::default()
            },
        );
        assert_eq!(shallow.subgraph("repo", "a", None).unwrap().nodes.len(), 2);
        assert_eq!(engine.subgraph("repo", "a", None).unwrap().nodes.len(), 3);
    }

    #[test]
    fn test_ownership_placeholder() {
        let engine = engine();
        let owners = engine.ownership("repo", "a").unwrap();
        assert!(owners.primary_owners.is_empty());
        assert!(owners.contributors.is_empty());
        assert_eq!(owners.ownership_score, 0.0);
        assert!(matches!(
            engine.ownership("repo", "zzz"),
            Err(QueryError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_placeholder_is_a_leaf() {
        let engine = engine();
        let path = engine.path("repo", "a", "d").unwrap();
        assert_eq!(path.path, vec!["a", "b", "c", "d"]);
        assert!(engine.path("repo", "d", "a").unwrap().path.is_empty());
        assert!(engine
            .neighbors("repo", "d", &NeighborFilter::default())
            .unwrap()
            .outgoing
            .is_empty());
    }
}
