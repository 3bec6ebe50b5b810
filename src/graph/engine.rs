//! The per-repository graph.
//!
//! Uses a petgraph `StableDiGraph` as the topology so that removing the
//! entities of one file never invalidates the indexes of the others.
//! Vertices are either real nodes or symbolic placeholders that only exist
//! because some edge points at them.

use chrono::{DateTime, Utc};
use petgraph::algo::dijkstra;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::types::*;

#[derive(Debug, Clone)]
struct Vertex {
    id: String,
    /// `None` for a symbolic placeholder.
    node: Option<GraphNode>,
    seq: u64,
}

#[derive(Debug, Clone)]
struct EdgeSlot {
    edge: GraphEdge,
    seq: u64,
}

/// One repository's knowledge graph: nodes, edges and a version counter.
#[derive(Debug, Clone)]
pub struct KnowledgeGraph {
    repository_id: String,
    graph: StableDiGraph<Vertex, EdgeSlot>,
    /// Index: node or placeholder id -> vertex.
    ids: HashMap<String, NodeIndex>,
    edge_ids: HashSet<String>,
    /// Insertion counter; petgraph reuses freed slots, so order lives here.
    next_seq: u64,
    node_count: usize,
    version: u64,
    last_indexed_at: Option<DateTime<Utc>>,
    last_duration_ms: u64,
}

impl KnowledgeGraph {
    pub fn new(repository_id: impl Into<String>) -> Self {
        Self {
            repository_id: repository_id.into(),
            graph: StableDiGraph::new(),
            ids: HashMap::new(),
            edge_ids: HashSet::new(),
            next_seq: 0,
            node_count: 0,
            version: 0,
            last_indexed_at: None,
            last_duration_ms: 0,
        }
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn last_indexed_at(&self) -> Option<DateTime<Utc>> {
        self.last_indexed_at
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    // ─── Mutation ───────────────────────────────────────────────

    /// Insert a node, replacing an existing node with the same id.
    /// A placeholder with that id becomes a real node and keeps its edges.
    pub fn upsert_node(&mut self, node: GraphNode) {
        if let Some(&idx) = self.ids.get(&node.id) {
            let seq = self.bump_seq();
            let vertex = &mut self.graph[idx];
            if vertex.node.is_none() {
                self.node_count += 1;
                vertex.seq = seq;
            } else {
                debug!(id = %node.id, "replacing node with duplicate id");
            }
            vertex.node = Some(node);
            return;
        }
        let seq = self.bump_seq();
        let id = node.id.clone();
        let idx = self.graph.add_node(Vertex {
            id: id.clone(),
            node: Some(node),
            seq,
        });
        self.ids.insert(id, idx);
        self.node_count += 1;
    }

    /// Add an edge; endpoints that are not nodes become placeholders.
    /// Returns `false` when an edge with the same id already exists.
    pub fn add_edge(&mut self, edge: GraphEdge) -> bool {
        if self.edge_ids.contains(&edge.id) {
            return false;
        }
        let from = self.vertex_or_placeholder(&edge.source);
        let to = self.vertex_or_placeholder(&edge.target);
        let seq = self.bump_seq();
        self.edge_ids.insert(edge.id.clone());
        self.graph.add_edge(from, to, EdgeSlot { edge, seq });
        true
    }

    /// Delete every node whose `file` equals `path`, every edge touching one
    /// of them, and any placeholder left without edges. Returns the removed
    /// nodes.
    pub fn remove_file(&mut self, path: &str) -> Vec<GraphNode> {
        let doomed: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&idx| {
                self.graph[idx]
                    .node
                    .as_ref()
                    .is_some_and(|n| n.file == path)
            })
            .collect();

        if doomed.is_empty() {
            return Vec::new();
        }
        debug!(file = path, nodes = doomed.len(), "removing file from graph");

        let mut removed = Vec::with_capacity(doomed.len());
        for idx in doomed {
            let touching: Vec<String> = self
                .graph
                .edges_directed(idx, Direction::Outgoing)
                .chain(self.graph.edges_directed(idx, Direction::Incoming))
                .map(|e| e.weight().edge.id.clone())
                .collect();
            for id in touching {
                self.edge_ids.remove(&id);
            }
            if let Some(vertex) = self.graph.remove_node(idx) {
                self.ids.remove(&vertex.id);
                if let Some(node) = vertex.node {
                    self.node_count -= 1;
                    removed.push(node);
                }
            }
        }

        self.prune_placeholders();
        removed
    }

    /// Bump the version and record when and how long the run took.
    pub fn record_run(&mut self, duration_ms: u64) {
        self.version += 1;
        self.last_indexed_at = Some(Utc::now());
        self.last_duration_ms = duration_ms;
    }

    // ─── Lookup ─────────────────────────────────────────────────

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.ids
            .get(id)
            .and_then(|&idx| self.graph[idx].node.as_ref())
    }

    /// True for real nodes and for placeholders referenced by some edge.
    pub fn contains_vertex(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    /// All real nodes in insertion order.
    pub fn nodes(&self) -> Vec<&GraphNode> {
        let mut vertices: Vec<&Vertex> = self.vertices().filter(|v| v.node.is_some()).collect();
        vertices.sort_by_key(|v| v.seq);
        vertices.into_iter().filter_map(|v| v.node.as_ref()).collect()
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> Vec<&GraphEdge> {
        let mut slots: Vec<&EdgeSlot> = self.edge_slots().collect();
        slots.sort_by_key(|s| s.seq);
        slots.into_iter().map(|s| &s.edge).collect()
    }

    /// Edges leaving `id`, in insertion order.
    pub fn outgoing(&self, id: &str) -> Vec<&GraphEdge> {
        self.edges_directed(id, Direction::Outgoing)
    }

    /// Edges arriving at `id`, in insertion order.
    pub fn incoming(&self, id: &str) -> Vec<&GraphEdge> {
        self.edges_directed(id, Direction::Incoming)
    }

    /// Resolve a name-qualified placeholder such as `class:Base` against
    /// real nodes of the same type and name.
    pub fn resolve_symbolic(&self, symbolic_id: &str) -> Vec<&GraphNode> {
        let Some((kind, name)) = symbolic_id.split_once(':') else {
            return Vec::new();
        };
        let Some(node_type) = NodeType::parse(kind) else {
            return Vec::new();
        };
        self.nodes()
            .into_iter()
            .filter(|n| n.node_type == node_type && n.name == name)
            .collect()
    }

    // ─── Stats ──────────────────────────────────────────────────

    /// Compute statistics from the current nodes and edges.
    pub fn stats(&self) -> GraphStats {
        let mut stats = GraphStats {
            total_nodes: self.node_count,
            total_edges: self.graph.edge_count(),
            indexing_duration_ms: self.last_duration_ms,
            ..GraphStats::default()
        };

        for node in self.vertices().filter_map(|v| v.node.as_ref()) {
            *stats.nodes_by_type.entry(node.node_type).or_default() += 1;
        }
        for slot in self.edge_slots() {
            *stats.edges_by_type.entry(slot.edge.edge_type).or_default() += 1;
        }
        if self.node_count > 0 {
            stats.average_connections = stats.total_edges as f64 / self.node_count as f64;
        }
        stats.max_depth = self.max_depth();
        stats
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            repository_id: self.repository_id.clone(),
            stats: self.stats(),
            last_indexed_at: self.last_indexed_at,
            version: self.version,
        }
    }

    pub fn export(&self) -> GraphExport {
        GraphExport {
            repository_id: self.repository_id.clone(),
            version: self.version,
            nodes: self.nodes().into_iter().cloned().collect(),
            edges: self.edges().into_iter().cloned().collect(),
        }
    }

    // ─── Internal Helpers ───────────────────────────────────────

    fn bump_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn vertices(&self) -> impl Iterator<Item = &Vertex> + '_ {
        self.graph
            .node_indices()
            .filter_map(|idx| self.graph.node_weight(idx))
    }

    fn edge_slots(&self) -> impl Iterator<Item = &EdgeSlot> + '_ {
        self.graph
            .edge_indices()
            .filter_map(|idx| self.graph.edge_weight(idx))
    }

    fn vertex_or_placeholder(&mut self, id: &str) -> NodeIndex {
        if let Some(&idx) = self.ids.get(id) {
            return idx;
        }
        let seq = self.bump_seq();
        let idx = self.graph.add_node(Vertex {
            id: id.to_string(),
            node: None,
            seq,
        });
        self.ids.insert(id.to_string(), idx);
        idx
    }

    fn edges_directed(&self, id: &str, direction: Direction) -> Vec<&GraphEdge> {
        let Some(&idx) = self.ids.get(id) else {
            return Vec::new();
        };
        let mut slots: Vec<&EdgeSlot> = self
            .graph
            .edges_directed(idx, direction)
            .map(|e| e.weight())
            .collect();
        slots.sort_by_key(|s| s.seq);
        slots.into_iter().map(|s| &s.edge).collect()
    }

    fn prune_placeholders(&mut self) {
        let orphans: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&idx| {
                self.graph[idx].node.is_none()
                    && self
                        .graph
                        .neighbors_undirected(idx)
                        .next()
                        .is_none()
            })
            .collect();
        for idx in orphans {
            if let Some(vertex) = self.graph.remove_node(idx) {
                self.ids.remove(&vertex.id);
            }
        }
    }

    /// Longest BFS level reachable from any real node without incoming edges.
    fn max_depth(&self) -> usize {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph[idx].node.is_some()
                    && self
                        .graph
                        .edges_directed(idx, Direction::Incoming)
                        .next()
                        .is_none()
            })
            .map(|root| {
                dijkstra(&self.graph, root, None, |_| 1usize)
                    .into_values()
                    .max()
                    .unwrap_or(0)
            })
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, node_type: NodeType, file: &str) -> GraphNode {
        GraphNode::new(id.to_string(), node_type, id.to_string(), file.to_string())
    }

    #[test]
    fn test_empty_graph() {
        let graph = KnowledgeGraph::new("repo");
        let stats = graph.stats();
        assert_eq!(stats.total_nodes, 0);
        assert_eq!(stats.total_edges, 0);
        assert_eq!(stats.average_connections, 0.0);
        assert_eq!(graph.version(), 0);
    }

    #[test]
    fn test_placeholder_targets_are_not_nodes() {
        let mut graph = KnowledgeGraph::new("repo");
        graph.upsert_node(node("Foo", NodeType::Class, "a.ts"));
        graph.add_edge(GraphEdge::new("Foo", "class:Bar", EdgeType::Extends));

        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.node("class:Bar").is_none());
        assert!(graph.contains_vertex("class:Bar"));
    }

    #[test]
    fn test_duplicate_edge_ids_are_ignored() {
        let mut graph = KnowledgeGraph::new("repo");
        graph.upsert_node(node("a", NodeType::Function, "a.ts"));
        graph.upsert_node(node("b", NodeType::Function, "a.ts"));
        assert!(graph.add_edge(GraphEdge::new("a", "b", EdgeType::Calls)));
        assert!(!graph.add_edge(GraphEdge::new("a", "b", EdgeType::Calls)));
        assert!(graph.add_edge(GraphEdge::new("a", "b", EdgeType::References)));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_remove_file_drops_nodes_edges_and_orphan_placeholders() {
        let mut graph = KnowledgeGraph::new("repo");
        graph.upsert_node(node("a", NodeType::Function, "a.ts"));
        graph.upsert_node(node("b", NodeType::Function, "b.ts"));
        graph.add_edge(GraphEdge::new("b", "a", EdgeType::Calls));
        graph.add_edge(GraphEdge::new("a", "module:x", EdgeType::Imports));
        graph.add_edge(GraphEdge::new("b", "module:y", EdgeType::Imports));

        let removed = graph.remove_file("a.ts");
        assert_eq!(removed.len(), 1);
        assert!(graph.node("a").is_none());
        assert!(!graph.contains_vertex("module:x"));
        assert!(graph.contains_vertex("module:y"));
        assert!(graph
            .edges()
            .iter()
            .all(|e| e.source != "a" && e.target != "a"));
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_remove_and_readd_keeps_insertion_order_for_new_entries() {
        let mut graph = KnowledgeGraph::new("repo");
        graph.upsert_node(node("a", NodeType::Function, "a.ts"));
        graph.upsert_node(node("b", NodeType::Function, "b.ts"));
        graph.remove_file("a.ts");
        graph.upsert_node(node("c", NodeType::Function, "c.ts"));

        let ids: Vec<&str> = graph.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_placeholder_promoted_to_node_keeps_edges() {
        let mut graph = KnowledgeGraph::new("repo");
        graph.upsert_node(node("a", NodeType::Function, "a.ts"));
        graph.add_edge(GraphEdge::new("a", "b", EdgeType::Calls));
        graph.upsert_node(node("b", NodeType::Function, "b.ts"));

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.incoming("b").len(), 1);
    }

    #[test]
    fn test_stats_counts_by_type_and_depth() {
        let mut graph = KnowledgeGraph::new("repo");
        graph.upsert_node(node("f", NodeType::File, "a.ts"));
        graph.upsert_node(node("c", NodeType::Class, "a.ts"));
        graph.upsert_node(node("m", NodeType::Method, "a.ts"));
        graph.add_edge(GraphEdge::new("f", "c", EdgeType::Defines));
        graph.add_edge(GraphEdge::new("c", "m", EdgeType::Contains));
        graph.add_edge(GraphEdge::new("c", "class:Base", EdgeType::Extends));

        let stats = graph.stats();
        assert_eq!(stats.total_nodes, 3);
        assert_eq!(stats.total_edges, 3);
        assert_eq!(stats.nodes_by_type[&NodeType::Method], 1);
        assert_eq!(stats.edges_by_type[&EdgeType::Contains], 1);
        assert_eq!(stats.max_depth, 2);
        assert!((stats.average_connections - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_run_increments_version_by_one() {
        let mut graph = KnowledgeGraph::new("repo");
        for expected in 1..=5 {
            graph.record_run(3);
            assert_eq!(graph.version(), expected);
        }
        assert!(graph.last_indexed_at().is_some());
        assert_eq!(graph.stats().indexing_duration_ms, 3);
    }

    #[test]
    fn test_resolve_symbolic_matches_by_type_and_name() {
        let mut graph = KnowledgeGraph::new("repo");
        graph.upsert_node(
            GraphNode::new("id1".into(), NodeType::Class, "Base".into(), "a.ts".into()),
        );
        graph.upsert_node(
            GraphNode::new("id2".into(), NodeType::Function, "Base".into(), "b.ts".into()),
        );

        let resolved = graph.resolve_symbolic("class:Base");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, "id1");
        assert!(graph.resolve_symbolic("nonsense").is_empty());
    }

    #[test]
    fn test_cycle_does_not_break_max_depth() {
        let mut graph = KnowledgeGraph::new("repo");
        graph.upsert_node(node("root", NodeType::File, "a.ts"));
        graph.upsert_node(node("a", NodeType::Function, "a.ts"));
        graph.upsert_node(node("b", NodeType::Function, "a.ts"));
        graph.add_edge(GraphEdge::new("root", "a", EdgeType::Defines));
        graph.add_edge(GraphEdge::new("a", "b", EdgeType::Calls));
        graph.add_edge(GraphEdge::new("b", "a", EdgeType::Calls));
        assert_eq!(graph.stats().max_depth, 2);
    }
}
