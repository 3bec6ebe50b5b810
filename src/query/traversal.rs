//! Breadth-first traversals over one repository graph.
//!
//! All of them follow outgoing edges in insertion order and keep one visited
//! set for the whole walk, so cycles terminate and discovery order is
//! deterministic. Placeholder vertices are leaves: they have no outgoing
//! edges.

use std::collections::{HashMap, HashSet, VecDeque};

use super::{ImpactResult, NeighborEntry, NeighborFilter, NeighborsResult, PathResult, RiskLevel, SubgraphResult};
use crate::error::QueryError;
use crate::graph::{EdgeType, GraphEdge, KnowledgeGraph, NodeType};

/// Edge types that carry a change from a node to what depends on it.
pub const IMPACT_EDGES: [EdgeType; 4] = [
    EdgeType::Calls,
    EdgeType::Uses,
    EdgeType::DependsOn,
    EdgeType::Imports,
];

fn require(graph: &KnowledgeGraph, id: &str) -> Result<(), QueryError> {
    if graph.contains_vertex(id) {
        Ok(())
    } else {
        Err(QueryError::NodeNotFound(id.to_string()))
    }
}

pub fn neighbors(
    graph: &KnowledgeGraph,
    node_id: &str,
    filter: &NeighborFilter,
) -> Result<NeighborsResult, QueryError> {
    require(graph, node_id)?;

    let entry = |edge: &GraphEdge, other: &str| -> Option<NeighborEntry> {
        if !filter.accepts_edge(edge.edge_type) {
            return None;
        }
        let node = graph.node(other);
        if let Some(types) = &filter.node_types {
            if !node.is_some_and(|n| types.contains(&n.node_type)) {
                return None;
            }
        }
        Some(NeighborEntry {
            edge: edge.clone(),
            node_id: other.to_string(),
            node: node.cloned(),
        })
    };

    let incoming = graph
        .incoming(node_id)
        .into_iter()
        .filter_map(|e| entry(e, &e.source))
        .collect();
    let outgoing = graph
        .outgoing(node_id)
        .into_iter()
        .filter_map(|e| entry(e, &e.target))
        .collect();

    Ok(NeighborsResult {
        node_id: node_id.to_string(),
        incoming,
        outgoing,
    })
}

/// Everything reachable from `node_id` within `max_depth` hops over
/// [`IMPACT_EDGES`]. Targets of the start node are direct, the rest are
/// transitive.
pub fn impact(graph: &KnowledgeGraph, node_id: &str, max_depth: usize) -> Result<ImpactResult, QueryError> {
    require(graph, node_id)?;

    let mut visited: HashSet<&str> = HashSet::from([node_id]);
    let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(node_id, 0)]);
    let mut direct = Vec::new();
    let mut transitive = Vec::new();
    let mut tests = Vec::new();

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for edge in graph.outgoing(current) {
            if !IMPACT_EDGES.contains(&edge.edge_type) {
                continue;
            }
            let target = edge.target.as_str();
            if !visited.insert(target) {
                continue;
            }
            if depth == 0 {
                direct.push(target.to_string());
            } else {
                transitive.push(target.to_string());
            }
            if graph
                .node(target)
                .is_some_and(|n| n.node_type == NodeType::Test)
            {
                tests.push(target.to_string());
            }
            queue.push_back((target, depth + 1));
        }
    }

    let total_impacted = direct.len() + transitive.len();
    Ok(ImpactResult {
        node_id: node_id.to_string(),
        max_depth,
        direct,
        transitive,
        tests,
        total_impacted,
        risk: RiskLevel::from_count(total_impacted),
    })
}

/// Shortest path by hop count over all edge types.
///
/// Ties go to the path discovered first, i.e. through earlier-inserted edges.
pub fn shortest_path(graph: &KnowledgeGraph, start: &str, end: &str) -> Result<PathResult, QueryError> {
    require(graph, start)?;
    require(graph, end)?;

    let found = |path: Vec<String>| PathResult {
        start: start.to_string(),
        end: end.to_string(),
        length: path.len(),
        path,
    };
    if start == end {
        return Ok(found(vec![start.to_string()]));
    }

    let mut parents: HashMap<&str, &str> = HashMap::new();
    let mut visited: HashSet<&str> = HashSet::from([start]);
    let mut queue: VecDeque<&str> = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        for edge in graph.outgoing(current) {
            let next = edge.target.as_str();
            if !visited.insert(next) {
                continue;
            }
            parents.insert(next, current);
            if next == end {
                let mut path = vec![end.to_string()];
                let mut cursor = end;
                while let Some(&parent) = parents.get(cursor) {
                    path.push(parent.to_string());
                    cursor = parent;
                }
                path.reverse();
                return Ok(found(path));
            }
            queue.push_back(next);
        }
    }

    Ok(found(Vec::new()))
}

/// Vertices within `max_depth` hops of `start` over all edge types, and the
/// edges walked to reach them.
pub fn subgraph(graph: &KnowledgeGraph, start: &str, max_depth: usize) -> Result<SubgraphResult, QueryError> {
    require(graph, start)?;

    let mut visited: HashSet<&str> = HashSet::from([start]);
    let mut order: Vec<&str> = vec![start];
    let mut edges = Vec::new();
    let mut queue: VecDeque<(&str, usize)> = VecDeque::from([(start, 0)]);

    while let Some((current, depth)) = queue.pop_front() {
        if depth >= max_depth {
            continue;
        }
        for edge in graph.outgoing(current) {
            edges.push(edge.clone());
            let next = edge.target.as_str();
            if visited.insert(next) {
                order.push(next);
                queue.push_back((next, depth + 1));
            }
        }
    }

    let mut nodes = Vec::new();
    let mut placeholders = Vec::new();
    for id in order {
        match graph.node(id) {
            Some(node) => nodes.push(node.clone()),
            None => placeholders.push(id.to_string()),
        }
    }

    Ok(SubgraphResult {
        root: start.to_string(),
        max_depth,
        nodes,
        placeholders,
        edges,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphNode;

    fn graph(nodes: &[(&str, NodeType)], edges: &[(&str, &str, EdgeType)]) -> KnowledgeGraph {
        let mut g = KnowledgeGraph::new("repo");
        for (id, node_type) in nodes {
            g.upsert_node(GraphNode::new(id.to_string(), *node_type, id.to_string(), "a.ts".into()));
        }
        for (source, target, edge_type) in edges {
            g.add_edge(GraphEdge::new(*source, *target, *edge_type));
        }
        g
    }

    fn functions(ids: &[&'static str]) -> Vec<(&'static str, NodeType)> {
        ids.iter().map(|id| (*id, NodeType::Function)).collect()
    }

    #[test]
    fn test_neighbors_filters() {
        let g = graph(
            &[("a", NodeType::Function), ("b", NodeType::Function), ("f", NodeType::File)],
            &[
                ("f", "a", EdgeType::Defines),
                ("a", "b", EdgeType::Calls),
                ("a", "module:x", EdgeType::Imports),
            ],
        );

        let all = neighbors(&g, "a", &NeighborFilter::default()).unwrap();
        assert_eq!(all.incoming.len(), 1);
        assert_eq!(all.outgoing.len(), 2);
        assert!(all.outgoing[1].node.is_none());

        let calls = NeighborFilter {
            edge_types: Some(vec![EdgeType::Calls]),
            ..NeighborFilter::default()
        };
        let only_calls = neighbors(&g, "a", &calls).unwrap();
        assert!(only_calls.incoming.is_empty());
        assert_eq!(only_calls.outgoing[0].node_id, "b");

        let functions_only = NeighborFilter {
            node_types: Some(vec![NodeType::Function]),
            ..NeighborFilter::default()
        };
        let typed = neighbors(&g, "a", &functions_only).unwrap();
        assert!(typed.incoming.is_empty());
        assert_eq!(typed.outgoing.len(), 1);
    }

    #[test]
    fn test_unknown_node_is_an_error() {
        let g = graph(&[], &[]);
        assert_eq!(
            impact(&g, "nope", 3).unwrap_err(),
            QueryError::NodeNotFound("nope".into())
        );
    }

    #[test]
    fn test_impact_on_cycle_terminates_with_disjoint_sets() {
        let g = graph(
            &functions(&["a", "b", "c"]),
            &[
                ("a", "b", EdgeType::Calls),
                ("b", "c", EdgeType::Calls),
                ("c", "a", EdgeType::Calls),
                ("b", "a", EdgeType::Uses),
            ],
        );
        let result = impact(&g, "a", 10).unwrap();
        assert_eq!(result.direct, vec!["b"]);
        assert_eq!(result.transitive, vec!["c"]);
        assert!(!result.direct.iter().any(|d| result.transitive.contains(d)));
        assert_eq!(result.risk, RiskLevel::Low);
    }

    #[test]
    fn test_impact_respects_depth_and_edge_types() {
        let g = graph(
            &[
                ("a", NodeType::Function),
                ("b", NodeType::Function),
                ("c", NodeType::Function),
                ("d", NodeType::Function),
                ("t", NodeType::Test),
            ],
            &[
                ("a", "b", EdgeType::Calls),
                ("b", "c", EdgeType::DependsOn),
                ("c", "d", EdgeType::Calls),
                ("a", "t", EdgeType::Uses),
                ("a", "x", EdgeType::Contains),
            ],
        );
        let result = impact(&g, "a", 2).unwrap();
        assert_eq!(result.direct, vec!["b", "t"]);
        assert_eq!(result.transitive, vec!["c"]);
        assert_eq!(result.tests, vec!["t"]);
        assert_eq!(result.total_impacted, 3);

        assert!(impact(&g, "a", 0).unwrap().direct.is_empty());
    }

    #[test]
    fn test_risk_levels() {
        assert_eq!(RiskLevel::from_count(5), RiskLevel::Low);
        assert_eq!(RiskLevel::from_count(6), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_count(11), RiskLevel::High);
        assert_eq!(RiskLevel::from_count(21), RiskLevel::Critical);
    }

    #[test]
    fn test_shortest_path_prefers_fewer_hops() {
        let g = graph(
            &functions(&["A", "B", "C"]),
            &[
                ("A", "B", EdgeType::Calls),
                ("B", "C", EdgeType::Calls),
                ("A", "C", EdgeType::Calls),
            ],
        );
        let result = shortest_path(&g, "A", "C").unwrap();
        assert_eq!(result.path, vec!["A", "C"]);
        assert_eq!(result.length, 2);
    }

    #[test]
    fn test_shortest_path_ties_follow_insertion_order() {
        let g = graph(
            &functions(&["s", "x", "y", "e"]),
            &[
                ("s", "y", EdgeType::Calls),
                ("s", "x", EdgeType::Calls),
                ("x", "e", EdgeType::Calls),
                ("y", "e", EdgeType::Calls),
            ],
        );
        assert_eq!(shortest_path(&g, "s", "e").unwrap().path, vec!["s", "y", "e"]);
    }

    #[test]
    fn test_shortest_path_unreachable_and_trivial() {
        let g = graph(&functions(&["a", "b"]), &[("b", "a", EdgeType::Calls)]);
        assert!(shortest_path(&g, "a", "b").unwrap().path.is_empty());
        assert_eq!(shortest_path(&g, "a", "a").unwrap().path, vec!["a"]);
    }

    #[test]
    fn test_subgraph_bounded_by_depth() {
        let g = graph(
            &functions(&["a", "b", "c", "d"]),
            &[
                ("a", "b", EdgeType::Defines),
                ("b", "c", EdgeType::Contains),
                ("c", "d", EdgeType::Calls),
                ("b", "module:m", EdgeType::Imports),
                ("c", "a", EdgeType::Calls),
            ],
        );
        let result = subgraph(&g, "a", 2).unwrap();
        let ids: Vec<&str> = result.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(result.placeholders, vec!["module:m"]);
        assert_eq!(result.edges.len(), 3);
    }
}
