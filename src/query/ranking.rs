//! Ranked listings: hotspots and name/documentation search.

use super::{Hotspot, MatchKind, SearchHit, SearchQuery};
use crate::graph::{KnowledgeGraph, NodeType};

const HOTSPOT_TYPES: [NodeType; 3] = [NodeType::File, NodeType::Function, NodeType::Class];

/// File, function and class nodes scoring above 1, highest first.
///
/// Score is `modification_count * complexity`. The sort is stable, so equal
/// scores keep insertion order.
pub fn hotspots(graph: &KnowledgeGraph, limit: usize) -> Vec<Hotspot> {
    let mut spots: Vec<Hotspot> = graph
        .nodes()
        .into_iter()
        .filter(|n| HOTSPOT_TYPES.contains(&n.node_type))
        .filter_map(|n| {
            let complexity = n.complexity();
            let score = f64::from(n.modification_count) * complexity;
            (score > 1.0).then(|| Hotspot {
                node: n.clone(),
                modification_count: n.modification_count,
                complexity,
                score,
            })
        })
        .collect();
    spots.sort_by(|a, b| b.score.total_cmp(&a.score));
    spots.truncate(limit);
    spots
}

/// Score one candidate name/documentation pair against a lower-cased query.
fn relevance(query: &str, name: &str, documentation: Option<&str>) -> Option<(f64, MatchKind)> {
    let name = name.to_lowercase();
    if name == query {
        Some((1.0, MatchKind::Exact))
    } else if name.starts_with(query) {
        Some((0.8, MatchKind::Prefix))
    } else if name.contains(query) {
        Some((0.6, MatchKind::Substring))
    } else if documentation.is_some_and(|d| d.to_lowercase().contains(query)) {
        Some((0.4, MatchKind::Documentation))
    } else {
        None
    }
}

/// Case-insensitive match of `query.text` against node names and
/// documentation. Hits below `threshold` are dropped; an empty query
/// matches nothing.
pub fn search(graph: &KnowledgeGraph, query: &SearchQuery, threshold: f64, limit: usize) -> Vec<SearchHit> {
    let needle = query.text.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = graph
        .nodes()
        .into_iter()
        .filter(|n| {
            query
                .node_types
                .as_ref()
                .map_or(true, |types| types.contains(&n.node_type))
        })
        .filter_map(|n| {
            let (score, matched) = relevance(&needle, &n.name, n.documentation())?;
            (score >= threshold).then(|| SearchHit {
                node: n.clone(),
                score,
                matched,
            })
        })
        .collect();
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(limit);
    hits
}
