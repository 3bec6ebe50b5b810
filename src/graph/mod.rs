//! Knowledge graph module: data model, per-repository graph and the store
//! that holds one graph per repository.

pub mod engine;
pub mod store;
pub mod types;

pub use engine::KnowledgeGraph;
pub use store::{GraphStore, SharedGraph};
pub use types::{
    EdgeType, GraphEdge, GraphExport, GraphNode, GraphStats, GraphSummary, Metadata, NodeType,
};
