//! # kgraph
//!
//! A code knowledge graph engine. Pattern-based scanners turn source files
//! into typed nodes and edges, an indexer assembles them into one directed
//! graph per repository, and a query engine answers structural questions
//! over it.
//!
//! ## Key Features
//!
//! - **Multi-language**: JavaScript, TypeScript, Python, Rust
//! - **Incremental**: re-index only the files that changed
//! - **Concurrent**: queries read under a lock that indexing writes under
//! - **Queries**: neighbors, impact, shortest path, subgraph, hotspots, search
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kgraph::{GraphStore, Indexer, QueryEngine, SearchQuery, SourceFile};
//! use std::sync::Arc;
//!
//! let store = Arc::new(GraphStore::new());
//! let indexer = Indexer::new(Arc::clone(&store));
//! indexer
//!     .index("shop", &[SourceFile::new("cart.ts", "export class Cart {}")])
//!     .unwrap();
//!
//! let engine = QueryEngine::new(store);
//! let hits = engine.semantic_search("shop", &SearchQuery::new("cart")).unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod indexer;
pub mod query;
pub mod scanner;

// Re-exports for convenience
pub use config::{EngineConfig, IndexerConfig, QueryConfig};
pub use error::{GraphError, QueryError, Result};

pub use graph::{
    EdgeType, GraphEdge, GraphExport, GraphNode, GraphStats, GraphStore, GraphSummary,
    KnowledgeGraph, NodeType,
};
pub use indexer::{
    collect_sources, FileError, IndexFailure, IndexReport, IndexStatus, Indexer, IndexingProgress,
    SourceFile,
};
pub use query::{
    Hotspot, ImpactResult, MatchKind, NeighborEntry, NeighborFilter, NeighborsResult,
    OwnershipResult, PathResult, QueryEngine, RiskLevel, SearchHit, SearchQuery, SubgraphResult,
};
pub use scanner::{scan_file, Language, ScanError, ScanOutput, SourceScanner};
