//! CLI module for kgraph.
//!
//! Every command indexes the project root into a fresh in-memory store,
//! then runs one operation and renders the result as JSON.
//!
//! Commands:
//! - Build: index, stats, graph
//! - Query: neighbors, impact, path, subgraph, hotspots, search, ownership

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::EngineConfig;
use crate::graph::{EdgeType, GraphStore, NodeType};
use crate::indexer::{collect_sources, Indexer};
use crate::query::{NeighborFilter, QueryEngine, SearchQuery};

#[derive(Parser, Debug)]
#[command(name = "kgraph")]
#[command(about = "Code knowledge graph: index a directory and query it", long_about = None)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Repository id (default: name of the root directory)
    #[arg(long)]
    pub repo: Option<String>,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    // ─── Build ──────────────────────────────────────────────────────
    /// Index the project and print the run report
    Index,

    /// Show graph statistics
    Stats,

    /// Dump every node and edge
    Graph,

    // ─── Query ──────────────────────────────────────────────────────
    /// Incoming and outgoing edges of a node
    Neighbors {
        node: String,

        /// Only these edge types (repeatable), e.g. calls
        #[arg(long = "edge-type", value_parser = parse_edge_type)]
        edge_types: Vec<EdgeType>,

        /// Only neighbors of these node types (repeatable), e.g. function
        #[arg(long = "node-type", value_parser = parse_node_type)]
        node_types: Vec<NodeType>,
    },

    /// What a change to a node may affect
    Impact {
        node: String,

        /// Max hops (default from config)
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Shortest path between two nodes
    Path { start: String, end: String },

    /// Everything within a few hops of a node
    Subgraph {
        node: String,

        /// Max hops (default from config)
        #[arg(short, long)]
        depth: Option<usize>,
    },

    /// Most changed and most complex files, functions and classes
    Hotspots,

    /// Search node names and documentation
    Search {
        query: String,

        /// Only these node types (repeatable)
        #[arg(long = "type", value_parser = parse_node_type)]
        node_types: Vec<NodeType>,

        /// Minimum score, 0.0 to 1.0
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Max results
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Owners of a node
    Ownership { node: String },
}

fn parse_edge_type(s: &str) -> std::result::Result<EdgeType, String> {
    EdgeType::parse(s).ok_or_else(|| format!("unknown edge type '{}'", s))
}

fn parse_node_type(s: &str) -> std::result::Result<NodeType, String> {
    NodeType::parse(s).ok_or_else(|| format!("unknown node type '{}'", s))
}

fn non_empty<T>(values: Vec<T>) -> Option<Vec<T>> {
    (!values.is_empty()).then_some(values)
}

/// Repository id used for `root` when none is given.
pub fn repository_id(root: &Path) -> String {
    root.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "default".to_string())
}

/// Index the root and run the command. Returns the JSON to print.
pub fn run(cli: Cli) -> Result<String> {
    let root = cli.root.canonicalize().unwrap_or(cli.root);
    let config = EngineConfig::load(&root.join(".kgraph").join("config.toml"));
    let repo = cli.repo.unwrap_or_else(|| repository_id(&root));

    let store = Arc::new(GraphStore::new());
    let indexer = Indexer::with_config(Arc::clone(&store), config.indexer.clone());
    let engine = QueryEngine::with_config(Arc::clone(&store), config.query.clone());

    let files = collect_sources(&root);
    info!(root = %root.display(), files = files.len(), "indexing project");
    let report = indexer.index(&repo, &files)?;

    let value = match cli.command {
        Commands::Index => serde_json::to_value(&report)?,
        Commands::Stats => serde_json::to_value(engine.summary(&repo)?)?,
        Commands::Graph => serde_json::to_value(store.graph(&repo)?)?,
        Commands::Neighbors {
            node,
            edge_types,
            node_types,
        } => {
            let filter = NeighborFilter {
                edge_types: non_empty(edge_types),
                node_types: non_empty(node_types),
            };
            serde_json::to_value(engine.neighbors(&repo, &node, &filter)?)?
        }
        Commands::Impact { node, depth } => serde_json::to_value(engine.impact(&repo, &node, depth)?)?,
        Commands::Path { start, end } => serde_json::to_value(engine.path(&repo, &start, &end)?)?,
        Commands::Subgraph { node, depth } => serde_json::to_value(engine.subgraph(&repo, &node, depth)?)?,
        Commands::Hotspots => serde_json::to_value(engine.hotspots(&repo)?)?,
        Commands::Search {
            query,
            node_types,
            threshold,
            limit,
        } => {
            let query = SearchQuery {
                text: query,
                node_types: non_empty(node_types),
                threshold,
                limit,
            };
            serde_json::to_value(engine.semantic_search(&repo, &query)?)?
        }
        Commands::Ownership { node } => serde_json::to_value(engine.ownership(&repo, &node)?)?,
    };

    let output = if cli.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    Ok(output)
}
