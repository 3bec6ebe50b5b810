//! Core types for the knowledge graph.
//!
//! Defines node types, edge types, and the data structures that
//! represent code entities and their relationships.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Free-form node/edge attributes (documentation, flags, complexity, ...).
pub type Metadata = BTreeMap<String, Value>;

/// The type of a node in the knowledge graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    /// A source file.
    File,
    /// A free function, including a function value bound to a constant.
    Function,
    /// A function declared inside a class/interface/impl.
    Method,
    /// A class, or a Rust struct.
    Class,
    /// An interface, or a Rust trait.
    Interface,
    /// A type alias.
    TypeAlias,
    /// A mutable binding or a class/interface field.
    Variable,
    /// An immutable top-level binding.
    Constant,
    /// An enum definition.
    Enum,
    /// A module or namespace.
    Module,
    /// One import statement.
    Import,
    /// One exported symbol.
    Export,
    /// An HTTP route handler registration.
    ApiEndpoint,
    /// A database table definition.
    DatabaseTable,
    /// A test case.
    Test,
    /// A UI component.
    Component,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::File => "file",
            NodeType::Function => "function",
            NodeType::Method => "method",
            NodeType::Class => "class",
            NodeType::Interface => "interface",
            NodeType::TypeAlias => "type-alias",
            NodeType::Variable => "variable",
            NodeType::Constant => "constant",
            NodeType::Enum => "enum",
            NodeType::Module => "module",
            NodeType::Import => "import",
            NodeType::Export => "export",
            NodeType::ApiEndpoint => "api-endpoint",
            NodeType::DatabaseTable => "database-table",
            NodeType::Test => "test",
            NodeType::Component => "component",
        }
    }

    /// Parse the serialized (kebab-case) form.
    pub fn parse(s: &str) -> Option<Self> {
        const ALL: [NodeType; 16] = [
            NodeType::File,
            NodeType::Function,
            NodeType::Method,
            NodeType::Class,
            NodeType::Interface,
            NodeType::TypeAlias,
            NodeType::Variable,
            NodeType::Constant,
            NodeType::Enum,
            NodeType::Module,
            NodeType::Import,
            NodeType::Export,
            NodeType::ApiEndpoint,
            NodeType::DatabaseTable,
            NodeType::Test,
            NodeType::Component,
        ];
        ALL.into_iter().find(|t| t.as_str() == s)
    }

    /// Node types that can make or receive calls.
    pub fn is_callable(&self) -> bool {
        matches!(self, NodeType::Function | NodeType::Method)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The type of an edge (relationship) in the knowledge graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// Import node -> external module placeholder.
    Imports,
    /// Export node -> internal symbol placeholder.
    Exports,
    /// Callable -> callable.
    Calls,
    /// Type -> supertype placeholder.
    Extends,
    /// Type -> interface/trait placeholder.
    Implements,
    /// Symbol uses a type or value.
    Uses,
    /// Container holds a member (Class -> Method, Module -> item).
    Contains,
    /// File defines a top-level declaration.
    Defines,
    /// Generic dependency between entities.
    DependsOn,
    /// Generic reference between symbols.
    References,
    /// Test -> callable exercised by it.
    Tests,
    /// Entity -> change that modified it.
    ModifiedBy,
    /// Entity -> owner.
    OwnedBy,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeType::Imports => "imports",
            EdgeType::Exports => "exports",
            EdgeType::Calls => "calls",
            EdgeType::Extends => "extends",
            EdgeType::Implements => "implements",
            EdgeType::Uses => "uses",
            EdgeType::Contains => "contains",
            EdgeType::Defines => "defines",
            EdgeType::DependsOn => "depends_on",
            EdgeType::References => "references",
            EdgeType::Tests => "tests",
            EdgeType::ModifiedBy => "modified_by",
            EdgeType::OwnedBy => "owned_by",
        }
    }

    /// Parse the serialized (snake_case) form.
    pub fn parse(s: &str) -> Option<Self> {
        const ALL: [EdgeType; 13] = [
            EdgeType::Imports,
            EdgeType::Exports,
            EdgeType::Calls,
            EdgeType::Extends,
            EdgeType::Implements,
            EdgeType::Uses,
            EdgeType::Contains,
            EdgeType::Defines,
            EdgeType::DependsOn,
            EdgeType::References,
            EdgeType::Tests,
            EdgeType::ModifiedBy,
            EdgeType::OwnedBy,
        ];
        ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A code entity stored in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Unique within one repository graph.
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    /// Repository-relative path of the defining file.
    pub file: String,
    /// Starting line number (1-indexed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,
    /// Ending line number (1-indexed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,
    #[serde(default)]
    pub metadata: Metadata,
    pub last_modified: DateTime<Utc>,
    pub modification_count: u32,
}

impl GraphNode {
    pub fn new(id: String, node_type: NodeType, name: String, file: String) -> Self {
        Self {
            id,
            node_type,
            name,
            file,
            start_line: None,
            end_line: None,
            metadata: Metadata::new(),
            last_modified: Utc::now(),
            modification_count: 1,
        }
    }

    pub fn with_lines(mut self, start: usize, end: usize) -> Self {
        self.start_line = Some(start);
        self.end_line = Some(end);
        self
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// Complexity score from metadata; 1 when absent or not numeric.
    pub fn complexity(&self) -> f64 {
        self.metadata
            .get("complexity")
            .and_then(Value::as_f64)
            .unwrap_or(1.0)
    }

    pub fn documentation(&self) -> Option<&str> {
        self.metadata.get("documentation").and_then(Value::as_str)
    }

    /// `Parent.name` for members, plain `name` otherwise.
    pub fn qualified_name(&self) -> String {
        match self.metadata.get("parent").and_then(Value::as_str) {
            Some(parent) => format!("{}.{}", parent, self.name),
            None => self.name.clone(),
        }
    }
}

/// A typed, directed relation between two node ids.
///
/// `target` may be a symbolic placeholder that never resolves to a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub weight: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

impl GraphEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, edge_type: EdgeType) -> Self {
        let source = source.into();
        let target = target.into();
        Self {
            id: format!("{}|{}|{}", source, edge_type, target),
            source,
            target,
            edge_type,
            weight: 1.0,
            metadata: Metadata::new(),
        }
    }
}

// ─── Id scheme ─────────────────────────────────────────────────────────────

pub fn file_node_id(path: &str) -> String {
    format!("file:{}", path)
}

pub fn declaration_id(node_type: NodeType, path: &str, qualified_name: &str, line: usize) -> String {
    format!("{}:{}:{}:{}", node_type, path, qualified_name, line)
}

/// External placeholder for an imported module path.
pub fn module_placeholder(import_path: &str) -> String {
    format!("module:{}", import_path)
}

/// Internal placeholder for an exported symbol name.
pub fn internal_placeholder(symbol: &str) -> String {
    format!("internal:{}", symbol)
}

/// Name-qualified placeholder for a supertype, e.g. `class:Base`.
pub fn supertype_placeholder(node_type: NodeType, name: &str) -> String {
    format!("{}:{}", node_type, name)
}

// ─── Stats & summaries ─────────────────────────────────────────────────────

/// Aggregate statistics, always derived from the current nodes/edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub nodes_by_type: BTreeMap<NodeType, usize>,
    pub edges_by_type: BTreeMap<EdgeType, usize>,
    pub average_connections: f64,
    pub max_depth: usize,
    pub indexing_duration_ms: u64,
}

/// What index/update calls hand back; nodes and edges are fetched separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSummary {
    pub repository_id: String,
    pub stats: GraphStats,
    pub last_indexed_at: Option<DateTime<Utc>>,
    pub version: u64,
}

/// Full node/edge listing of one repository graph, in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphExport {
    pub repository_id: String,
    pub version: u64,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}
