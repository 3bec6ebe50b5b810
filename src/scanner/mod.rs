//! Source scanners: turn file text into graph nodes and edges.
//!
//! One scanner per language family. Scanning is pattern-based and
//! best-effort: it never fails, it returns what it found plus a list of
//! problems.

pub mod api;
pub mod blocks;
pub mod calls;
pub mod ecma;
pub mod language;
pub mod python;
pub mod rust;
pub mod text;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;

use crate::graph::types::*;
pub use blocks::{block_end, BlockEnd};
pub use language::{BlockStyle, Language};
use text::SourceText;

/// A problem found while scanning one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanError {
    /// 1-indexed line, when the problem has one.
    pub line: Option<usize>,
    pub message: String,
}

/// Everything one scan produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutput {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub parse_time_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ScanError>,
}

/// A scanner for one language family.
pub trait SourceScanner: Send + Sync {
    fn language(&self) -> Language;

    /// Scan one file. Must not fail: partial results plus `errors`.
    fn scan(&self, file_path: &str, content: &str) -> ScanOutput;
}

/// Pick the scanner for a language.
pub fn scanner_for(language: Language) -> &'static dyn SourceScanner {
    match language {
        Language::JavaScript => &ecma::EcmaScanner::JAVASCRIPT,
        Language::TypeScript => &ecma::EcmaScanner::TYPESCRIPT,
        Language::Python => &python::PythonScanner,
        Language::Rust => &rust::RustScanner,
    }
}

/// Scan a file with the scanner matching its extension.
///
/// Files without a scanner yield just their file node and one error.
pub fn scan_file(file_path: &str, content: &str) -> ScanOutput {
    match Language::from_path(file_path) {
        Some(language) => scanner_for(language).scan(file_path, content),
        None => {
            let mut output = bare_file(file_path);
            output.errors.push(ScanError {
                line: None,
                message: format!("unsupported language: {}", file_path),
            });
            output
        }
    }
}

/// Just the file node, for files whose content yields nothing.
pub fn bare_file(file_path: &str) -> ScanOutput {
    ScanOutput {
        nodes: vec![GraphNode::new(
            file_node_id(file_path),
            NodeType::File,
            file_name(file_path),
            file_path.to_string(),
        )],
        ..ScanOutput::default()
    }
}

fn file_name(path: &str) -> String {
    path.rsplit(['/', '\\']).next().unwrap_or(path).to_string()
}

/// Handle to a node pushed into an [`Extraction`].
pub(crate) type NodeHandle = usize;

/// Shared accumulator the language scanners push into.
pub(crate) struct Extraction<'a> {
    pub file: &'a str,
    pub language: Language,
    pub text: SourceText<'a>,
    pub file_id: String,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub errors: Vec<ScanError>,
    /// Nodes whose body text feeds call edges and complexity.
    callers: Vec<NodeHandle>,
    /// Container -> members, for summed complexity.
    members: Vec<(NodeHandle, NodeHandle)>,
    /// Nodes that reference a callable by name, resolved in `finish`.
    references: Vec<(NodeHandle, String)>,
    started: Instant,
}

impl<'a> Extraction<'a> {
    pub fn new(file: &'a str, content: &'a str, language: Language) -> Self {
        let started = Instant::now();
        let text = SourceText::new(content, language);
        let file_id = file_node_id(file);
        let file_node = GraphNode::new(file_id.clone(), NodeType::File, file_name(file), file.to_string())
            .with_lines(1, text.len().max(1))
            .with_meta("language", language.name());
        Self {
            file,
            language,
            text,
            file_id,
            nodes: vec![file_node],
            edges: Vec::new(),
            errors: Vec::new(),
            callers: Vec::new(),
            members: Vec::new(),
            references: Vec::new(),
            started,
        }
    }

    /// End line (0-indexed) of the block starting at `start`; records an
    /// error when the block never closes.
    pub fn block(&mut self, start: usize, expect_body: bool) -> usize {
        let end = block_end(&self.text, start, self.language.block_style(), expect_body);
        if !end.terminated {
            self.error(start, "unterminated block");
        }
        end.line
    }

    pub fn error(&mut self, line_idx: usize, message: impl Into<String>) {
        self.errors.push(ScanError {
            line: Some(line_idx + 1),
            message: message.into(),
        });
    }

    /// Add a declaration spanning lines `start..=end` (0-indexed). Top-level
    /// declarations are linked from the file with `defines`, members from
    /// their parent with `contains`.
    pub fn declare(
        &mut self,
        node_type: NodeType,
        name: &str,
        start: usize,
        end: usize,
        parent: Option<NodeHandle>,
    ) -> NodeHandle {
        let parent_name = parent.map(|p| self.nodes[p].qualified_name());
        let qualified = match &parent_name {
            Some(p) => format!("{}.{}", p, name),
            None => name.to_string(),
        };
        let id = declaration_id(node_type, self.file, &qualified, start + 1);
        let mut node = GraphNode::new(id.clone(), node_type, name.to_string(), self.file.to_string())
            .with_lines(start + 1, end + 1);
        if let Some(parent_name) = parent_name {
            node.metadata.insert("parent".into(), Value::from(parent_name));
        }

        let (source, edge_type) = match parent {
            Some(p) => (self.nodes[p].id.clone(), EdgeType::Contains),
            None => (self.file_id.clone(), EdgeType::Defines),
        };
        self.edges.push(GraphEdge::new(source, id, edge_type));
        self.nodes.push(node);
        let handle = self.nodes.len() - 1;
        if let Some(p) = parent {
            self.members.push((p, handle));
        }
        if node_type.is_callable() || matches!(node_type, NodeType::Test | NodeType::Component) {
            self.callers.push(handle);
        }
        handle
    }

    pub fn meta(&mut self, handle: NodeHandle, key: &str, value: impl Into<Value>) {
        self.nodes[handle].metadata.insert(key.to_string(), value.into());
    }

    pub fn document(&mut self, handle: NodeHandle, doc: Option<String>) {
        if let Some(doc) = doc {
            self.meta(handle, "documentation", doc);
        }
    }

    /// Attach the doc comment found directly above `line`.
    pub fn document_above(&mut self, handle: NodeHandle, line: usize) {
        let doc = self.text.doc_comment_above(line);
        self.document(handle, doc);
    }

    pub fn edge(&mut self, source: NodeHandle, target: String, edge_type: EdgeType) {
        let edge = GraphEdge::new(self.nodes[source].id.clone(), target, edge_type);
        self.edges.push(edge);
    }

    /// Supertype edge to a name-qualified placeholder (`class:Base`).
    pub fn supertype(&mut self, handle: NodeHandle, kind: NodeType, name: &str, edge_type: EdgeType) {
        let name = strip_generics(name);
        if name.is_empty() {
            return;
        }
        self.edge(handle, supertype_placeholder(kind, &name), edge_type);
    }

    /// One import node for one statement, with an `imports` edge per path.
    pub fn import(&mut self, paths: &[String], specifiers: &[String], start: usize, end: usize) -> NodeHandle {
        let name = paths.join(", ");
        let handle = self.declare(NodeType::Import, &name, start, end, None);
        self.meta(handle, "source", name.clone());
        if !specifiers.is_empty() {
            self.meta(handle, "specifiers", specifiers.to_vec());
        }
        for path in paths {
            self.edge(handle, module_placeholder(path), EdgeType::Imports);
        }
        handle
    }

    /// One export node per name, each pointing at its internal placeholder.
    pub fn export(&mut self, name: &str, line: usize, default: bool) -> NodeHandle {
        let handle = self.declare(NodeType::Export, name, line, line, None);
        if default {
            self.meta(handle, "default", true);
        }
        self.edge(handle, internal_placeholder(name), EdgeType::Exports);
        handle
    }

    /// Route registration node; a named handler is linked in `finish`.
    pub fn endpoint(&mut self, route: &api::Route, start: usize, end: usize) -> NodeHandle {
        let handle = self.declare(NodeType::ApiEndpoint, &route.label(), start, end, None);
        self.meta(handle, "http_method", route.method.clone());
        self.meta(handle, "route", route.path.clone());
        if let Some(handler) = &route.handler {
            self.reference(handle, handler);
        }
        handle
    }

    /// Resolve `handle -> name` to every same-named callable in `finish`.
    pub fn reference(&mut self, handle: NodeHandle, name: &str) {
        self.references.push((handle, name.to_string()));
    }

    pub fn finish(mut self) -> ScanOutput {
        let bodies: Vec<(usize, String)> = self
            .callers
            .iter()
            .map(|&h| {
                let node = &self.nodes[h];
                let start = node.start_line.unwrap_or(1) - 1;
                let end = node.end_line.unwrap_or(1) - 1;
                let code = self.text.code_between(start, end);
                (h, calls::after_declared_name(&code, &node.name).to_string())
            })
            .collect();

        for (handle, body) in &bodies {
            let complexity = calls::complexity(body);
            let node = &mut self.nodes[*handle];
            let lines = node.end_line.unwrap_or(0) + 1 - node.start_line.unwrap_or(1);
            node.metadata.insert("complexity".into(), Value::from(complexity));
            node.metadata.insert("lines".into(), Value::from(lines));
        }

        let mut summed: Vec<(NodeHandle, f64)> = Vec::new();
        for &(parent, member) in &self.members {
            if self.nodes[member].metadata.contains_key("complexity") {
                let c = self.nodes[member].complexity();
                match summed.iter_mut().find(|(p, _)| *p == parent) {
                    Some((_, total)) => *total += c,
                    None => summed.push((parent, c)),
                }
            }
        }
        for (parent, total) in summed {
            if !self.nodes[parent].metadata.contains_key("complexity") {
                self.meta(parent, "complexity", total);
            }
        }

        let call_edges = calls::call_edges(&self.nodes, &bodies);
        self.edges.extend(call_edges);

        for (handle, name) in std::mem::take(&mut self.references) {
            let source = self.nodes[handle].id.clone();
            let targets: Vec<String> = self
                .nodes
                .iter()
                .filter(|n| n.node_type.is_callable() && n.name == name)
                .map(|n| n.id.clone())
                .collect();
            for target in targets {
                self.edges.push(GraphEdge::new(source.clone(), target, EdgeType::References));
            }
        }

        ScanOutput {
            nodes: self.nodes,
            edges: self.edges,
            parse_time_ms: self.started.elapsed().as_millis() as u64,
            errors: self.errors,
        }
    }
}

/// `Base<T>` -> `Base`, `pkg.Base` -> `pkg.Base`.
pub(crate) fn strip_generics(name: &str) -> String {
    let cut = name.find(['<', '[', '(']).unwrap_or(name.len());
    name[..cut].trim().to_string()
}

/// Drop every `<...>` group (generic parameters and arguments).
pub(crate) fn strip_angle(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    let mut prev = ' ';
    for ch in text.chars() {
        match ch {
            '<' => depth += 1,
            '>' if prev != '-' && prev != '=' => depth = depth.saturating_sub(1),
            _ if depth == 0 => out.push(ch),
            _ => {}
        }
        prev = ch;
    }
    out
}

/// Split a comma list, honoring `a as b` renames (keeps the visible name).
pub(crate) fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(|part| {
            let part = part.trim().trim_start_matches("type ").trim();
            match part.rsplit_once(" as ") {
                Some((_, alias)) => alias.trim().to_string(),
                None => part.to_string(),
            }
        })
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_language_reports_error_with_file_node() {
        let out = scan_file("Makefile", "all: build");
        assert_eq!(out.nodes.len(), 1);
        assert_eq!(out.nodes[0].node_type, NodeType::File);
        assert_eq!(out.nodes[0].id, "file:Makefile");
        assert_eq!(out.errors.len(), 1);
    }

    #[test]
    fn test_empty_source_yields_file_node_only() {
        let out = scan_file("empty.ts", "");
        assert_eq!(out.nodes.len(), 1);
        assert!(out.edges.is_empty());
        assert!(out.errors.is_empty());
    }

    fn calls(out: &ScanOutput) -> Vec<&str> {
        out.edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::Calls)
            .map(|e| e.id.as_str())
            .collect()
    }

    #[test]
    fn test_declaring_line_is_not_a_call() {
        let out = scan_file(
            "m.py",
            "class A:\n    def __init__(self):\n        self.x = 1\n\nclass B:\n    def __init__(self):\n        self.y = 2\n",
        );
        assert!(calls(&out).is_empty());

        let out = scan_file("j.ts", "function run() {}\nclass Job {\n  run() {\n    return 1;\n  }\n}\n");
        assert!(calls(&out).is_empty());

        let out = scan_file("k.ts", "function run() {}\nclass Job {\n  start() {\n    run();\n  }\n}\n");
        assert_eq!(calls(&out), vec!["method:k.ts:Job.start:3|calls|function:k.ts:run:1"]);
    }

    #[test]
    fn test_split_names_and_generics() {
        assert_eq!(split_names(" a, b as c ,, type D"), vec!["a", "c", "D"]);
        assert_eq!(strip_generics("Base<T>"), "Base");
        assert_eq!(strip_generics("Generic[T]"), "Generic");
        assert_eq!(strip_angle("Foo<T, Vec<U>> extends Bar<T>"), "Foo extends Bar");
    }

    #[test]
    fn test_every_scanner_reports_its_language() {
        assert_eq!(scanner_for(Language::Python).language(), Language::Python);
        assert_eq!(scanner_for(Language::Rust).language(), Language::Rust);
        assert_eq!(scanner_for(Language::TypeScript).language(), Language::TypeScript);
        assert_eq!(scanner_for(Language::JavaScript).language(), Language::JavaScript);
    }
}
