//! Best-effort call edges and complexity estimates from body text.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::graph::types::{EdgeType, GraphEdge, GraphNode, NodeType};

/// Identifiers that look like calls but never name a user callable.
static NOT_CALLS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // control flow and declarations
        "if", "for", "while", "switch", "catch", "return", "function", "typeof", "instanceof",
        "new", "delete", "void", "await", "yield", "super", "this", "self", "elif", "except",
        "with", "lambda", "not", "and", "or", "in", "is", "assert", "match", "loop", "fn",
        "impl", "where", "async", "def", "class", "import", "from", "sizeof",
        // ECMAScript built-ins
        "require", "console", "log", "error", "warn", "info", "debug", "setTimeout",
        "setInterval", "clearTimeout", "clearInterval", "parseInt", "parseFloat", "isNaN",
        "Number", "String", "Boolean", "Object", "Array", "Promise", "Symbol", "Date", "Map",
        "Set", "JSON", "Math", "Error", "RegExp", "fetch", "alert", "push", "map", "filter",
        "reduce", "forEach", "then", "resolve", "reject",
        // Python built-ins
        "print", "len", "range", "str", "int", "float", "bool", "dict", "list", "tuple", "set",
        "isinstance", "issubclass", "hasattr", "getattr", "setattr", "enumerate", "zip",
        "open", "sorted", "reversed", "min", "max", "sum", "any", "all", "type", "repr",
        // Rust built-ins and prelude
        "Some", "Ok", "Err", "Box", "Vec", "Rc", "Arc", "println", "print", "eprintln",
        "format", "vec", "panic", "assert_eq", "assert_ne", "unreachable", "todo", "write",
        "writeln", "matches", "unwrap", "expect", "clone", "into", "iter", "collect",
    ]
    .into_iter()
    .collect()
});

static CALL_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{L}_$][\w$]*\(").expect("static regex"));

static DECISION_POINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:if|for|while|case|catch|elif|except|match)\b|&&|\|\||\?\?")
        .expect("static regex")
});

pub(crate) fn is_denied(name: &str) -> bool {
    NOT_CALLS.contains(name)
}

/// Names called in `body`, first occurrence order, denylist applied.
pub(crate) fn called_names(body: &str) -> Vec<&str> {
    let mut seen = HashSet::new();
    CALL_TOKEN
        .find_iter(body)
        .map(|m| &body[m.start()..m.end() - 1])
        .filter(|name| !is_denied(name))
        .filter(|name| seen.insert(*name))
        .collect()
}

/// The text after the first whole-word `name` on the declaring line, so a
/// header like `def run(` is not read as a call. The whole text when the
/// name is not on that line.
pub(crate) fn after_declared_name<'a>(text: &'a str, name: &str) -> &'a str {
    let header = text.split('\n').next().unwrap_or("");
    let is_ident = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    if name.is_empty() {
        return text;
    }
    for (at, _) in header.match_indices(name) {
        let before = header[..at].chars().next_back();
        let after = header[at + name.len()..].chars().next();
        if !before.is_some_and(is_ident) && !after.is_some_and(is_ident) {
            return &text[at + name.len()..];
        }
    }
    text
}

/// 1 + number of decision points in `body`.
pub(crate) fn complexity(body: &str) -> usize {
    1 + DECISION_POINT.find_iter(body).count()
}

/// Link every caller to every other callable whose name it calls.
///
/// `bodies` holds `(caller index into nodes, body text)`. Same-name
/// callables are all linked; nothing is disambiguated.
pub(crate) fn call_edges(nodes: &[GraphNode], bodies: &[(usize, String)]) -> Vec<GraphEdge> {
    let mut callables: HashMap<&str, Vec<&GraphNode>> = HashMap::new();
    for node in nodes.iter().filter(|n| n.node_type.is_callable()) {
        callables.entry(node.name.as_str()).or_default().push(node);
    }

    let mut edges = Vec::new();
    let mut emitted = HashSet::new();
    for (caller_idx, body) in bodies {
        let caller = &nodes[*caller_idx];
        let edge_type = if caller.node_type == NodeType::Test {
            EdgeType::Tests
        } else {
            EdgeType::Calls
        };
        for name in called_names(body) {
            let Some(targets) = callables.get(name) else {
                continue;
            };
            for target in targets.iter().filter(|t| t.id != caller.id) {
                let edge = GraphEdge::new(caller.id.clone(), target.id.clone(), edge_type);
                if emitted.insert(edge.id.clone()) {
                    edges.push(edge);
                }
            }
        }
    }
    edges
}
