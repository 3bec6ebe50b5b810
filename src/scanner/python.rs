//! Python scanner.

use once_cell::sync::Lazy;
use regex::Regex;

use super::blocks::line_depths;
use super::language::Language;
use super::{
    api, block_end, split_names, strip_generics, BlockStyle, Extraction, NodeHandle, ScanOutput,
    SourceScanner,
};
use crate::graph::types::{EdgeType, NodeType};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static regex")
}

static IMPORT: Lazy<Regex> = Lazy::new(|| re(r"^import\s+(.+)$"));
static FROM_IMPORT: Lazy<Regex> = Lazy::new(|| re(r"^from\s+([\w.]+)\s+import\s+(.+)$"));
static DEF: Lazy<Regex> = Lazy::new(|| re(r"^(async\s+)?def\s+(\w+)"));
static CLASS: Lazy<Regex> = Lazy::new(|| re(r"^class\s+(\w+)\s*(?:\[[^\]]*\])?\s*(?:\(([^)]*)\))?"));
static ASSIGNMENT: Lazy<Regex> = Lazy::new(|| re(r"^([A-Za-z_]\w*)\s*(?::[^=]*)?=(?:[^=]|$)"));
static LAMBDA: Lazy<Regex> = Lazy::new(|| re(r"=\s*lambda\b"));
static NAME_LIST: Lazy<Regex> = Lazy::new(|| re(r#"['"]([^'"]+)['"]"#));

/// Scanner for Python sources.
pub struct PythonScanner;

impl SourceScanner for PythonScanner {
    fn language(&self) -> Language {
        Language::Python
    }

    fn scan(&self, file_path: &str, content: &str) -> ScanOutput {
        let mut x = Extraction::new(file_path, content, Language::Python);
        let depths = line_depths(&x.text.code, &['(', '[', '{'], &[')', ']', '}']);

        // Import statements count wherever they appear.
        for i in 0..x.text.len() {
            if depths[i] == 0 && !x.text.is_blank(i) {
                let line = x.text.code[i].trim().to_string();
                if IMPORT.is_match(&line) || FROM_IMPORT.is_match(&line) {
                    let end = x.block(i, false);
                    import_statement(&mut x, i, end);
                }
            }
        }

        let mut decorators: Vec<usize> = Vec::new();
        let mut i = 0;
        while i < x.text.len() {
            if x.text.is_blank(i) || depths[i] != 0 || x.text.indent(i) != 0 {
                i += 1;
                continue;
            }
            let line = x.text.code[i].trim().to_string();
            if line.starts_with('@') {
                decorators.push(i);
                i = x.block(i, false) + 1;
                continue;
            }
            let pending = std::mem::take(&mut decorators);

            if let Some(caps) = DEF.captures(&line) {
                let end = x.block(i, true);
                let name = caps[2].to_string();
                let node_type = if is_test_name(&name) {
                    NodeType::Test
                } else {
                    NodeType::Function
                };
                let handle = definition(&mut x, &depths, node_type, &name, i, end, None);
                if caps.get(1).is_some() {
                    x.meta(handle, "async", true);
                }
                decorate(&mut x, handle, &pending);
                i = end + 1;
                continue;
            }
            if let Some(caps) = CLASS.captures(&line) {
                let end = x.block(i, true);
                let name = caps[1].to_string();
                let bases = caps.get(2).map(|m| m.as_str().to_string());
                let handle = definition(&mut x, &depths, NodeType::Class, &name, i, end, None);
                for base in bases.iter().flat_map(|b| b.split(',')) {
                    let base = base.trim();
                    if base.is_empty() || base.contains('=') || base == "object" {
                        continue;
                    }
                    x.supertype(handle, NodeType::Class, &strip_generics(base), EdgeType::Extends);
                }
                decorate(&mut x, handle, &pending);
                class_members(&mut x, &depths, handle, i, end);
                i = end + 1;
                continue;
            }
            if let Some(caps) = ASSIGNMENT.captures(&line) {
                let end = x.block(i, false);
                let name = caps[1].to_string();
                assignment(&mut x, &name, &line, i, end, None);
                i = end + 1;
                continue;
            }
            i += 1;
        }

        x.finish()
    }
}

fn is_test_name(name: &str) -> bool {
    name == "test" || name.starts_with("test_")
}

fn import_statement(x: &mut Extraction, start: usize, end: usize) {
    let code = x
        .text
        .code_between(start, end)
        .replace('\n', " ")
        .replace(['(', ')', '\\'], " ");
    let code = code.trim();

    if let Some(caps) = FROM_IMPORT.captures(code) {
        let names = split_names(&caps[2]);
        x.import(&[caps[1].to_string()], &names, start, end);
    } else if let Some(caps) = IMPORT.captures(code) {
        let mut paths = Vec::new();
        let mut bound = Vec::new();
        for part in caps[1].split(',') {
            let part = part.trim();
            let (path, alias) = match part.split_once(" as ") {
                Some((path, alias)) => (path.trim(), alias.trim()),
                None => (part, part),
            };
            if !path.is_empty() {
                paths.push(path.to_string());
                bound.push(alias.to_string());
            }
        }
        if !paths.is_empty() {
            x.import(&paths, &bound, start, end);
        }
    }
}

/// Function, test or class spanning `start..=end`, with its docstring.
fn definition(
    x: &mut Extraction,
    depths: &[usize],
    node_type: NodeType,
    name: &str,
    start: usize,
    end: usize,
    parent: Option<NodeHandle>,
) -> NodeHandle {
    let handle = x.declare(node_type, name, start, end, parent);
    let header_end = (start..=end)
        .find(|&k| x.text.code[k].trim_end().ends_with(':') && depths.get(k + 1).map_or(true, |d| *d == 0))
        .unwrap_or(start);
    let doc = x.text.docstring_below(header_end).filter(|_| header_end < end);
    x.document(handle, doc);
    handle
}

/// Decorator texts, plus an endpoint when a decorator registers a route.
fn decorate(x: &mut Extraction, handle: NodeHandle, decorators: &[usize]) {
    if decorators.is_empty() {
        return;
    }
    let texts: Vec<String> = decorators
        .iter()
        .map(|&d| {
            let end = block_end(&x.text, d, BlockStyle::Indented, false);
            x.text.raw_joined(d, end.line)
        })
        .collect();
    x.meta(handle, "decorators", texts.clone());

    let target = x.nodes[handle].id.clone();
    for (&line, text) in decorators.iter().zip(&texts) {
        if let Some(route) = api::python_route(text) {
            let endpoint = x.endpoint(&route, line, line);
            x.edge(endpoint, target.clone(), EdgeType::Defines);
        }
    }
}

/// Module or class level `name = value`.
fn assignment(x: &mut Extraction, name: &str, line: &str, start: usize, end: usize, parent: Option<NodeHandle>) {
    if name == "__all__" && parent.is_none() {
        let raw = x.text.raw_joined(start, end);
        let listed: Vec<String> = NAME_LIST.captures_iter(&raw).map(|c| c[1].to_string()).collect();
        for symbol in listed {
            x.export(&symbol, start, false);
        }
        return;
    }
    let node_type = if LAMBDA.is_match(line) {
        NodeType::Function
    } else if parent.is_none() && is_constant_name(name) {
        NodeType::Constant
    } else {
        NodeType::Variable
    };
    x.declare(node_type, name, start, end, parent);
}

fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_uppercase())
        && name.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Methods and attributes at the first indentation level of a class body.
fn class_members(x: &mut Extraction, depths: &[usize], class: NodeHandle, start: usize, end: usize) {
    let Some(first) = (start + 1..=end).find(|&j| !x.text.is_blank(j) && depths[j] == 0) else {
        return;
    };
    let body_indent = x.text.indent(first);
    if body_indent == 0 {
        return;
    }

    let mut decorators: Vec<usize> = Vec::new();
    let mut j = first;
    while j <= end {
        if x.text.is_blank(j) || depths[j] != 0 || x.text.indent(j) != body_indent {
            j += 1;
            continue;
        }
        let line = x.text.code[j].trim().to_string();
        if line.starts_with('@') {
            decorators.push(j);
            j = x.block(j, false) + 1;
            continue;
        }
        let pending = std::mem::take(&mut decorators);

        if let Some(caps) = DEF.captures(&line) {
            let member_end = x.block(j, true).min(end);
            let name = caps[2].to_string();
            let node_type = if is_test_name(&name) {
                NodeType::Test
            } else {
                NodeType::Method
            };
            let handle = definition(x, depths, node_type, &name, j, member_end, Some(class));
            if caps.get(1).is_some() {
                x.meta(handle, "async", true);
            }
            decorate(x, handle, &pending);
            j = member_end + 1;
        } else if let Some(caps) = ASSIGNMENT.captures(&line) {
            let member_end = x.block(j, false).min(end);
            let name = caps[1].to_string();
            assignment(x, &name, &line, j, member_end, Some(class));
            j = member_end + 1;
        } else {
            j += 1;
        }
    }
}
