//! Rust scanner.
//!
//! Items are recognized at the nesting depth of their enclosing inline
//! modules, so nothing inside a function body is ever taken for an item.
//! `impl` blocks are resolved after the item pass, once every struct and
//! enum of the file is known.

use once_cell::sync::Lazy;
use regex::Regex;

use super::blocks::line_depths;
use super::language::Language;
use super::{strip_angle, Extraction, NodeHandle, ScanOutput, SourceScanner};
use crate::graph::types::{EdgeType, NodeType};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static regex")
}

static VISIBILITY: Lazy<Regex> = Lazy::new(|| re(r"^pub(\([^)]*\))?\s+"));
static FN: Lazy<Regex> = Lazy::new(|| {
    re(r#"^((?:(?:const|async|unsafe|default|extern\s*(?:"[^"]*")?)\s+)*)fn\s+(\w+)"#)
});
static STRUCT: Lazy<Regex> = Lazy::new(|| re(r"^(?:struct|union)\s+(\w+)"));
static ENUM: Lazy<Regex> = Lazy::new(|| re(r"^enum\s+(\w+)"));
static TRAIT: Lazy<Regex> = Lazy::new(|| re(r"^(?:unsafe\s+)?(?:auto\s+)?trait\s+(\w+)"));
static TYPE_ALIAS: Lazy<Regex> = Lazy::new(|| re(r"^type\s+(\w+)"));
static CONST: Lazy<Regex> = Lazy::new(|| re(r"^const\s+(\w+)\s*:"));
static STATIC: Lazy<Regex> = Lazy::new(|| re(r"^static\s+(mut\s+)?(\w+)\s*:"));
static MOD: Lazy<Regex> = Lazy::new(|| re(r"^mod\s+(\w+)\s*(;|\{)?"));
static USE: Lazy<Regex> = Lazy::new(|| re(r"^use\s+"));
static EXTERN_CRATE: Lazy<Regex> = Lazy::new(|| re(r"^extern\s+crate\s+(\w+)"));
static IMPL: Lazy<Regex> = Lazy::new(|| re(r"^(?:unsafe\s+)?impl\b"));
static IMPL_FOR: Lazy<Regex> = Lazy::new(|| re(r"^impl\s+!?([\w:]+)\s+for\s+([\w:]+)"));
static IMPL_SELF: Lazy<Regex> = Lazy::new(|| re(r"^impl\s+([\w:]+)"));
static FIELD: Lazy<Regex> = Lazy::new(|| re(r"^(?:pub(?:\([^)]*\))?\s+)?(\w+)\s*:[^:]"));

/// Scanner for Rust sources.
pub struct RustScanner;

/// An `impl` block waiting for the item pass to finish.
struct PendingImpl {
    start: usize,
    end: usize,
    self_type: String,
    trait_name: Option<String>,
}

impl SourceScanner for RustScanner {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn scan(&self, file_path: &str, content: &str) -> ScanOutput {
        let mut x = Extraction::new(file_path, content, Language::Rust);
        let depths = line_depths(&x.text.code, &['{'], &['}']);

        let mut modules: Vec<(NodeHandle, usize)> = Vec::new();
        let mut impls: Vec<PendingImpl> = Vec::new();
        let mut attributes: Vec<String> = Vec::new();
        let mut i = 0;

        while i < x.text.len() {
            while modules.last().is_some_and(|&(_, end)| end < i) {
                modules.pop();
            }
            if x.text.is_blank(i) || depths[i] != modules.len() {
                i += 1;
                continue;
            }
            let line = x.text.code[i].trim().to_string();
            if line.starts_with("#!") {
                i += 1;
                continue;
            }
            if line.starts_with("#[") {
                let end = x.block(i, false);
                attributes.push(x.text.code_between(i, end).replace('\n', " "));
                i = end + 1;
                continue;
            }
            let attrs = std::mem::take(&mut attributes);
            let parent = modules.last().map(|&(handle, _)| handle);

            let public = VISIBILITY.captures(&line).map(|c| c.get(1).is_none());
            let rest = VISIBILITY.replace(&line, "").to_string();

            if IMPL.is_match(&rest) {
                let end = x.block(i, true);
                if let Some(pending) = impl_header(&x, i, end) {
                    impls.push(pending);
                }
                i = end + 1;
                continue;
            }
            if let Some(caps) = MOD.captures(&rest) {
                let inline = caps.get(2).is_some_and(|m| m.as_str() == "{");
                let end = if inline { x.block(i, true) } else { i };
                let handle = x.declare(NodeType::Module, &caps[1], i, end, parent);
                x.document_above(handle, i);
                if attrs.iter().any(|a| a.contains("cfg(test)")) {
                    x.meta(handle, "cfg_test", true);
                }
                export_if_public(&mut x, handle, public, parent, i);
                if inline {
                    modules.push((handle, end));
                    i += 1;
                } else {
                    i = end + 1;
                }
                continue;
            }

            match item(&mut x, &depths, i, &rest, &attrs, parent) {
                Some((handle, end)) => {
                    export_if_public(&mut x, handle, public, parent, i);
                    i = end + 1;
                }
                None => i += 1,
            }
        }

        for pending in impls {
            impl_block(&mut x, &depths, pending);
        }

        x.finish()
    }
}

fn export_if_public(x: &mut Extraction, handle: NodeHandle, public: Option<bool>, parent: Option<NodeHandle>, line: usize) {
    if public == Some(true) && parent.is_none() {
        let name = x.nodes[handle].name.clone();
        x.meta(handle, "exported", true);
        x.export(&name, line, false);
    }
}

/// One non-module, non-impl item starting at `i`.
fn item(
    x: &mut Extraction,
    depths: &[usize],
    i: usize,
    rest: &str,
    attrs: &[String],
    parent: Option<NodeHandle>,
) -> Option<(NodeHandle, usize)> {
    if USE.is_match(rest) {
        let end = x.block(i, false);
        let code = x.text.code_between(i, end).replace('\n', " ");
        let tree = VISIBILITY.replace(code.trim(), "");
        let tree = tree.trim_start_matches("use").trim().trim_end_matches(';').trim();
        let (path, specifiers) = use_tree(tree);
        let handle = x.import(&[path], &specifiers, i, end);
        return Some((handle, end));
    }
    if let Some(caps) = EXTERN_CRATE.captures(rest) {
        let handle = x.import(&[caps[1].to_string()], &[], i, i);
        return Some((handle, i));
    }

    if let Some(caps) = FN.captures(rest) {
        let end = x.block(i, true);
        let is_test = attrs.iter().any(|a| is_test_attribute(a));
        let node_type = if is_test { NodeType::Test } else { NodeType::Function };
        let handle = x.declare(node_type, &caps[2], i, end, parent);
        x.document_above(handle, i);
        if caps[1].contains("async") {
            x.meta(handle, "async", true);
        }
        return Some((handle, end));
    }
    if let Some(caps) = STRUCT.captures(rest) {
        let end = x.block(i, true);
        let handle = x.declare(NodeType::Class, &caps[1], i, end, parent);
        x.document_above(handle, i);
        fields(x, depths, handle, i, end);
        return Some((handle, end));
    }
    if let Some(caps) = ENUM.captures(rest) {
        let end = x.block(i, true);
        let handle = x.declare(NodeType::Enum, &caps[1], i, end, parent);
        x.document_above(handle, i);
        return Some((handle, end));
    }
    if let Some(caps) = TRAIT.captures(rest) {
        let end = x.block(i, true);
        let handle = x.declare(NodeType::Interface, &caps[1], i, end, parent);
        x.document_above(handle, i);
        let header = header(x, i, end);
        let header = header.split(" where").next().unwrap_or("");
        let bounds = header.split_once(':').map(|(_, b)| b.to_string());
        for bound in bounds.iter().flat_map(|b| b.split('+')) {
            let bound = bound.trim();
            if bound.is_empty() || bound.starts_with('\'') || bound.starts_with('?') {
                continue;
            }
            x.supertype(handle, NodeType::Interface, bound, EdgeType::Extends);
        }
        methods(x, depths, Some(handle), i, end);
        return Some((handle, end));
    }
    if let Some(caps) = TYPE_ALIAS.captures(rest) {
        let end = x.block(i, false);
        let handle = x.declare(NodeType::TypeAlias, &caps[1], i, end, parent);
        x.document_above(handle, i);
        return Some((handle, end));
    }
    if let Some(caps) = CONST.captures(rest) {
        let end = x.block(i, false);
        let handle = x.declare(NodeType::Constant, &caps[1], i, end, parent);
        x.document_above(handle, i);
        return Some((handle, end));
    }
    if let Some(caps) = STATIC.captures(rest) {
        let end = x.block(i, false);
        let node_type = if caps.get(1).is_some() {
            NodeType::Variable
        } else {
            NodeType::Constant
        };
        let handle = x.declare(node_type, &caps[2], i, end, parent);
        x.document_above(handle, i);
        return Some((handle, end));
    }
    None
}

fn is_test_attribute(attr: &str) -> bool {
    let inner = attr.trim().trim_start_matches("#[").trim_end_matches(']').trim();
    inner == "test" || inner.ends_with("::test") || inner.starts_with("test_case")
}

/// `a::b::{c, d as e}` -> (`a::b`, [c, e]); `a::b::C` -> (`a::b::C`, [C]);
/// `a::*` -> (`a`, [*]).
fn use_tree(tree: &str) -> (String, Vec<String>) {
    match tree.split_once('{') {
        Some((prefix, list)) => {
            let path = prefix.trim().trim_end_matches("::").to_string();
            let list = list.replace(['{', '}'], ",");
            let specifiers = list
                .split(',')
                .filter_map(|part| {
                    let part = part.trim();
                    let visible = part
                        .rsplit_once(" as ")
                        .map_or_else(|| part.rsplit("::").next().unwrap_or(part), |(_, alias)| alias.trim());
                    (!visible.is_empty()).then(|| visible.to_string())
                })
                .collect();
            (path, specifiers)
        }
        None if tree.ends_with("::*") => (tree.trim_end_matches("::*").to_string(), vec!["*".to_string()]),
        None => {
            let (path, visible) = match tree.split_once(" as ") {
                Some((path, alias)) => (path.trim(), alias.trim()),
                None => (tree, tree.rsplit("::").next().unwrap_or(tree)),
            };
            (path.to_string(), vec![visible.to_string()])
        }
    }
}

/// Declaration header before its body, generics and visibility removed.
fn header(x: &Extraction, start: usize, end: usize) -> String {
    let header_line = x.text.find_forward(start, '{', end + 1 - start).unwrap_or(end);
    let code = x.text.code_between(start, header_line).replace('\n', " ");
    let code = code.split('{').next().unwrap_or("").trim().to_string();
    let code = VISIBILITY.replace(&code, "").to_string();
    strip_angle(&code)
}

fn impl_header(x: &Extraction, start: usize, end: usize) -> Option<PendingImpl> {
    let header = header(x, start, end);
    let header = header.trim_start_matches("unsafe").trim_start();
    let header = header.split(" where").next().unwrap_or(header).trim();
    let last = |path: &str| path.rsplit("::").next().unwrap_or(path).to_string();

    if let Some(caps) = IMPL_FOR.captures(header) {
        return Some(PendingImpl {
            start,
            end,
            self_type: last(&caps[2]),
            trait_name: Some(last(&caps[1])),
        });
    }
    IMPL_SELF.captures(header).map(|caps| PendingImpl {
        start,
        end,
        self_type: last(&caps[1]),
        trait_name: None,
    })
}

/// Attach impl methods to the implementing type's node, when it is in this file.
fn impl_block(x: &mut Extraction, depths: &[usize], pending: PendingImpl) {
    let owner = x
        .nodes
        .iter()
        .position(|n| matches!(n.node_type, NodeType::Class | NodeType::Enum) && n.name == pending.self_type);

    // Foreign types get no `implements` edge; the methods record the trait.
    if let (Some(owner), Some(trait_name)) = (owner, &pending.trait_name) {
        x.supertype(owner, NodeType::Interface, trait_name, EdgeType::Implements);
    }

    let found = methods(x, depths, owner, pending.start, pending.end);
    for handle in found {
        x.meta(handle, "impl_for", pending.self_type.clone());
        if let Some(trait_name) = &pending.trait_name {
            x.meta(handle, "trait", trait_name.clone());
        }
    }
}

/// `fn` items directly inside a trait or impl body. Without a `parent` the
/// owning type lives in another file.
fn methods(
    x: &mut Extraction,
    depths: &[usize],
    parent: Option<NodeHandle>,
    start: usize,
    end: usize,
) -> Vec<NodeHandle> {
    let body_depth = depths[start] + 1;
    let mut found = Vec::new();
    let mut attributes: Vec<String> = Vec::new();
    let mut j = start + 1;
    while j <= end {
        if x.text.is_blank(j) || depths[j] != body_depth {
            j += 1;
            continue;
        }
        let line = x.text.code[j].trim().to_string();
        if line.starts_with("#[") {
            attributes.push(line);
            j += 1;
            continue;
        }
        let attrs = std::mem::take(&mut attributes);
        let rest = VISIBILITY.replace(&line, "").to_string();
        let Some(caps) = FN.captures(&rest) else {
            j += 1;
            continue;
        };
        let member_end = x.block(j, true).min(end);
        let node_type = if attrs.iter().any(|a| is_test_attribute(a)) {
            NodeType::Test
        } else {
            NodeType::Method
        };
        let handle = x.declare(node_type, &caps[2], j, member_end, parent);
        x.document_above(handle, j);
        if caps[1].contains("async") {
            x.meta(handle, "async", true);
        }
        found.push(handle);
        j = member_end + 1;
    }
    found
}

/// Named fields of a braced struct.
fn fields(x: &mut Extraction, depths: &[usize], parent: NodeHandle, start: usize, end: usize) {
    let body_depth = depths[start] + 1;
    for j in start + 1..=end {
        if x.text.is_blank(j) || depths[j] != body_depth {
            continue;
        }
        let line = x.text.code[j].trim().to_string();
        if let Some(caps) = FIELD.captures(&line) {
            x.declare(NodeType::Variable, &caps[1], j, j, Some(parent));
        }
    }
}
