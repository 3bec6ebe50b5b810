//! JavaScript / TypeScript scanner.

use once_cell::sync::Lazy;
use regex::Regex;

use super::blocks::line_depths;
use super::language::Language;
use super::{api, split_names, strip_angle, Extraction, NodeHandle, ScanOutput, SourceScanner};
use crate::graph::types::{EdgeType, NodeType};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static regex")
}

static IMPORT: Lazy<Regex> = Lazy::new(|| re(r"^import\b\s*[^\s(]"));
static FROM_PATH: Lazy<Regex> = Lazy::new(|| re(r#"\bfrom\s*['"]([^'"]+)['"]"#));
static BARE_IMPORT: Lazy<Regex> = Lazy::new(|| re(r#"^import\s*['"]([^'"]+)['"]"#));
static REQUIRE: Lazy<Regex> = Lazy::new(|| re(r#"\brequire\(\s*['"]([^'"]+)['"]\s*\)"#));
static REQUIRE_BINDING: Lazy<Regex> =
    Lazy::new(|| re(r"^(?:const|let|var)\s+(\{[^}]*\}|[\w$]+)\s*=\s*require\("));

static EXPORT_LIST: Lazy<Regex> = Lazy::new(|| re(r"^export\s*(?:type\s*)?\{([^}]*)\}"));
static EXPORT_STAR: Lazy<Regex> = Lazy::new(|| re(r"^export\s*\*\s*(?:as\s+([\w$]+))?"));
static MODULE_EXPORTS: Lazy<Regex> = Lazy::new(|| re(r"^module\.exports\s*=\s*(.*)$"));
static NAMED_EXPORT: Lazy<Regex> = Lazy::new(|| re(r"^(?:module\.)?exports\.([\w$]+)\s*="));

static CLASS: Lazy<Regex> = Lazy::new(|| re(r"^(?:abstract\s+)?class\b\s*([\w$]*)"));
static INTERFACE: Lazy<Regex> = Lazy::new(|| re(r"^interface\s+([\w$]+)"));
static TYPE_ALIAS: Lazy<Regex> = Lazy::new(|| re(r"^type\s+([\w$]+)\s*(?:<.*>)?\s*="));
static ENUM: Lazy<Regex> = Lazy::new(|| re(r"^(?:const\s+)?enum\s+([\w$]+)"));
static FUNCTION: Lazy<Regex> = Lazy::new(|| re(r"^(async\s+)?function\b\s*\*?\s*([\w$]*)"));
static NAMESPACE: Lazy<Regex> = Lazy::new(|| re(r"^(?:namespace|module)\s+([\w$.]+)"));
static BINDING: Lazy<Regex> = Lazy::new(|| re(r"^(const|let|var)\s+([\w$]+)\s*[:=]"));
static BARE_NAME: Lazy<Regex> = Lazy::new(|| re(r"^([\w$]+)\s*;?\s*$"));

static EXTENDS: Lazy<Regex> = Lazy::new(|| re(r"\bextends\s+([\w$.]+)"));
static EXTENDS_LIST: Lazy<Regex> = Lazy::new(|| re(r"\bextends\s+([\w$.,\s]+)"));
static IMPLEMENTS: Lazy<Regex> = Lazy::new(|| re(r"\bimplements\s+([\w$.,\s]+)"));

static ARROW_VALUE: Lazy<Regex> = Lazy::new(|| {
    re(r"=\s*(async\s+)?(?:function\b|(?:\([^)]*\)|[\w$]+)\s*(?::[^=]*)?=>)")
});

static MEMBER_PREFIX: Lazy<Regex> = Lazy::new(|| {
    re(r"^(?:@[\w.]+(?:\([^)]*\))?\s*)*(?:(?:public|private|protected|static|readonly|abstract|async|override|declare|get|set|accessor)\s+)*\*?\s*")
});
static METHOD: Lazy<Regex> = Lazy::new(|| re(r"^([#\w$]+)\s*[?!]?\s*(?:<[^>]*>)?\s*\("));
static PROPERTY: Lazy<Regex> = Lazy::new(|| re(r"^([#\w$]+)\s*[?!]?\s*(?:[:=;,]|$)"));

static TEST_CALL: Lazy<Regex> = Lazy::new(|| re(r#"^\s*(?:it|test)(?:\.\w+)*\s*\(\s*['"`]"#));
static TEST_NAME: Lazy<Regex> =
    Lazy::new(|| re(r#"(?:it|test)(?:\.\w+)*\s*\(\s*['"`]([^'"`]*)['"`]"#));

static JSX_MARKUP: Lazy<Regex> =
    Lazy::new(|| re(r"</[A-Za-z][\w.]*\s*>|<[A-Za-z][\w.]*[^<>]*/>"));

/// Words that can sit where a member name would but never are one.
const NOT_MEMBERS: [&str; 14] = [
    "if", "for", "while", "switch", "catch", "return", "super", "new", "await", "typeof",
    "function", "else", "do", "try",
];

/// Scanner for the ECMAScript family.
pub struct EcmaScanner {
    language: Language,
}

impl EcmaScanner {
    pub const JAVASCRIPT: EcmaScanner = EcmaScanner {
        language: Language::JavaScript,
    };
    pub const TYPESCRIPT: EcmaScanner = EcmaScanner {
        language: Language::TypeScript,
    };
}

impl SourceScanner for EcmaScanner {
    fn language(&self) -> Language {
        self.language
    }

    fn scan(&self, file_path: &str, content: &str) -> ScanOutput {
        let mut x = Extraction::new(file_path, content, self.language);
        let depths = line_depths(&x.text.code, &['{'], &['}']);
        let jsx = Language::allows_jsx(file_path);

        let mut i = 0;
        while i < x.text.len() {
            if depths[i] != 0 || x.text.is_blank(i) {
                i += 1;
                continue;
            }
            i = statement(&mut x, &depths, i, jsx) + 1;
        }

        // Tests and routes are registered by calls, at any depth.
        for i in 0..x.text.len() {
            if TEST_CALL.is_match(&x.text.code[i]) {
                let name = TEST_NAME
                    .captures(x.text.raw[i])
                    .map_or_else(|| "test".to_string(), |c| c[1].to_string());
                let end = x.block(i, false);
                x.declare(NodeType::Test, &name, i, end, None);
            } else if !x.text.is_blank(i) {
                if let Some(route) = api::ecma_route(x.text.raw[i]) {
                    let end = x.block(i, false);
                    x.endpoint(&route, i, end);
                }
            }
        }

        x.finish()
    }
}

/// Handle the top-level statement starting at `i`; returns its last line.
fn statement(x: &mut Extraction, depths: &[usize], i: usize, jsx: bool) -> usize {
    let line = x.text.code[i].trim().to_string();

    if IMPORT.is_match(&line) {
        let end = x.block(i, false);
        import_statement(x, i, end);
        return end;
    }
    if REQUIRE_BINDING.is_match(&line) {
        let end = x.block(i, false);
        let raw = x.text.raw_joined(i, end);
        if let Some(path) = REQUIRE.captures(&raw).map(|c| c[1].to_string()) {
            let binding = REQUIRE_BINDING
                .captures(&line)
                .map(|c| c[1].replace(':', " as "))
                .unwrap_or_default();
            x.import(&[path], &binding_names(&binding), i, end);
        }
        return end;
    }
    if line.starts_with("export") {
        if let Some(end) = export_statement(x, depths, i, &line, jsx) {
            return end;
        }
    }
    if let Some(end) = commonjs_export(x, i, &line) {
        return end;
    }

    let rest = line.strip_prefix("declare ").unwrap_or(&line).trim_start();
    match declaration(x, depths, i, rest, false, jsx) {
        Some((_, end)) => end,
        None => i,
    }
}

fn import_statement(x: &mut Extraction, start: usize, end: usize) {
    let raw = x.text.raw_joined(start, end);
    let path = FROM_PATH
        .captures(&raw)
        .or_else(|| BARE_IMPORT.captures(&raw))
        .or_else(|| REQUIRE.captures(&raw))
        .map(|c| c[1].to_string());
    let Some(path) = path else {
        x.error(start, "import without a module path");
        return;
    };
    let code = x.text.code_between(start, end).replace('\n', " ");
    let clause = code
        .trim_start()
        .trim_start_matches("import")
        .split(" from")
        .next()
        .unwrap_or("")
        .split('=')
        .next()
        .unwrap_or("");
    x.import(&[path], &binding_names(clause), start, end);
}

/// Names bound by an import clause: default, namespace and `{ ... }` list.
fn binding_names(clause: &str) -> Vec<String> {
    let clause = clause.trim().trim_start_matches("type ").trim();
    let mut listed = Vec::new();
    let mut outside = clause.to_string();
    if let (Some(open), Some(close)) = (clause.find('{'), clause.rfind('}')) {
        if open < close {
            listed = split_names(&clause[open + 1..close]);
            outside = format!("{} {}", &clause[..open], &clause[close + 1..]);
        }
    }
    let mut names: Vec<String> = outside
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.rsplit_once(" as ").map_or(part, |(_, alias)| alias.trim()).to_string()
        })
        .filter(|name| !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$'))
        .collect();
    names.extend(listed);
    names
}

fn export_statement(x: &mut Extraction, depths: &[usize], i: usize, line: &str, jsx: bool) -> Option<usize> {
    if let Some(caps) = EXPORT_LIST.captures(line) {
        let end = x.block(i, false);
        // The list may span lines; re-read it from the whole statement.
        let code = x.text.code_between(i, end).replace('\n', " ");
        let list = EXPORT_LIST
            .captures(&code)
            .map_or_else(|| caps[1].to_string(), |c| c[1].to_string());
        for name in split_names(&list) {
            x.export(&name, i, name == "default");
        }
        reexport_source(x, i, end);
        return Some(end);
    }
    if let Some(caps) = EXPORT_STAR.captures(line) {
        let end = x.block(i, false);
        let name = caps.get(1).map_or("*", |m| m.as_str());
        x.export(name, i, false);
        reexport_source(x, i, end);
        return Some(end);
    }

    let mut rest = line.strip_prefix("export")?.trim_start();
    let default = match rest.strip_prefix("default") {
        Some(r) => {
            rest = r.trim_start();
            true
        }
        None => false,
    };
    rest = rest.strip_prefix("declare ").unwrap_or(rest).trim_start();

    if let Some((handle, end)) = declaration(x, depths, i, rest, default, jsx) {
        let name = x.nodes[handle].name.clone();
        x.meta(handle, "exported", true);
        x.export(&name, i, default);
        return Some(end);
    }
    if default {
        let end = x.block(i, false);
        let name = BARE_NAME
            .captures(rest)
            .map_or_else(|| "default".to_string(), |c| c[1].to_string());
        x.export(&name, i, true);
        return Some(end);
    }
    None
}

/// `export ... from 'x'` also imports `x`.
fn reexport_source(x: &mut Extraction, start: usize, end: usize) {
    let raw = x.text.raw_joined(start, end);
    if let Some(path) = FROM_PATH.captures(&raw).map(|c| c[1].to_string()) {
        x.import(&[path], &[], start, end);
    }
}

fn commonjs_export(x: &mut Extraction, i: usize, line: &str) -> Option<usize> {
    if let Some(caps) = NAMED_EXPORT.captures(line) {
        let end = x.block(i, false);
        x.export(&caps[1], i, false);
        return Some(end);
    }
    let value = MODULE_EXPORTS.captures(line)?.get(1)?.as_str().trim().to_string();
    let end = x.block(i, false);
    if value.starts_with('{') {
        let code = x.text.code_between(i, end).replace('\n', " ");
        let inner = code
            .split_once('{')
            .and_then(|(_, r)| r.rsplit_once('}'))
            .map_or("", |(inner, _)| inner);
        for entry in inner.split(',') {
            let key = entry.split(':').next().unwrap_or("").trim();
            if !key.is_empty() && key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
                x.export(key, i, false);
            }
        }
    } else {
        let name = BARE_NAME
            .captures(&value)
            .map_or_else(|| "default".to_string(), |c| c[1].to_string());
        x.export(&name, i, true);
    }
    Some(end)
}

/// Declarations that can appear at top level, with or without `export`.
fn declaration(
    x: &mut Extraction,
    depths: &[usize],
    i: usize,
    rest: &str,
    default: bool,
    jsx: bool,
) -> Option<(NodeHandle, usize)> {
    let anonymous = |name: &str| -> Option<String> {
        if !name.is_empty() {
            Some(name.to_string())
        } else if default {
            Some("default".to_string())
        } else {
            None
        }
    };

    if let Some(caps) = CLASS.captures(rest) {
        let name = anonymous(&caps[1])?;
        let end = x.block(i, true);
        let handle = x.declare(NodeType::Class, &name, i, end, None);
        x.document_above(handle, i);
        let header = heritage_header(x, i, end);
        if let Some(c) = EXTENDS.captures(&header) {
            x.supertype(handle, NodeType::Class, &c[1], EdgeType::Extends);
        }
        if let Some(c) = IMPLEMENTS.captures(&header) {
            for name in c[1].split(',') {
                x.supertype(handle, NodeType::Interface, name.trim(), EdgeType::Implements);
            }
        }
        members(x, depths, handle, i, end, false);
        return Some((handle, end));
    }

    if let Some(caps) = INTERFACE.captures(rest) {
        let end = x.block(i, true);
        let handle = x.declare(NodeType::Interface, &caps[1], i, end, None);
        x.document_above(handle, i);
        let header = heritage_header(x, i, end);
        if let Some(c) = EXTENDS_LIST.captures(&header) {
            for name in c[1].split(',') {
                x.supertype(handle, NodeType::Interface, name.trim(), EdgeType::Extends);
            }
        }
        members(x, depths, handle, i, end, true);
        return Some((handle, end));
    }

    if let Some(caps) = TYPE_ALIAS.captures(rest) {
        let end = x.block(i, false);
        let handle = x.declare(NodeType::TypeAlias, &caps[1], i, end, None);
        x.document_above(handle, i);
        return Some((handle, end));
    }

    if let Some(caps) = ENUM.captures(rest) {
        let end = x.block(i, true);
        let handle = x.declare(NodeType::Enum, &caps[1], i, end, None);
        x.document_above(handle, i);
        return Some((handle, end));
    }

    if let Some(caps) = FUNCTION.captures(rest) {
        let name = anonymous(&caps[2])?;
        let end = x.block(i, true);
        let handle = declare_function(x, &name, i, end, jsx);
        if caps.get(1).is_some() {
            x.meta(handle, "async", true);
        }
        return Some((handle, end));
    }

    if let Some(caps) = NAMESPACE.captures(rest) {
        let end = x.block(i, true);
        let handle = x.declare(NodeType::Module, &caps[1], i, end, None);
        x.document_above(handle, i);
        return Some((handle, end));
    }

    if let Some(caps) = BINDING.captures(rest) {
        let end = x.block(i, false);
        let statement = x.text.code_between(i, end);
        let handle = match ARROW_VALUE.captures(&statement) {
            Some(arrow) => {
                let handle = declare_function(x, &caps[2], i, end, jsx);
                if arrow.get(1).is_some() {
                    x.meta(handle, "async", true);
                }
                handle
            }
            None => {
                let node_type = if &caps[1] == "const" {
                    NodeType::Constant
                } else {
                    NodeType::Variable
                };
                let handle = x.declare(node_type, &caps[2], i, end, None);
                x.document_above(handle, i);
                handle
            }
        };
        return Some((handle, end));
    }

    None
}

/// A function, or a component when it renders markup in a JSX file.
fn declare_function(x: &mut Extraction, name: &str, start: usize, end: usize, jsx: bool) -> NodeHandle {
    let capitalized = name.chars().next().is_some_and(char::is_uppercase);
    let node_type = if jsx && capitalized && JSX_MARKUP.is_match(&x.text.raw_joined(start, end)) {
        NodeType::Component
    } else {
        NodeType::Function
    };
    let handle = x.declare(node_type, name, start, end, None);
    x.document_above(handle, start);
    handle
}

/// Declaration header up to its opening brace, generics removed.
fn heritage_header(x: &Extraction, start: usize, end: usize) -> String {
    let header_line = x.text.find_forward(start, '{', end + 1 - start).unwrap_or(start);
    let header = x.text.code_between(start, header_line).replace('\n', " ");
    strip_angle(header.split('{').next().unwrap_or(""))
}

/// Members of the class/interface body spanning `start..=end`.
fn members(x: &mut Extraction, depths: &[usize], parent: NodeHandle, start: usize, end: usize, interface: bool) {
    if start == end {
        let line = x.text.code[start].clone();
        let Some(open) = line.find('{') else {
            return;
        };
        let close = line.rfind('}').filter(|&c| c > open).unwrap_or(line.len());
        for chunk in inline_members(&line[open + 1..close]) {
            if let Some((node_type, name)) = classify_member(&chunk) {
                x.declare(node_type, &name, start, start, Some(parent));
            }
        }
        return;
    }

    let body_depth = depths[start] + 1;
    let mut j = start + 1;
    while j <= end {
        if depths[j] != body_depth || x.text.is_blank(j) {
            j += 1;
            continue;
        }
        let line = x.text.code[j].trim().to_string();
        match classify_member(&line) {
            Some((node_type, name)) => {
                let expect_body = node_type == NodeType::Method && !interface;
                let member_end = x.block(j, expect_body).min(end);
                let handle = x.declare(node_type, &name, j, member_end, Some(parent));
                x.document_above(handle, j);
                j = member_end + 1;
            }
            None => j += 1,
        }
    }
}

/// Split a one-line body into member texts at nesting depth zero.
fn inline_members(body: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    for ch in body.chars() {
        current.push(ch);
        match ch {
            '{' | '(' => depth += 1,
            ')' => depth -= 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    chunks.push(std::mem::take(&mut current));
                }
            }
            ';' | ',' if depth == 0 => chunks.push(std::mem::take(&mut current)),
            _ => {}
        }
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Member kind and name for the text starting a class/interface member.
fn classify_member(text: &str) -> Option<(NodeType, String)> {
    let text = MEMBER_PREFIX.replace(text.trim(), "");
    let clean = |name: &str| name.trim_start_matches('#').to_string();

    if let Some(caps) = METHOD.captures(&text) {
        let name = &caps[1];
        return (!NOT_MEMBERS.contains(&name)).then(|| (NodeType::Method, clean(name)));
    }
    let caps = PROPERTY.captures(&text)?;
    let name = &caps[1];
    if NOT_MEMBERS.contains(&name) {
        return None;
    }
    let node_type = if ARROW_VALUE.is_match(&text) {
        NodeType::Method
    } else {
        NodeType::Variable
    };
    Some((node_type, clean(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::GraphNode;
    use crate::scanner::scan_file;

    fn find<'a>(out: &'a ScanOutput, node_type: NodeType, name: &str) -> &'a GraphNode {
        out.nodes
            .iter()
            .find(|n| n.node_type == node_type && n.name == name)
            .unwrap_or_else(|| panic!("no {} named {}", node_type, name))
    }

    fn has_edge(out: &ScanOutput, source: &str, edge_type: EdgeType, target: &str) -> bool {
        out.edges
            .iter()
            .any(|e| e.source == source && e.edge_type == edge_type && e.target == target)
    }

    #[test]
    fn test_class_with_extends_and_inline_method() {
        let out = scan_file("a.ts", "class Foo extends Bar { method() {} }");
        let classes: Vec<_> = out.nodes.iter().filter(|n| n.node_type == NodeType::Class).collect();
        assert_eq!(classes.len(), 1);
        let foo = classes[0];
        assert_eq!(foo.name, "Foo");
        assert!(has_edge(&out, &foo.id, EdgeType::Extends, "class:Bar"));

        let methods: Vec<_> = out.nodes.iter().filter(|n| n.node_type == NodeType::Method).collect();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].name, "method");
        assert!(has_edge(&out, &foo.id, EdgeType::Contains, &methods[0].id));
        assert!(out.errors.is_empty());
    }

    #[test]
    fn test_named_import() {
        let out = scan_file("a.ts", "import { a, b } from 'x'");
        let imports: Vec<_> = out.nodes.iter().filter(|n| n.node_type == NodeType::Import).collect();
        assert_eq!(imports.len(), 1);
        assert!(has_edge(&out, &imports[0].id, EdgeType::Imports, "module:x"));
        assert_eq!(
            imports[0].metadata.get("specifiers"),
            Some(&serde_json::json!(["a", "b"]))
        );
    }

    #[test]
    fn test_import_forms() {
        let src = "import React, { useState as useS } from 'react';\nimport './styles.css';\nimport {\n  one,\n  two,\n} from \"../lib\";\nconst fs = require('fs');\n";
        let out = scan_file("a.js", src);
        let targets: Vec<&str> = out
            .edges
            .iter()
            .filter(|e| e.edge_type == EdgeType::Imports)
            .map(|e| e.target.as_str())
            .collect();
        assert_eq!(targets, vec!["module:react", "module:./styles.css", "module:../lib", "module:fs"]);
        let react = find(&out, NodeType::Import, "react");
        assert_eq!(react.metadata.get("specifiers"), Some(&serde_json::json!(["React", "useS"])));
        let lib = find(&out, NodeType::Import, "../lib");
        assert_eq!((lib.start_line, lib.end_line), (Some(3), Some(6)));
    }

    #[test]
    fn test_export_list_expands_one_node_per_name() {
        let out = scan_file("a.ts", "const a = 1;\nconst b = 2;\nexport { a, b as c };\n");
        let exports: Vec<&str> = out
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Export)
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(exports, vec!["a", "c"]);
        let c = find(&out, NodeType::Export, "c");
        assert!(has_edge(&out, &c.id, EdgeType::Exports, "internal:c"));
    }

    #[test]
    fn test_exported_declarations_and_default() {
        let src = "export function run() {}\nexport default class {}\nexport const VERSION = '1';\n";
        let out = scan_file("a.ts", src);
        assert!(find(&out, NodeType::Function, "run").metadata.contains_key("exported"));
        find(&out, NodeType::Class, "default");
        find(&out, NodeType::Constant, "VERSION");
        let default = find(&out, NodeType::Export, "default");
        assert_eq!(default.metadata.get("default"), Some(&serde_json::json!(true)));
    }

    #[test]
    fn test_top_level_bindings_only() {
        let src = "const handler = async (req) => {\n  const inner = 1;\n  return inner;\n};\nlet count = 0;\nfunction outer() {\n  var hidden = 2;\n}\n";
        let out = scan_file("a.js", src);
        let handler = find(&out, NodeType::Function, "handler");
        assert_eq!(handler.metadata.get("async"), Some(&serde_json::json!(true)));
        assert_eq!((handler.start_line, handler.end_line), (Some(1), Some(4)));
        find(&out, NodeType::Variable, "count");
        assert!(!out.nodes.iter().any(|n| n.name == "inner" || n.name == "hidden"));
    }

    #[test]
    fn test_multi_line_class_members_and_implements() {
        let src = "/** A queue. */\nexport class Queue<T> extends Base<T> implements Sized, Iterable {\n  private items: T[] = [];\n  static create() {\n    if (x) {\n      return new Queue();\n    }\n  }\n  push = (item: T) => {\n    this.items.push(item);\n  };\n}\n";
        let out = scan_file("q.ts", src);
        let queue = find(&out, NodeType::Class, "Queue");
        assert_eq!(queue.documentation(), Some("A queue."));
        assert!(has_edge(&out, &queue.id, EdgeType::Extends, "class:Base"));
        assert!(has_edge(&out, &queue.id, EdgeType::Implements, "interface:Sized"));
        assert!(has_edge(&out, &queue.id, EdgeType::Implements, "interface:Iterable"));
        find(&out, NodeType::Variable, "items");
        let create = find(&out, NodeType::Method, "create");
        assert_eq!((create.start_line, create.end_line), (Some(4), Some(8)));
        assert_eq!(create.complexity(), 2.0);
        find(&out, NodeType::Method, "push");
        assert_eq!(create.qualified_name(), "Queue.create");
    }

    #[test]
    fn test_interface_members_and_extends() {
        let src = "interface Shape extends Named, Sized {\n  area(): number\n  name: string;\n}\ntype Id = string;\nenum Color { Red, Green }\n";
        let out = scan_file("s.ts", src);
        let shape = find(&out, NodeType::Interface, "Shape");
        assert!(has_edge(&out, &shape.id, EdgeType::Extends, "interface:Named"));
        assert!(has_edge(&out, &shape.id, EdgeType::Extends, "interface:Sized"));
        let area = find(&out, NodeType::Method, "area");
        assert_eq!(area.end_line, Some(2));
        find(&out, NodeType::Variable, "name");
        find(&out, NodeType::TypeAlias, "Id");
        find(&out, NodeType::Enum, "Color");
        assert!(out.errors.is_empty());
    }

    #[test]
    fn test_calls_are_linked_by_name() {
        let src = "function helper() {}\nfunction main() {\n  helper();\n  console.log('x');\n}\n";
        let out = scan_file("a.js", src);
        let helper = find(&out, NodeType::Function, "helper");
        let main = find(&out, NodeType::Function, "main");
        assert!(has_edge(&out, &main.id, EdgeType::Calls, &helper.id));
        assert_eq!(out.edges.iter().filter(|e| e.edge_type == EdgeType::Calls).count(), 1);
    }

    #[test]
    fn test_braces_in_strings_and_comments_do_not_count() {
        let src = "function a() {\n  const s = '}';\n  // }\n  return s;\n}\nfunction b() {}\n";
        let out = scan_file("a.js", src);
        assert_eq!(find(&out, NodeType::Function, "a").end_line, Some(5));
        find(&out, NodeType::Function, "b");
    }

    #[test]
    fn test_test_blocks_emit_tests_edges() {
        let src = "import { add } from './math';\nfunction add() {}\ndescribe('math', () => {\n  it('adds', () => {\n    add();\n  });\n});\n";
        let out = scan_file("math.test.js", src);
        let test = find(&out, NodeType::Test, "adds");
        let add = find(&out, NodeType::Function, "add");
        assert!(has_edge(&out, &test.id, EdgeType::Tests, &add.id));
        assert_eq!((test.start_line, test.end_line), (Some(4), Some(6)));
    }

    #[test]
    fn test_express_routes_reference_named_handlers() {
        let src = "function listUsers(req, res) {}\napp.get('/api/users', listUsers);\nrouter.post('/api/users/:id', (req, res) => {\n  res.send();\n});\n";
        let out = scan_file("routes.js", src);
        let list = find(&out, NodeType::ApiEndpoint, "GET /api/users");
        assert_eq!(list.metadata.get("route"), Some(&serde_json::json!("/api/users")));
        let handler = find(&out, NodeType::Function, "listUsers");
        assert!(has_edge(&out, &list.id, EdgeType::References, &handler.id));
        let post = find(&out, NodeType::ApiEndpoint, "POST /api/users/:id");
        assert_eq!(post.end_line, Some(5));
    }

    #[test]
    fn test_jsx_component_detection() {
        let src = "export function Button({ label }) {\n  return <button>{label}</button>;\n}\nfunction Helper() { return 1; }\n";
        let out = scan_file("Button.jsx", src);
        find(&out, NodeType::Component, "Button");
        find(&out, NodeType::Function, "Helper");
        let plain = scan_file("Button.js", "function Button() { return 1; }");
        find(&plain, NodeType::Function, "Button");
    }

    #[test]
    fn test_commonjs_exports() {
        let src = "function a() {}\nfunction b() {}\nmodule.exports = { a, b: b };\nexports.c = 1;\n";
        let out = scan_file("a.cjs", src);
        let names: Vec<&str> = out
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeType::Export)
            .map(|n| n.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unterminated_class_reports_error_and_keeps_going() {
        let out = scan_file("a.ts", "class Broken {\n  run() {\n");
        find(&out, NodeType::Class, "Broken");
        assert!(!out.errors.is_empty());
        assert_eq!(out.errors[0].line, Some(1));
    }
}
