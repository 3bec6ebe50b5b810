//! Block extent detection.
//!
//! [`block_end`] is the only place that decides where a declaration ends;
//! member parsing, function length and body extraction all go through it.

use super::language::BlockStyle;
use super::text::SourceText;

/// Where a block ends (0-indexed line) and whether it was properly closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockEnd {
    pub line: usize,
    pub terminated: bool,
}

/// Find the last line of the declaration starting at `start`.
///
/// `expect_body` tells the delimited strategy that the declaration normally
/// carries a `{ ... }` body (functions, classes), so a line break before the
/// opening brace does not end it.
pub fn block_end(text: &SourceText, start: usize, style: BlockStyle, expect_body: bool) -> BlockEnd {
    match style {
        BlockStyle::Delimited => delimited_end(&text.code, start, expect_body),
        BlockStyle::Indented => indented_end(text, start),
    }
}

fn delimited_end(code: &[String], start: usize, expect_body: bool) -> BlockEnd {
    let mut braces: i64 = 0;
    let mut parens: i64 = 0;
    let mut opened = false;

    for (i, line) in code.iter().enumerate().skip(start) {
        for ch in line.chars() {
            match ch {
                '{' => {
                    braces += 1;
                    opened = true;
                }
                '}' => {
                    braces -= 1;
                    if opened && braces <= 0 && parens <= 0 {
                        return BlockEnd { line: i, terminated: true };
                    }
                }
                '(' | '[' => parens += 1,
                ')' | ']' => {
                    parens -= 1;
                    // `call(() => { ... })` ends with its closing paren
                    if opened && !expect_body && braces <= 0 && parens <= 0 {
                        return BlockEnd { line: i, terminated: true };
                    }
                }
                ';' if braces <= 0 && parens <= 0 => {
                    return BlockEnd { line: i, terminated: true };
                }
                _ => {}
            }
        }
        if !opened && !expect_body && parens <= 0 && !continues_statement(line) {
            return BlockEnd { line: i, terminated: true };
        }
    }

    BlockEnd {
        line: code.len().saturating_sub(1),
        terminated: false,
    }
}

/// Whether a statement obviously continues on the next line.
fn continues_statement(line: &str) -> bool {
    let trimmed = line.trim_end();
    const CONTINUATIONS: [char; 12] = ['=', '(', ',', ':', '|', '&', '+', '-', '*', '?', '.', '>'];
    trimmed.is_empty() || trimmed.ends_with(&CONTINUATIONS[..])
}

fn indented_end(text: &SourceText, start: usize) -> BlockEnd {
    let base = text.indent(start);
    let mut depth: i64 = 0;
    let mut header_end = start;

    for i in start..text.len() {
        for ch in text.code[i].chars() {
            match ch {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth -= 1,
                _ => {}
            }
        }
        header_end = i;
        if depth <= 0 {
            break;
        }
    }
    if depth > 0 {
        return BlockEnd {
            line: text.len().saturating_sub(1),
            terminated: false,
        };
    }
    if !text.code[header_end].trim_end().ends_with(':') {
        return BlockEnd {
            line: header_end,
            terminated: true,
        };
    }

    let mut end = header_end;
    for i in header_end + 1..text.len() {
        if text.is_blank(i) {
            continue;
        }
        if text.indent(i) <= base {
            break;
        }
        end = i;
    }
    BlockEnd {
        line: end,
        terminated: true,
    }
}

/// Brace nesting depth at the start of every line.
pub fn line_depths(code: &[String], open: &[char], close: &[char]) -> Vec<usize> {
    let mut depths = Vec::with_capacity(code.len());
    let mut depth: usize = 0;
    for line in code {
        depths.push(depth);
        for ch in line.chars() {
            if open.contains(&ch) {
                depth += 1;
            } else if close.contains(&ch) {
                depth = depth.saturating_sub(1);
            }
        }
    }
    depths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::language::Language;

    fn end(src: &str, lang: Language, start: usize, expect_body: bool) -> BlockEnd {
        let text = SourceText::new(src, lang);
        block_end(&text, start, lang.block_style(), expect_body)
    }

    #[test]
    fn test_delimited_single_line() {
        let b = end("class Foo extends Bar { method() {} }", Language::TypeScript, 0, true);
        assert_eq!(b, BlockEnd { line: 0, terminated: true });
    }

    #[test]
    fn test_delimited_multi_line_params() {
        let src = "function f(\n  a,\n  b\n) {\n  return a;\n}\nconst x = 1;";
        assert_eq!(end(src, Language::JavaScript, 0, true).line, 5);
    }

    #[test]
    fn test_delimited_statement_ends_at_semicolon_or_line() {
        let src = "const a = 1;\nconst b = 2\nconst c = {\n  k: 1,\n};";
        assert_eq!(end(src, Language::JavaScript, 0, false).line, 0);
        assert_eq!(end(src, Language::JavaScript, 1, false).line, 1);
        assert_eq!(end(src, Language::JavaScript, 2, false).line, 4);
    }

    #[test]
    fn test_delimited_braces_inside_parens_do_not_end_block() {
        let src = "function Button({ label }) {\n  return label;\n}";
        assert_eq!(end(src, Language::JavaScript, 0, true).line, 2);
        let call = "it('x', () => {\n  run();\n});\nnext();";
        assert_eq!(end(call, Language::JavaScript, 0, false).line, 2);
    }

    #[test]
    fn test_delimited_ignores_braces_in_strings() {
        let src = "function f() {\n  const s = \"}\";\n  return s;\n}";
        assert_eq!(end(src, Language::JavaScript, 0, true).line, 3);
    }

    #[test]
    fn test_delimited_unterminated() {
        let src = "function f() {\n  if (x) {\n";
        let b = end(src, Language::JavaScript, 0, true);
        assert!(!b.terminated);
        assert_eq!(b.line, 1);
    }

    #[test]
    fn test_rust_where_clause_with_expect_body() {
        let src = "fn f<T>(x: T) -> T\nwhere\n    T: Clone,\n{\n    x\n}\n";
        assert_eq!(end(src, Language::Rust, 0, true).line, 5);
    }

    #[test]
    fn test_indented_block() {
        let src = "def f(a):\n    x = 1\n\n    return x\n\ndef g():\n    pass\n";
        assert_eq!(end(src, Language::Python, 0, true).line, 3);
        assert_eq!(end(src, Language::Python, 5, true).line, 6);
    }

    #[test]
    fn test_indented_multi_line_header_and_one_liner() {
        let src = "def f(\n    a,\n    b,\n):\n    return a\nx = 1\ndef g(): return 2\n";
        assert_eq!(end(src, Language::Python, 0, true).line, 4);
        assert_eq!(end(src, Language::Python, 5, true).line, 5);
        assert_eq!(end(src, Language::Python, 6, true).line, 6);
    }

    #[test]
    fn test_line_depths() {
        let code: Vec<String> = ["a {", "b {", "}", "}", "c"].iter().map(|s| s.to_string()).collect();
        assert_eq!(line_depths(&code, &['{'], &['}']), vec![0, 1, 2, 1, 0]);
    }
}
