//! Source text preparation shared by all scanners.
//!
//! Structural matching runs on a "code view" of the file in which comment
//! text and string literal contents are replaced by spaces. Quote
//! characters and newlines are kept, so the code view has the same lines
//! (and the same indentation) as the raw text.

use super::language::Language;

/// Raw lines plus the blanked code view of one file.
pub struct SourceText<'a> {
    pub raw: Vec<&'a str>,
    pub code: Vec<String>,
}

impl<'a> SourceText<'a> {
    pub fn new(content: &'a str, language: Language) -> Self {
        let blanked = blank_non_code(content, language);
        let raw: Vec<&str> = content.lines().collect();
        let mut code: Vec<String> = blanked.lines().map(str::to_string).collect();
        code.resize(raw.len(), String::new());
        Self { raw, code }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    pub fn is_blank(&self, idx: usize) -> bool {
        self.code.get(idx).map_or(true, |l| l.trim().is_empty())
    }

    /// Leading whitespace width of a code line (tabs count as 4).
    pub fn indent(&self, idx: usize) -> usize {
        self.code.get(idx).map_or(0, |line| {
            line.chars()
                .take_while(|c| c.is_whitespace())
                .map(|c| if c == '\t' { 4 } else { 1 })
                .sum()
        })
    }

    /// Code view of lines `start..=end`, newline-joined.
    pub fn code_between(&self, start: usize, end: usize) -> String {
        let end = end.min(self.code.len().saturating_sub(1));
        if start > end || self.code.is_empty() {
            return String::new();
        }
        self.code[start..=end].join("\n")
    }

    /// Raw lines `start..=end` joined with a single space.
    pub fn raw_joined(&self, start: usize, end: usize) -> String {
        let end = end.min(self.raw.len().saturating_sub(1));
        if start > end || self.raw.is_empty() {
            return String::new();
        }
        self.raw[start..=end]
            .iter()
            .map(|l| l.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// First line at or after `start` whose code view contains `needle`,
    /// looking at most `limit` lines ahead.
    pub fn find_forward(&self, start: usize, needle: char, limit: usize) -> Option<usize> {
        (start..self.code.len().min(start + limit)).find(|&i| self.code[i].contains(needle))
    }

    /// Documentation comment directly above `idx` (`/** */` blocks or `///`
    /// lines), skipping decorator and attribute lines.
    pub fn doc_comment_above(&self, idx: usize) -> Option<String> {
        let mut i = idx;
        while i > 0 {
            let prev = self.raw[i - 1].trim();
            if prev.starts_with('@') || prev.starts_with("#[") {
                i -= 1;
            } else {
                break;
            }
        }
        if i == 0 {
            return None;
        }

        let prev = self.raw[i - 1].trim();
        if prev.starts_with("///") || prev.starts_with("//!") {
            let mut lines = Vec::new();
            let mut j = i;
            while j > 0 && self.raw[j - 1].trim().starts_with("///") {
                lines.push(self.raw[j - 1].trim().trim_start_matches('/').trim());
                j -= 1;
            }
            lines.reverse();
            return non_empty(lines.join(" "));
        }

        if prev.ends_with("*/") {
            let mut lines = Vec::new();
            let mut j = i;
            while j > 0 {
                let line = self.raw[j - 1].trim();
                lines.push(line);
                j -= 1;
                if line.starts_with("/*") {
                    break;
                }
            }
            if !lines.last().is_some_and(|l| l.starts_with("/**")) {
                return None;
            }
            lines.reverse();
            let text = lines
                .iter()
                .map(|l| {
                    l.trim_start_matches("/**")
                        .trim_end_matches("*/")
                        .trim_start_matches('*')
                        .trim()
                })
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            return non_empty(text);
        }
        None
    }

    /// Python docstring opening on the first non-blank line after `header_end`.
    pub fn docstring_below(&self, header_end: usize) -> Option<String> {
        let start = (header_end + 1..self.raw.len()).find(|&i| !self.raw[i].trim().is_empty())?;
        let first = self.raw[start].trim();
        let body = first.trim_start_matches(|c: char| matches!(c, 'r' | 'u' | 'R' | 'U'));
        let quote = if body.starts_with("\"\"\"") {
            "\"\"\""
        } else if body.starts_with("'''") {
            "'''"
        } else {
            return None;
        };
        let after = &body[quote.len()..];
        if let Some(close) = after.find(quote) {
            return non_empty(after[..close].trim().to_string());
        }
        let mut parts = vec![after.trim()];
        for line in &self.raw[start + 1..] {
            let line = line.trim();
            if let Some(close) = line.find(quote) {
                parts.push(line[..close].trim());
                break;
            }
            parts.push(line);
        }
        let text = parts
            .into_iter()
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        non_empty(text)
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Replace comment text and string literal contents with spaces.
pub fn blank_non_code(content: &str, language: Language) -> String {
    let chars: Vec<char> = content.chars().collect();
    let n = chars.len();
    let mut out = String::with_capacity(content.len());
    let blank = |c: char| if c == '\n' { '\n' } else { ' ' };
    let c_comments = language.has_c_comments();
    let mut i = 0;

    while i < n {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        if c_comments && c == '/' && next == Some('/') {
            while i < n && chars[i] != '\n' {
                out.push(' ');
                i += 1;
            }
            continue;
        }
        if c_comments && c == '/' && next == Some('*') {
            out.push_str("  ");
            i += 2;
            while i < n && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                out.push(blank(chars[i]));
                i += 1;
            }
            if i < n {
                out.push_str("  ");
                i += 2;
            }
            continue;
        }
        if language == Language::Python && c == '#' {
            while i < n && chars[i] != '\n' {
                out.push(' ');
                i += 1;
            }
            continue;
        }
        if language == Language::Python
            && (c == '"' || c == '\'')
            && next == Some(c)
            && chars.get(i + 2) == Some(&c)
        {
            out.extend([c, c, c]);
            i += 3;
            while i < n && !(chars[i] == c && chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c)) {
                if chars[i] == '\\' && i + 1 < n {
                    out.push(' ');
                    out.push(blank(chars[i + 1]));
                    i += 2;
                    continue;
                }
                out.push(blank(chars[i]));
                i += 1;
            }
            if i < n {
                out.extend([c, c, c]);
                i += 3;
            }
            continue;
        }
        if language == Language::Rust && c == 'r' && starts_raw_string(&chars, i) {
            let mut hashes = 0;
            let mut j = i + 1;
            while chars.get(j) == Some(&'#') {
                hashes += 1;
                j += 1;
            }
            // chars[j] is the opening quote
            out.push('r');
            out.extend(std::iter::repeat('#').take(hashes));
            out.push('"');
            i = j + 1;
            while i < n && !closes_raw_string(&chars, i, hashes) {
                out.push(blank(chars[i]));
                i += 1;
            }
            if i < n {
                out.push('"');
                out.extend(std::iter::repeat('#').take(hashes));
                i += 1 + hashes;
            }
            continue;
        }
        if language == Language::Rust && c == '\'' {
            match char_literal_len(&chars, i) {
                Some(len) => {
                    out.push('\'');
                    out.extend(std::iter::repeat(' ').take(len - 2));
                    out.push('\'');
                    i += len;
                }
                // lifetime or label
                None => {
                    out.push(c);
                    i += 1;
                }
            }
            continue;
        }
        let is_quote = c == '"' || c == '\'' || (c == '`' && language != Language::Python);
        if is_quote && !(language == Language::Rust && c == '`') {
            out.push(c);
            i += 1;
            while i < n && chars[i] != c {
                if chars[i] == '\\' && i + 1 < n {
                    out.push(' ');
                    out.push(blank(chars[i + 1]));
                    i += 2;
                    continue;
                }
                if chars[i] == '\n' && c != '`' && language != Language::Rust {
                    break;
                }
                out.push(blank(chars[i]));
                i += 1;
            }
            if i < n && chars[i] == c {
                out.push(c);
                i += 1;
            }
            continue;
        }

        out.push(c);
        i += 1;
    }
    out
}

fn starts_raw_string(chars: &[char], i: usize) -> bool {
    if i > 0 && (chars[i - 1].is_alphanumeric() || chars[i - 1] == '_') {
        return false;
    }
    let mut j = i + 1;
    while chars.get(j) == Some(&'#') {
        j += 1;
    }
    chars.get(j) == Some(&'"')
}

fn closes_raw_string(chars: &[char], i: usize, hashes: usize) -> bool {
    chars[i] == '"' && (1..=hashes).all(|k| chars.get(i + k) == Some(&'#'))
}

/// Length of a Rust char literal starting at `i`, or `None` for a lifetime.
fn char_literal_len(chars: &[char], i: usize) -> Option<usize> {
    match chars.get(i + 1) {
        Some('\\') => (i + 2..chars.len().min(i + 12))
            .find(|&j| chars[j] == '\'')
            .map(|j| j - i + 1),
        Some(_) if chars.get(i + 2) == Some(&'\'') => Some(3),
        _ => None,
    }
}
