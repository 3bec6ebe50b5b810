//! Language detection and block conventions per source-language family.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Supported source-language families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Rust,
}

/// How a language marks where a block ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStyle {
    /// Balanced `{` / `}` pairs.
    Delimited,
    /// First following line at or below the declaring line's indentation.
    Indented,
}

impl Language {
    /// Detect language from file extension.
    pub fn from_path(path: &str) -> Option<Self> {
        let ext = Path::new(path).extension()?.to_str()?;
        match ext {
            "js" | "mjs" | "cjs" | "jsx" => Some(Language::JavaScript),
            "ts" | "mts" | "cts" | "tsx" => Some(Language::TypeScript),
            "py" | "pyw" => Some(Language::Python),
            "rs" => Some(Language::Rust),
            _ => None,
        }
    }

    pub fn block_style(&self) -> BlockStyle {
        match self {
            Language::Python => BlockStyle::Indented,
            _ => BlockStyle::Delimited,
        }
    }

    /// Get the display name.
    pub fn name(&self) -> &'static str {
        match self {
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Python => "Python",
            Language::Rust => "Rust",
        }
    }

    /// `//` and `/* */` comments.
    pub(crate) fn has_c_comments(&self) -> bool {
        !matches!(self, Language::Python)
    }

    /// Whether JSX markup can appear in files with this extension.
    pub fn allows_jsx(path: &str) -> bool {
        matches!(
            Path::new(path).extension().and_then(|e| e.to_str()),
            Some("jsx" | "tsx")
        )
    }
}
