//! Collects source files from a directory tree.
//!
//! Respects .gitignore and hidden-file rules, keeps only files a scanner
//! understands, and reads them as repository-relative `SourceFile`s.

use ignore::WalkBuilder;
use std::fs;
use std::path::Path;
use tracing::debug;

use super::SourceFile;
use crate::scanner::Language;

/// Every supported source file under `root`, sorted by path.
///
/// Paths are relative to `root` with `/` separators. Files that are not
/// valid UTF-8 are skipped.
pub fn collect_sources(root: &Path) -> Vec<SourceFile> {
    let mut files: Vec<SourceFile> = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .build()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(root).ok()?;
            let path = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            Language::from_path(&path)?;
            match fs::read_to_string(entry.path()) {
                Ok(content) => Some(SourceFile { path, content }),
                Err(e) => {
                    debug!(file = %path, error = %e, "skipping unreadable file");
                    None
                }
            }
        })
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    files
}
