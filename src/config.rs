//! Engine configuration, read from `.kgraph/config.toml`.
//!
//! Every field has a default, so an empty or partial file is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::error::Result;

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub indexer: IndexerConfig,

    #[serde(default)]
    pub query: QueryConfig,
}

/// Indexing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Scan files on the rayon pool; merge order stays the input order.
    #[serde(default)]
    pub parallel_scan: bool,

    /// Larger files are skipped with a recoverable error.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

/// Query defaults used when a caller does not pass its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_impact_depth")]
    pub impact_depth: usize,

    #[serde(default = "default_subgraph_depth")]
    pub subgraph_depth: usize,

    #[serde(default = "default_hotspot_limit")]
    pub hotspot_limit: usize,

    #[serde(default = "default_search_threshold")]
    pub search_threshold: f64,

    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
}

fn default_max_file_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_impact_depth() -> usize {
    3
}

fn default_subgraph_depth() -> usize {
    2
}

fn default_hotspot_limit() -> usize {
    20
}

fn default_search_threshold() -> f64 {
    0.5
}

fn default_search_limit() -> usize {
    20
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            parallel_scan: false,
            max_file_bytes: default_max_file_bytes(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            impact_depth: default_impact_depth(),
            subgraph_depth: default_subgraph_depth(),
            hotspot_limit: default_hotspot_limit(),
            search_threshold: default_search_threshold(),
            search_limit: default_search_limit(),
        }
    }
}

impl EngineConfig {
    /// Load from `path`, falling back to defaults when the file is missing
    /// or invalid.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        match Self::from_toml_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(!config.indexer.parallel_scan);
        assert_eq!(config.query.impact_depth, 3);
        assert_eq!(config.query.subgraph_depth, 2);
        assert_eq!(config.query.hotspot_limit, 20);
        assert_eq!(config.query.search_threshold, 0.5);
        assert_eq!(config.query.search_limit, 20);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = EngineConfig::from_toml_str("[query]\nimpact_depth = 5\n").unwrap();
        assert_eq!(config.query.impact_depth, 5);
        assert_eq!(config.query.subgraph_depth, 2);
        assert_eq!(config.indexer, IndexerConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(EngineConfig::from_toml_str("[query\nimpact_depth = ").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[indexer]\nparallel_scan = true\nmax_file_bytes = 100").unwrap();
        let config = EngineConfig::load(file.path());
        assert!(config.indexer.parallel_scan);
        assert_eq!(config.indexer.max_file_bytes, 100);
    }

    #[test]
    fn test_load_missing_or_invalid_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(EngineConfig::load(&dir.path().join("none.toml")), EngineConfig::default());

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "not = [valid").unwrap();
        assert_eq!(EngineConfig::load(&bad), EngineConfig::default());
    }
}
