use serde::{Deserialize, Serialize};

/// Default size above which the streaming strategy is used, in megabytes
pub const DEFAULT_SIZE_CUTOFF_MB: f64 = 500.0;

/// Settings of a vasprun.xml extraction
///
/// Deserializable so the same settings can come from a TOML table:
///
/// ```toml
/// [vasprun]
/// size_cutoff_mb = 250.0
/// k_before_band = true
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Stream even when the document is small enough to load
    pub force_streaming: bool,
    /// Documents at or above this size are streamed
    pub size_cutoff_mb: f64,
    /// Keep every ionic step, otherwise only the first and the last
    pub extract_all: bool,
    /// Index band arrays k-point first (`[K, B]`) instead of band first
    pub k_before_band: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            force_streaming: false,
            size_cutoff_mb: DEFAULT_SIZE_CUTOFF_MB,
            extract_all: true,
            k_before_band: false,
        }
    }
}

impl ParserOptions {
    pub fn with_force_streaming(mut self, force_streaming: bool) -> Self {
        self.force_streaming = force_streaming;
        self
    }

    pub fn with_size_cutoff_mb(mut self, size_cutoff_mb: f64) -> Self {
        self.size_cutoff_mb = size_cutoff_mb;
        self
    }

    pub fn with_extract_all(mut self, extract_all: bool) -> Self {
        self.extract_all = extract_all;
        self
    }

    pub fn with_k_before_band(mut self, k_before_band: bool) -> Self {
        self.k_before_band = k_before_band;
        self
    }
}

/// How a document was read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Loaded into a tree and queried per quantity
    WholeDocument,
    /// Single forward pass with bounded memory
    Streaming,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Strategy::WholeDocument => "whole-document",
            Strategy::Streaming => "streaming",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ParserOptions::default();
        assert!(!options.force_streaming);
        assert_eq!(options.size_cutoff_mb, 500.0);
        assert!(options.extract_all);
        assert!(!options.k_before_band);
    }

    #[test]
    fn test_partial_table() {
        let options: ParserOptions = toml::from_str("k_before_band = true").unwrap();
        assert!(options.k_before_band);
        assert_eq!(options.size_cutoff_mb, DEFAULT_SIZE_CUTOFF_MB);
    }
}
