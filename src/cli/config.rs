//! TOML configuration file support.
//!
//! Parser options and stream triggers can be kept in a config file instead
//! of being passed as flags:
//!
//! ```toml
//! # vaspio.toml
//! [vasprun]
//! size_cutoff_mb = 250.0
//! extract_all = false
//!
//! [stream]
//! history = true
//!
//! [stream.triggers.ibzkpt]
//! kind = "WARNING"
//! regex = "internal error in subroutine IBZKPT"
//! message = "Error with the k-points."
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use vaspio::stream::StreamConfig;
use vaspio::vasprun::ParserOptions;

/// Root configuration structure for vaspio.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// vasprun.xml extraction settings.
    #[serde(default)]
    pub vasprun: ParserOptions,

    /// Stream scanner settings and trigger overrides.
    #[serde(default)]
    pub stream: StreamConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaspio::stream::StreamKind;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [vasprun]
            force_streaming = true
            size_cutoff_mb = 250.0
            k_before_band = true

            [stream]
            history = true

            [stream.triggers.ibzkpt]
            kind = "WARNING"
            regex = "internal error"
            message = "some error"
            recover = true
        "#;

        let config = Config::from_str(toml).unwrap();
        assert!(config.vasprun.force_streaming);
        assert_eq!(config.vasprun.size_cutoff_mb, 250.0);
        assert!(config.vasprun.k_before_band);
        assert!(config.vasprun.extract_all);
        assert!(config.stream.history);

        let ibzkpt = &config.stream.triggers["ibzkpt"];
        assert_eq!(ibzkpt.kind, StreamKind::Warning);
        assert!(ibzkpt.recover);
        assert!(!ibzkpt.inverse);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.vasprun, ParserOptions::default());
        assert!(!config.stream.history);
        assert!(config.stream.triggers.is_empty());
    }

    #[test]
    fn test_invalid_config() {
        let result = Config::from_str("[vasprun]\nsize_cutoff_mb = \"large\"");
        assert!(result.is_err());
    }
}
