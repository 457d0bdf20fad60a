//! Replay tool configuration.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// How decoded events are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One human-readable line per event.
    #[default]
    Text,
    /// One JSON object per event (JSONL).
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub format: OutputFormat,
    /// Print the assembled message and tool pairing after the event list.
    pub summary: bool,
    /// Make `check` fail when any frame decoded as unknown.
    pub strict_unknown: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            summary: false,
            strict_unknown: false,
        }
    }
}

impl ReplayConfig {
    /// Load from a TOML file; a missing file yields the defaults.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_yields_defaults() {
        let config = ReplayConfig::load_from("does/not/exist.toml").unwrap();
        assert_eq!(config.format, OutputFormat::Text);
        assert!(!config.summary);
        assert!(!config.strict_unknown);
    }

    #[test]
    fn partial_file_fills_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "format = \"json\"").unwrap();
        let config = ReplayConfig::load_from(file.path()).unwrap();
        assert_eq!(config.format, OutputFormat::Json);
        assert!(!config.summary);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "format = [not toml").unwrap();
        assert!(ReplayConfig::load_from(file.path()).is_err());
    }
}
