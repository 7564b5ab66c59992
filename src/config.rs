//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/leadsync.sqlite"
//!
//! [ingest]
//! chunk_size = 500
//!
//! [server]
//! bind = "127.0.0.1:7340"
//!
//! [mappings]
//! "LinkedIn UrL" = "Person Linkedin Url"
//! "Last Updated" = "Updated At"
//! ```
//!
//! `[mappings]` maps canonical labels to the headers your CSV exports use.
//! Labels left out fall back to a header with the same text, if present.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use leadsync_core::mapping::{all_labels, FieldMappings};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub mappings: FieldMappings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Rows handed to the reconciler per batch.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.ingest.chunk_size == 0 {
        bail!("ingest.chunk_size must be > 0");
    }

    if config.server.bind.trim().is_empty() {
        bail!("server.bind must not be empty");
    }

    validate_mappings(&config.mappings).context("invalid [mappings] table")?;

    Ok(config)
}

/// Load a standalone mapping file: a flat TOML table of label = header.
pub fn load_mappings(path: &Path) -> Result<FieldMappings> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read mapping file: {}", path.display()))?;
    let mappings: FieldMappings = toml::from_str(&content)
        .with_context(|| format!("Failed to parse mapping file: {}", path.display()))?;
    validate_mappings(&mappings)?;
    Ok(mappings)
}

/// Every key must be a canonical label; a typo would otherwise silently
/// leave a column unmapped.
pub fn validate_mappings(mappings: &FieldMappings) -> Result<()> {
    let known: Vec<&str> = all_labels().collect();
    for (label, _) in mappings.iter() {
        if !known.contains(&label) {
            bail!("unknown mapping label: '{}'", label);
        }
    }
    Ok(())
}
