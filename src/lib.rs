//! Mind-Map Migrator
//!
//! A migration engine that converts free-form mind-map graphs into strict
//! trees, with:
//! - Deterministic graph → tree conversion (petgraph) with full edge-loss
//!   accounting (cycles, multi-parents, self-loops, duplicates)
//! - A per-map migration status state machine with two-phase persistence
//!   and rollback, so no map is ever left mid-transition
//! - A batch orchestrator with dry-run mode, pagination, forced re-runs,
//!   and size gating for oversized maps

pub mod migration;
pub mod store;

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

use migration::{MigrationOptions, DEFAULT_MAX_TREE_BYTES};

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub migration: MigrationYamlConfig,
}

/// Migration configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationYamlConfig {
    pub max_size_bytes: usize,
    pub batch_size: usize,
    pub max_warnings: usize,
    pub skip_large_maps: bool,
}

impl Default for MigrationYamlConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: DEFAULT_MAX_TREE_BYTES,
            batch_size: 10,
            max_warnings: 20,
            skip_large_maps: true,
        }
    }
}

// ============================================================================
// Runtime config (what the engine actually uses)
// ============================================================================

/// Engine configuration
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Serialized-tree size gate in bytes
    pub max_size_bytes: usize,
    /// Default number of maps per batch
    pub batch_size: usize,
    /// Per-map warning cap
    pub max_warnings: usize,
    /// Skip maps whose serialized tree exceeds the size gate
    pub skip_large_maps: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        let yaml = MigrationYamlConfig::default();
        Self {
            max_size_bytes: yaml.max_size_bytes,
            batch_size: yaml.batch_size,
            max_warnings: yaml.max_warnings,
            skip_large_maps: yaml.skip_large_maps,
        }
    }
}

impl MigrationConfig {
    /// Load configuration from environment variables only.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        Ok(Self {
            max_size_bytes: std::env::var("MIGRATION_MAX_SIZE_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.migration.max_size_bytes),
            batch_size: std::env::var("MIGRATION_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.migration.batch_size),
            max_warnings: std::env::var("MIGRATION_MAX_WARNINGS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(yaml.migration.max_warnings),
            skip_large_maps: yaml.migration.skip_large_maps,
        })
    }

    /// Build batch options seeded from this configuration. Callers flip
    /// `dry_run` off (and set `force`/`limit`) per request.
    pub fn default_options(&self) -> MigrationOptions {
        MigrationOptions {
            batch_size: self.batch_size,
            skip_large_maps: self.skip_large_maps,
            ..MigrationOptions::default()
        }
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
