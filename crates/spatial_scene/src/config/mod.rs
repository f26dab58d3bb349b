//! Configuration system
//!
//! Graph construction is driven by [`GraphConfig`], which can be loaded
//! from TOML or RON through the [`Config`] trait.

use std::path::Path;

pub use serde::{Deserialize, Serialize};

use crate::bounds::Plane;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file; the extension selects the format
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = Format::of(path)?;
        let contents = std::fs::read_to_string(path)?;

        match format {
            Format::Toml => toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
            Format::Ron => ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Save configuration to file; the extension selects the format
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = match Format::of(path)? {
            Format::Toml => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?,
            Format::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?,
        };

        std::fs::write(path, contents)?;
        Ok(())
    }
}

enum Format {
    Toml,
    Ron,
}

impl Format {
    fn of(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Which graph variant to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GraphKind {
    /// Hierarchy without spatial pruning
    #[default]
    Flat,
    /// Square partition on one cardinal plane
    Quadtree {
        /// Plane the squares live on
        plane: Plane,
    },
    /// Cube partition
    Octree,
}

/// What happens to a subdivided node once removals leave it under capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollapsePolicy {
    /// Pull entities up until the node is back at capacity; children are
    /// discarded only once nothing is left in them
    #[default]
    Migrate,
    /// Pull a single entity up, then discard the children and whatever
    /// they still hold
    Discard,
}

/// Configuration for bounded partition behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Maximum entities per node before subdivision
    pub max_entities_per_node: usize,

    /// Maximum subdivision depth
    pub max_depth: u32,

    /// Collapse behavior after removals
    pub collapse: CollapsePolicy,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            max_entities_per_node: 8,
            max_depth: 8,
            collapse: CollapsePolicy::Migrate,
        }
    }
}

/// Scene graph configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Half-edge length of the root square or cube (ignored by the flat graph)
    pub half_edge: f32,

    /// Graph variant
    pub kind: GraphKind,

    /// Partition behavior (ignored by the flat graph)
    pub partition: PartitionConfig,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            half_edge: 1024.0,
            kind: GraphKind::Flat,
            partition: PartitionConfig::default(),
        }
    }
}

impl Config for GraphConfig {}
