use serde::{Deserialize, Serialize};
use std::{
    fs::{read_to_string, write},
    path::PathBuf,
};

use crate::{error::WormholeError, properties::Bounds};

/// Tunables for building, restoring and locating wormholes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WormholeConfig {
    /// Deepest directory level the subfolder search descends to.
    pub max_search_depth: usize,
    /// How many ancestor directories the ancestor search visits.
    pub max_ancestor_levels: usize,
    /// Label given to the node synthesized in the target map.
    pub default_target_label: String,
    /// Label given to both markers of a new wormhole.
    pub target_marker_label: String,
    /// Where the synthesized target node is placed.
    pub default_target_bounds: Bounds,
    /// Horizontal clearance left between a new target node and a sibling it was moved off.
    pub spread_gap: f32,
    /// Save every modified open map before building a wormhole.
    pub save_open_maps_first: bool,
}

impl Default for WormholeConfig {
    fn default() -> Self {
        WormholeConfig {
            max_search_depth: 16,
            max_ancestor_levels: 32,
            default_target_label: "New Node".to_string(),
            target_marker_label: "Wormhole".to_string(),
            default_target_bounds: Bounds::new(20.0, 20.0, 120.0, 40.0),
            spread_gap: 20.0,
            save_open_maps_first: true,
        }
    }
}

pub trait WormholeConfigProvider: Send + Sync {
    fn get_config(&self) -> Result<WormholeConfig, WormholeError>;
    fn set_config(&self, config: &WormholeConfig) -> Result<(), WormholeError>;
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TomlConfigProvider {
    path: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(path: PathBuf) -> Self {
        TomlConfigProvider { path }
    }
}

impl WormholeConfigProvider for TomlConfigProvider {
    fn get_config(&self) -> Result<WormholeConfig, WormholeError> {
        tracing::debug!("Attempting to read wormhole config from: {:?}", &self.path);
        if !self.path.exists() {
            tracing::debug!("Config file not found, using defaults.");
            return Ok(WormholeConfig::default());
        }
        let content = read_to_string(&self.path)?;
        Ok(toml::from_str(&content)?)
    }

    fn set_config(&self, config: &WormholeConfig) -> Result<(), WormholeError> {
        tracing::debug!("Attempting to write wormhole config to: {:?}", &self.path);
        let toml_string = toml::to_string(config)?;
        write(&self.path, toml_string)?;
        Ok(())
    }
}
