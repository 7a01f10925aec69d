use std::{
    fs::{read_to_string, write},
    path::Path,
};

use crate::{error::WormholeError, map::document::MapDocument};

/// Document persistence collaborator.
///
/// `load` returns a document whose file identity is `path` and whose modified flag is clear.
/// `save` writes the persisted fields only; bookkeeping of the file identity and modified flag is
/// the caller's job.
pub trait MapStore {
    fn load(&self, path: &Path) -> Result<MapDocument, WormholeError>;
    fn save(&self, map: &MapDocument, path: &Path) -> Result<(), WormholeError>;
}

/// Stores each map as one pretty-printed TOML file.
#[derive(Debug, Default, Clone)]
pub struct TomlMapStore {
    read_only: bool,
}

impl TomlMapStore {
    pub fn new() -> Self {
        TomlMapStore { read_only: false }
    }

    /// A store that loads normally but never writes. Used for dry runs.
    pub fn read_only() -> Self {
        TomlMapStore { read_only: true }
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl MapStore for TomlMapStore {
    fn load(&self, path: &Path) -> Result<MapDocument, WormholeError> {
        tracing::debug!("Loading map from: {:?}", path);
        let content = read_to_string(path)?;
        let mut map: MapDocument = toml::from_str(&content)?;
        map.set_file(Some(path.to_path_buf()));
        map.mark_saved();
        Ok(map)
    }

    fn save(&self, map: &MapDocument, path: &Path) -> Result<(), WormholeError> {
        if self.read_only {
            tracing::info!("[read-only] would write map '{}' to {:?}", map.label, path);
            return Ok(());
        }
        tracing::debug!("Writing map '{}' to: {:?}", map.label, path);
        let toml_string = toml::to_string_pretty(map)?;
        write(path, toml_string)?;
        Ok(())
    }
}
