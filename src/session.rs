//! The set of open maps and the wormholes that connect them.
//!
//! A [`MapSession`] owns the injected collaborators ([`MapStore`], [`WormholeHost`]), every map
//! the user has open, and every live [`Wormhole`]. Listener registrations live on the maps but
//! are never persisted: they are rebuilt by [`MapSession::open_map`] each time a map is loaded.

use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    sync::mpsc::Sender,
};

use crate::{
    config::WormholeConfig,
    error::WormholeError,
    event::Event,
    host::WormholeHost,
    map::{same_map, MapHandle, MapStore},
    paths::{MapProbe, SearchLimits, StoreProbe},
    properties::{NodeId, WormholeId},
    wormhole::{sync::is_map_file_changed, SyncReport, Wormhole},
};

/// What happened to one marker when its map was opened.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreOutcome {
    pub marker: NodeId,
    pub result: Result<WormholeId, WormholeError>,
}

pub struct MapSession {
    store: Box<dyn MapStore>,
    host: Box<dyn WormholeHost>,
    config: WormholeConfig,
    maps: Vec<MapHandle>,
    wormholes: Vec<Wormhole>,
    tx: Option<Sender<Event>>,
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (std::path::absolute(a), std::path::absolute(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

impl MapSession {
    pub fn new(
        store: Box<dyn MapStore>,
        host: Box<dyn WormholeHost>,
        config: WormholeConfig,
    ) -> Self {
        MapSession {
            store,
            host,
            config,
            maps: Vec::new(),
            wormholes: Vec::new(),
            tx: None,
        }
    }

    pub fn with_events(mut self, tx: Sender<Event>) -> Self {
        self.tx = Some(tx);
        self
    }

    pub fn config(&self) -> &WormholeConfig {
        &self.config
    }

    pub fn limits(&self) -> SearchLimits {
        SearchLimits::from(&self.config)
    }

    pub fn host(&self) -> &dyn WormholeHost {
        self.host.as_ref()
    }

    pub fn store(&self) -> &dyn MapStore {
        self.store.as_ref()
    }

    pub fn open_maps(&self) -> &[MapHandle] {
        &self.maps
    }

    pub fn wormholes(&self) -> &[Wormhole] {
        &self.wormholes
    }

    pub fn wormhole(&self, id: &WormholeId) -> Option<&Wormhole> {
        self.wormholes.iter().find(|w| &w.id() == id)
    }

    pub(crate) fn emit(&self, event: Event) {
        if let Some(tx) = self.tx.as_ref() {
            if let Err(e) = tx.send(event).map_err(WormholeError::from) {
                tracing::warn!("[MapSession] {}", e);
            }
        }
    }

    /// Track `map` as open. Returns the handle the session will use from now on, which is the
    /// already-open handle when the same file is open under another handle.
    pub fn adopt(&mut self, map: MapHandle) -> MapHandle {
        if let Some(open) = self.maps.iter().find(|m| same_map(m, &map)) {
            return open.clone();
        }
        let file = map.read().file().map(Path::to_path_buf);
        if let Some(file) = file {
            if let Some(open) = self.find_open_map(&file) {
                tracing::debug!("[MapSession] {:?} is already open", file);
                return open;
            }
        }
        self.maps.push(map.clone());
        map
    }

    pub fn find_open_map(&self, path: &Path) -> Option<MapHandle> {
        self.maps
            .iter()
            .find(|m| m.read().file().map(|f| same_file(f, path)).unwrap_or(false))
            .cloned()
    }

    /// Load the map at `path` (or return it if already open) without restoring its wormholes.
    pub fn load_map(&mut self, path: &Path) -> Result<MapHandle, WormholeError> {
        let path = std::path::absolute(path)?;
        if let Some(open) = self.find_open_map(&path) {
            return Ok(open);
        }
        let map = self.store.load(&path)?.into_handle();
        tracing::info!("[MapSession] opened {:?}", path);
        Ok(self.adopt(map))
    }

    /// Load the map at `path` and restore every wormhole marker in it that no live wormhole owns.
    pub fn open_map(&mut self, path: &Path) -> Result<MapHandle, WormholeError> {
        let map = self.load_map(path)?;
        for outcome in self.restore_markers(&map) {
            if let Err(e) = outcome.result {
                if e.is_broken_link() {
                    tracing::warn!("[MapSession] broken wormhole at marker {}: {}", outcome.marker, e);
                } else {
                    tracing::info!("[MapSession] marker {} not restored: {}", outcome.marker, e);
                }
            }
        }
        Ok(map)
    }

    /// Drop a map and every wormhole touching it.
    pub fn close_map(&mut self, map: &MapHandle) {
        let (closing, keep): (Vec<Wormhole>, Vec<Wormhole>) = std::mem::take(&mut self.wormholes)
            .into_iter()
            .partition(|w| w.is_attached_to(map));
        for wormhole in closing.iter() {
            wormhole.detach_listeners();
        }
        self.wormholes = keep;
        self.maps.retain(|m| !same_map(m, map));
    }

    fn is_owned(&self, map: &MapHandle, marker: &NodeId) -> bool {
        self.wormholes.iter().any(|w| w.owns_marker(map, marker))
    }

    pub fn restore_markers(&mut self, map: &MapHandle) -> Vec<RestoreOutcome> {
        let markers = map.read().wormhole_markers();
        let mut outcomes = Vec::new();
        for (_, marker) in markers {
            if self.is_owned(map, &marker) {
                continue;
            }
            let wormhole = Wormhole::restore(self, map, &marker);
            outcomes.push(RestoreOutcome {
                marker,
                result: self.register(wormhole),
            });
        }
        outcomes
    }

    /// Keep a successfully built or restored wormhole, report a cancelled one.
    fn register(&mut self, wormhole: Wormhole) -> Result<WormholeId, WormholeError> {
        if let Some(reason) = wormhole.failure().cloned() {
            self.emit(Event::WormholeCancelled {
                reason: reason.clone(),
            });
            return Err(reason);
        }
        let id = wormhole.id();
        self.wormholes.push(wormhole);
        Ok(id)
    }

    /// Build a new wormhole from `source_node` in `source_map` to a map chosen by the host.
    pub fn create_wormhole(
        &mut self,
        source_map: &MapHandle,
        source_node: &NodeId,
    ) -> Result<WormholeId, WormholeError> {
        let wormhole = Wormhole::build(self, source_map, source_node);
        self.register(wormhole)
    }

    /// Move a marker onto `new_host` and rebuild its wormhole around the new host.
    pub fn reparent_marker(
        &mut self,
        map: &MapHandle,
        marker: &NodeId,
        new_host: &NodeId,
    ) -> Result<WormholeId, WormholeError> {
        let previous = map.write().reparent_marker(marker, new_host)?;
        let (stale, keep): (Vec<Wormhole>, Vec<Wormhole>) = std::mem::take(&mut self.wormholes)
            .into_iter()
            .partition(|w| w.owns_marker(map, marker));
        for wormhole in stale.iter() {
            wormhole.detach_listeners();
        }
        self.wormholes = keep;
        let wormhole = Wormhole::restore_reparented(self, map, marker, previous.as_str(), new_host);
        self.register(wormhole)
    }

    /// Resynchronize one live wormhole on demand.
    pub fn resync(&mut self, id: &WormholeId) -> Result<SyncReport, WormholeError> {
        let idx = self
            .wormholes
            .iter()
            .position(|w| &w.id() == id)
            .ok_or_else(|| WormholeError::NotFound(format!("wormhole {id}")))?;
        let mut wormhole = self.wormholes.remove(idx);
        let result = wormhole.resync(self);
        self.wormholes.insert(idx.min(self.wormholes.len()), wormhole);
        result
    }

    /// Write `map` to its current file.
    pub fn save_map(&self, map: &MapHandle) -> Result<PathBuf, WormholeError> {
        let path = map
            .read()
            .file()
            .map(Path::to_path_buf)
            .ok_or_else(|| WormholeError::Precondition("map has no file".to_string()))?;
        self.store.save(&map.read(), &path)?;
        map.write().mark_saved();
        self.emit(Event::MapSaved(path.clone()));
        Ok(path)
    }

    /// Save `map`, asking the host for a file first when it has none.
    pub fn force_save(&mut self, map: &MapHandle) -> Result<PathBuf, WormholeError> {
        let existing = map.read().file().map(Path::to_path_buf);
        if existing.is_some() {
            return self.save_map(map);
        }
        let chosen = {
            let doc = map.read();
            self.host
                .choose_save_path(&doc)
                .ok_or_else(|| WormholeError::SaveRefused(doc.display_name()))?
        };
        let chosen = std::path::absolute(&chosen)?;
        self.store.save(&map.read(), &chosen)?;
        let previous = map.write().set_file(Some(chosen.clone()));
        map.write().mark_saved();
        self.emit(Event::MapSaved(chosen.clone()));
        self.notify_file_changed(map, previous)?;
        Ok(chosen)
    }

    /// Save every open map that has a file and unsaved changes.
    pub fn save_all_open_modified(&mut self) -> Result<usize, WormholeError> {
        let dirty: Vec<MapHandle> = self
            .maps
            .iter()
            .filter(|m| {
                let doc = m.read();
                doc.is_modified() && doc.file().is_some()
            })
            .cloned()
            .collect();
        for map in dirty.iter() {
            self.save_map(map)?;
        }
        Ok(dirty.len())
    }

    /// Record a new file identity for `map` (save-as, rename done elsewhere) and resynchronize
    /// its wormholes. Returns how many wormholes rewrote a pointer.
    pub fn set_map_file(
        &mut self,
        map: &MapHandle,
        file: Option<PathBuf>,
    ) -> Result<usize, WormholeError> {
        let file = file.map(std::path::absolute).transpose()?;
        let previous = map.write().set_file(file);
        self.notify_file_changed(map, previous)
    }

    /// Rename the map's file on disk, then proceed as [`MapSession::set_map_file`].
    pub fn move_map_file(&mut self, map: &MapHandle, to: &Path) -> Result<usize, WormholeError> {
        let from = map
            .read()
            .file()
            .map(Path::to_path_buf)
            .ok_or_else(|| WormholeError::Precondition("cannot move a map with no file".to_string()))?;
        if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(&from, to)?;
        tracing::info!("[MapSession] moved {:?} -> {:?}", from, to);
        self.set_map_file(map, Some(to.to_path_buf()))
    }

    /// Dispatch a file identity change of `map` to the wormholes listening on it.
    fn notify_file_changed(
        &mut self,
        map: &MapHandle,
        previous: Option<PathBuf>,
    ) -> Result<usize, WormholeError> {
        let current = map.read().file().map(Path::to_path_buf);
        self.emit(Event::MapFileChanged {
            from: previous.clone(),
            to: current.clone(),
        });
        if map.read().is_constructing() {
            tracing::debug!("[MapSession] {:?} is under construction, not resyncing", current);
            return Ok(0);
        }
        if !is_map_file_changed(previous.as_deref(), current.as_deref()) {
            return Ok(0);
        }

        let mut wormholes = std::mem::take(&mut self.wormholes);
        let mut resynced = 0;
        let mut first_error = None;
        for wormhole in wormholes.iter_mut() {
            let listening = map.read().has_listener(&wormhole.id());
            if !listening || !wormhole.is_map_file_changed() {
                continue;
            }
            match wormhole.resync(self) {
                Ok(report) if report.changed() => resynced += 1,
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("[MapSession] resync of wormhole {} failed: {}", wormhole.id(), e);
                    first_error.get_or_insert(e);
                }
            }
        }
        wormholes.append(&mut self.wormholes);
        self.wormholes = wormholes;

        match first_error {
            Some(e) => Err(e),
            None => Ok(resynced),
        }
    }
}

impl MapProbe for MapSession {
    fn probe(&self, path: &Path, node: &NodeId) -> Option<MapHandle> {
        if let Some(open) = self.find_open_map(path) {
            return open.read().contains_node(node).then(|| open.clone());
        }
        let map = StoreProbe::new(self.store.as_ref()).probe(path, node)?;
        if let Ok(absolute) = std::path::absolute(path) {
            map.write().set_file(Some(absolute));
        }
        Some(map)
    }
}
