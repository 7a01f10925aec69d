//! The UI side of the engine.
//!
//! Everything that would open a dialog, move pixels or change what the user is looking at goes
//! through [`WormholeHost`]. The engine never reads host state back.

use std::path::{Path, PathBuf};

use crate::{
    layout,
    map::{MapDocument, MapHandle},
    properties::NodeId,
};

/// The host's answer when asked where a new wormhole should lead.
#[derive(Debug, Clone)]
pub enum TargetChoice {
    /// A map created for this wormhole. It has no file yet.
    NewMap(MapHandle),
    /// A map that already exists, open or not.
    ExistingMap(MapHandle),
}

impl TargetChoice {
    pub fn map(&self) -> &MapHandle {
        match self {
            TargetChoice::NewMap(map) | TargetChoice::ExistingMap(map) => map,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, TargetChoice::NewMap(_))
    }
}

/// Which node the user should be looking at.
#[derive(Debug, Clone, PartialEq)]
pub struct Focus {
    pub map: Option<PathBuf>,
    pub node: NodeId,
}

pub trait WormholeHost {
    /// Pick the map a new wormhole from `current` leads to. `None` cancels the build.
    fn choose_target_map(&self, current: &MapHandle) -> Option<TargetChoice>;

    /// Pick a file for a map that has never been saved. `None` refuses the save.
    fn choose_save_path(&self, map: &MapDocument) -> Option<PathBuf>;

    /// Reload the map at `path` from disk into whatever is displaying it.
    fn redisplay(&self, path: &Path) {
        tracing::debug!("[host] redisplay {:?}", path);
    }

    fn repaint(&self, _map: &MapHandle) {}

    fn focus(&self, focus: Focus) {
        tracing::debug!("[host] focus {} in {:?}", focus.node, focus.map);
    }

    /// Resolve an overlap between a freshly placed node and one of its siblings.
    fn spread_out(&self, map: &mut MapDocument, anchor: &NodeId, sibling: &NodeId, gap: f32) {
        layout::ripple_out(map, anchor, sibling, gap);
    }
}

/// Host for non-interactive use: answers from values fixed up front.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    target: Option<TargetChoice>,
    save_path: Option<PathBuf>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        HeadlessHost::default()
    }

    /// Link into an existing map.
    pub fn with_existing_target(mut self, map: MapHandle) -> Self {
        self.target = Some(TargetChoice::ExistingMap(map));
        self
    }

    /// Link into a fresh map that will be saved at `path`.
    pub fn with_new_target<S: Into<String>>(mut self, label: S, path: PathBuf) -> Self {
        self.target = Some(TargetChoice::NewMap(MapDocument::new(label).into_handle()));
        self.save_path = Some(path);
        self
    }
}

impl WormholeHost for HeadlessHost {
    fn choose_target_map(&self, _current: &MapHandle) -> Option<TargetChoice> {
        self.target.clone()
    }

    fn choose_save_path(&self, map: &MapDocument) -> Option<PathBuf> {
        if self.save_path.is_none() {
            tracing::warn!("[HeadlessHost] no save path available for '{}'", map.label);
        }
        self.save_path.clone()
    }
}
