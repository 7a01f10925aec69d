use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    error::WormholeError,
    map::node::{MapNode, WormholeMarker},
    properties::{NodeId, WormholeId},
};

/// Shared handle to an open map. Two handles denote the same map iff they point at the same
/// allocation; see [`same_map`].
pub type MapHandle = Arc<RwLock<MapDocument>>;

pub fn same_map(a: &MapHandle, b: &MapHandle) -> bool {
    Arc::ptr_eq(a, b)
}

/// A document holding a forest of nodes.
///
/// Only `id`, `label` and `nodes` are persisted. The file path, modified flag, construction depth
/// and listener set describe the document's life in the current session and are rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapDocument {
    pub id: NodeId,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<MapNode>,
    #[serde(skip)]
    file: Option<PathBuf>,
    #[serde(skip)]
    modified: bool,
    #[serde(skip)]
    constructing: usize,
    #[serde(skip)]
    listeners: BTreeSet<WormholeId>,
}

impl MapDocument {
    pub fn new<S: Into<String>>(label: S) -> Self {
        MapDocument {
            id: NodeId::generate(),
            label: label.into(),
            nodes: Vec::new(),
            file: None,
            modified: false,
            constructing: 0,
            listeners: BTreeSet::new(),
        }
    }

    pub fn into_handle(self) -> MapHandle {
        Arc::new(RwLock::new(self))
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    /// Record a new file identity and return the previous one. Does not touch the disk.
    pub fn set_file(&mut self, file: Option<PathBuf>) -> Option<PathBuf> {
        std::mem::replace(&mut self.file, file)
    }

    /// File name of the backing file, or the label for a map that was never saved.
    pub fn display_name(&self) -> String {
        self.file
            .as_ref()
            .and_then(|f| f.file_name())
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.label.clone())
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn mark_modified(&mut self) {
        self.modified = true;
    }

    pub fn mark_saved(&mut self) {
        self.modified = false;
    }

    pub fn is_constructing(&self) -> bool {
        self.constructing > 0
    }

    pub(crate) fn begin_construction(&mut self) {
        self.constructing += 1;
    }

    pub(crate) fn end_construction(&mut self) {
        self.constructing = self.constructing.saturating_sub(1);
    }

    pub fn add_listener(&mut self, wormhole: WormholeId) {
        self.listeners.insert(wormhole);
    }

    pub fn remove_listener(&mut self, wormhole: &WormholeId) -> bool {
        self.listeners.remove(wormhole)
    }

    pub fn has_listener(&self, wormhole: &WormholeId) -> bool {
        self.listeners.contains(wormhole)
    }

    pub fn listeners(&self) -> impl Iterator<Item = &WormholeId> {
        self.listeners.iter()
    }

    pub fn find_node(&self, id: &NodeId) -> Option<&MapNode> {
        if id.is_empty() {
            return None;
        }
        self.nodes.iter().find_map(|n| n.find(id))
    }

    pub fn find_node_mut(&mut self, id: &NodeId) -> Option<&mut MapNode> {
        if id.is_empty() {
            return None;
        }
        self.nodes.iter_mut().find_map(|n| n.find_mut(id))
    }

    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.find_node(id).is_some()
    }

    /// Insert a node at the top level.
    pub fn add_node(&mut self, node: MapNode) {
        self.nodes.push(node);
        self.modified = true;
    }

    pub fn remove_node(&mut self, id: &NodeId) -> Option<MapNode> {
        let removed = match self.nodes.iter().position(|n| &n.id == id) {
            Some(idx) => Some(self.nodes.remove(idx)),
            None => self.nodes.iter_mut().find_map(|n| n.remove_descendant(id)),
        };
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    pub fn find_marker(&self, marker_id: &NodeId) -> Option<(&MapNode, &WormholeMarker)> {
        self.nodes.iter().find_map(|n| n.find_marker(marker_id))
    }

    pub fn find_marker_mut(&mut self, marker_id: &NodeId) -> Option<&mut WormholeMarker> {
        self.nodes
            .iter_mut()
            .find_map(|n| n.find_marker_mut(marker_id))
    }

    /// Host id of a marker.
    pub fn marker_host(&self, marker_id: &NodeId) -> Option<NodeId> {
        self.find_marker(marker_id).map(|(host, _)| host.id.clone())
    }

    pub fn attach_marker(
        &mut self,
        host: &NodeId,
        marker: WormholeMarker,
    ) -> Result<(), WormholeError> {
        let node = self.find_node_mut(host).ok_or_else(|| {
            WormholeError::NotFound(format!("Cannot attach marker: node '{host}' is not in the map"))
        })?;
        node.markers.push(marker);
        self.modified = true;
        Ok(())
    }

    pub fn detach_marker(&mut self, marker_id: &NodeId) -> Option<(NodeId, WormholeMarker)> {
        let detached = self
            .nodes
            .iter_mut()
            .find_map(|n| n.detach_marker(marker_id));
        if detached.is_some() {
            self.modified = true;
        }
        detached
    }

    /// Move a marker to a new host node. Returns the id of the previous host.
    pub fn reparent_marker(
        &mut self,
        marker_id: &NodeId,
        new_host: &NodeId,
    ) -> Result<NodeId, WormholeError> {
        if !self.contains_node(new_host) {
            return Err(WormholeError::NotFound(format!(
                "Cannot reparent marker: node '{new_host}' is not in the map"
            )));
        }
        let (previous, marker) = self.detach_marker(marker_id).ok_or_else(|| {
            WormholeError::NotFound(format!("Marker '{marker_id}' is not in the map"))
        })?;
        self.attach_marker(new_host, marker)?;
        Ok(previous)
    }

    /// `(host id, marker id)` for every marker carrying a wormhole pointer.
    pub fn wormhole_markers(&self) -> Vec<(NodeId, NodeId)> {
        let mut out = Vec::new();
        for node in self.nodes.iter() {
            node.collect_wormhole_markers(&mut out);
        }
        out
    }
}
