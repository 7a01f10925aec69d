use serde::{Deserialize, Serialize};

use crate::{
    properties::{Bounds, MarkerRole, NodeId, NodeKind},
    resource::{Resource, WormholeResource},
};

/// A link marker embedded in its host node. One marker sits on each end of a wormhole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WormholeMarker {
    pub id: NodeId,
    pub role: MarkerRole,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,
}

impl WormholeMarker {
    pub fn new<S: Into<String>>(role: MarkerRole, label: S) -> Self {
        WormholeMarker {
            id: NodeId::generate(),
            role,
            label: label.into(),
            resource: None,
        }
    }

    pub fn wormhole_resource(&self) -> Option<&WormholeResource> {
        self.resource.as_ref().and_then(|r| r.as_wormhole())
    }

    /// Component id this marker's pointer refers to, if it carries a wormhole pointer.
    pub fn pointed_component(&self) -> Option<&NodeId> {
        self.wormhole_resource().map(|wr| &wr.component_uri)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapNode {
    pub id: NodeId,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub kind: NodeKind,
    #[serde(default)]
    pub bounds: Bounds,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub markers: Vec<WormholeMarker>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<MapNode>,
}

impl MapNode {
    pub fn new<S: Into<String>>(label: S) -> Self {
        MapNode::with_id(NodeId::generate(), label)
    }

    pub fn with_id<S: Into<String>>(id: NodeId, label: S) -> Self {
        MapNode {
            id,
            label: label.into(),
            kind: NodeKind::default(),
            bounds: Bounds::default(),
            markers: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn child(mut self, child: MapNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn find(&self, id: &NodeId) -> Option<&MapNode> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub fn find_mut(&mut self, id: &NodeId) -> Option<&mut MapNode> {
        if &self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    /// The marker with `marker_id` anywhere in this subtree, together with its host node.
    pub fn find_marker(&self, marker_id: &NodeId) -> Option<(&MapNode, &WormholeMarker)> {
        if let Some(marker) = self.markers.iter().find(|m| &m.id == marker_id) {
            return Some((self, marker));
        }
        self.children.iter().find_map(|c| c.find_marker(marker_id))
    }

    pub fn find_marker_mut(&mut self, marker_id: &NodeId) -> Option<&mut WormholeMarker> {
        if let Some(idx) = self.markers.iter().position(|m| &m.id == marker_id) {
            return self.markers.get_mut(idx);
        }
        self.children
            .iter_mut()
            .find_map(|c| c.find_marker_mut(marker_id))
    }

    /// Remove a descendant (never `self`) and return it.
    pub fn remove_descendant(&mut self, id: &NodeId) -> Option<MapNode> {
        if let Some(idx) = self.children.iter().position(|c| &c.id == id) {
            return Some(self.children.remove(idx));
        }
        self.children
            .iter_mut()
            .find_map(|c| c.remove_descendant(id))
    }

    /// Detach a marker from whichever node in this subtree hosts it. Returns the host id.
    pub fn detach_marker(&mut self, marker_id: &NodeId) -> Option<(NodeId, WormholeMarker)> {
        if let Some(idx) = self.markers.iter().position(|m| &m.id == marker_id) {
            return Some((self.id.clone(), self.markers.remove(idx)));
        }
        self.children
            .iter_mut()
            .find_map(|c| c.detach_marker(marker_id))
    }

    /// Every marker in this subtree, depth first.
    pub fn all_markers(&self) -> Vec<&WormholeMarker> {
        let mut out: Vec<&WormholeMarker> = self.markers.iter().collect();
        for child in self.children.iter() {
            out.extend(child.all_markers());
        }
        out
    }

    /// Collect `(host id, marker id)` for every marker in this subtree carrying a wormhole
    /// pointer, depth first.
    pub fn collect_wormhole_markers(&self, out: &mut Vec<(NodeId, NodeId)>) {
        for marker in self.markers.iter() {
            if marker.wormhole_resource().is_some() {
                out.push((self.id.clone(), marker.id.clone()));
            }
        }
        for child in self.children.iter() {
            child.collect_wormhole_markers(out);
        }
    }
}
