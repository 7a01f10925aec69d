//! Keeping a freshly placed target node from landing on top of its neighbours.

use crate::{
    host::WormholeHost,
    map::{MapDocument, MapNode},
    properties::{Bounds, NodeId},
};

fn collect_overlaps(nodes: &[MapNode], anchor: &NodeId, region: &Bounds, out: &mut Vec<NodeId>) {
    for node in nodes {
        if node.kind.is_connector() {
            continue;
        }
        if node.kind.is_container() {
            collect_overlaps(&node.children, anchor, region, out);
            continue;
        }
        if &node.id != anchor && node.bounds.intersects(region) {
            out.push(node.id.clone());
        }
        collect_overlaps(&node.children, anchor, region, out);
    }
}

/// Ids of every node whose bounds intersect the anchor's. Groups and layers are searched
/// through rather than compared, connectors are ignored.
pub fn overlapping(map: &MapDocument, anchor: &NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    if let Some(region) = map.find_node(anchor).map(|n| n.bounds) {
        collect_overlaps(&map.nodes, anchor, &region, &mut out);
    }
    out
}

/// Shift `sibling` right until it clears `anchor` by `gap`. Returns whether anything moved.
pub fn ripple_out(map: &mut MapDocument, anchor: &NodeId, sibling: &NodeId, gap: f32) -> bool {
    let Some(anchor_bounds) = map.find_node(anchor).map(|n| n.bounds) else {
        return false;
    };
    let Some(node) = map.find_node_mut(sibling) else {
        return false;
    };
    if !node.bounds.intersects(&anchor_bounds) {
        return false;
    }
    node.bounds.x = anchor_bounds.right() + gap;
    map.mark_modified();
    true
}

/// Ask the host to resolve each overlap with `anchor`. Returns the number of overlaps found.
pub fn spread_overlaps(
    host: &dyn WormholeHost,
    map: &mut MapDocument,
    anchor: &NodeId,
    gap: f32,
) -> usize {
    let overlaps = overlapping(map, anchor);
    for sibling in overlaps.iter() {
        tracing::debug!("[layout] {} overlaps {}, spreading out", sibling, anchor);
        host.spread_out(map, anchor, sibling, gap);
    }
    overlaps.len()
}
