//! Rebuilding a wormhole from one persisted marker.

use crate::{
    error::WormholeError,
    event::Event,
    map::{MapHandle, WormholeMarker},
    paths::{locate, points_to_same_map, ResolveRequest},
    properties::{MarkerRole, NodeId},
    resource::WormholeResource,
    session::MapSession,
    wormhole::{guard::ConstructionGuard, BuildStage, Wormhole},
};

fn set_role(map: &MapHandle, marker_id: &NodeId, role: MarkerRole) {
    if let Some(marker) = map.write().find_marker_mut(marker_id) {
        marker.role = role;
    }
}

/// The marker on `source_map` carrying a wormhole pointer, with its host node id.
fn pointer_of(
    source_map: &MapHandle,
    marker_id: &NodeId,
) -> Result<(NodeId, WormholeResource), WormholeError> {
    let doc = source_map.read();
    let (host, marker) = doc
        .find_marker(marker_id)
        .ok_or_else(|| WormholeError::NotFound(format!("marker '{marker_id}'")))?;
    let pointer = marker.wormhole_resource().cloned().ok_or_else(|| {
        WormholeError::Precondition(format!("marker '{marker_id}' carries no wormhole pointer"))
    })?;
    Ok((host.id.clone(), pointer))
}

/// Find the map a pointer refers to.
///
/// A pointer that names the source map only resolves there when the source map holds the target
/// node; the name test is a suffix match and also fires for `Map.map` seen from `MyMap.map`.
/// Otherwise the resolver runs, and the source map is the fallback for a self-naming pointer
/// whose target node is gone.
fn find_target_map(
    session: &mut MapSession,
    source_map: &MapHandle,
    pointer: &WormholeResource,
) -> Result<MapHandle, WormholeError> {
    let spec = pointer.target_spec();
    let names_source = points_to_same_map(spec, &pointer.originating_filename);
    if names_source && source_map.read().contains_node(&pointer.component_uri) {
        tracing::debug!("[Wormhole] '{}' names the source map itself", spec);
        return Ok(source_map.clone());
    }
    let source_path = source_map
        .read()
        .file()
        .map(|f| f.to_string_lossy().to_string())
        .ok_or_else(|| WormholeError::Precondition("source map has never been saved".to_string()))?;
    let limits = session.limits();
    let request = ResolveRequest {
        hint: spec,
        node: &pointer.component_uri,
        source_path: &source_path,
    };
    match locate(&request, &*session, &limits) {
        Some(resolution) => Ok(session.adopt(resolution.map)),
        None if names_source => {
            tracing::debug!(
                "[Wormhole] '{}' not found elsewhere, falling back to the source map",
                pointer.component_uri
            );
            Ok(source_map.clone())
        }
        None => Err(WormholeError::Unresolvable {
            spec: spec.to_string(),
            component: pointer.component_uri.to_string(),
        }),
    }
}

/// Markers anywhere in a node's subtree, copied out so no lock is held while other maps are
/// consulted.
fn markers_of(map: &MapHandle, node: &NodeId) -> Vec<WormholeMarker> {
    map.read()
        .find_node(node)
        .map(|n| n.all_markers().into_iter().cloned().collect())
        .unwrap_or_default()
}

impl Wormhole {
    /// Rebuild the wormhole that `marker_id` in `source_map` belongs to. The given marker
    /// becomes the source end.
    pub fn restore(session: &mut MapSession, source_map: &MapHandle, marker_id: &NodeId) -> Wormhole {
        let mut wormhole = Wormhole::empty();
        let result = {
            let _guard = ConstructionGuard::acquire(source_map);
            wormhole.try_restore(session, source_map, marker_id)
        };
        wormhole.conclude(session, result);
        wormhole
    }

    /// Rebuild a wormhole after its marker moved from the node `previous_parent` to
    /// `new_parent`. The target end is the marker on the target node still pointing at the
    /// previous parent.
    pub fn restore_reparented(
        session: &mut MapSession,
        source_map: &MapHandle,
        marker_id: &NodeId,
        previous_parent: &str,
        new_parent: &NodeId,
    ) -> Wormhole {
        let mut wormhole = Wormhole::empty();
        let result = {
            let _guard = ConstructionGuard::acquire(source_map);
            wormhole.try_restore_reparented(session, source_map, marker_id, previous_parent, new_parent)
        };
        wormhole.conclude(session, result);
        wormhole
    }

    fn conclude(&mut self, session: &mut MapSession, result: Result<(), WormholeError>) {
        match result {
            Ok(()) => {
                self.finish();
                tracing::info!("[Wormhole] restored {}", self);
                if let Some(source) = self.source_node.clone() {
                    session.emit(Event::WormholeRestored {
                        id: self.id,
                        source,
                        target: self.target_marker.as_ref().and(self.target_node.clone()),
                    });
                }
            }
            Err(e) => self.cancel(e),
        }
    }

    fn try_restore(
        &mut self,
        session: &mut MapSession,
        source_map: &MapHandle,
        marker_id: &NodeId,
    ) -> Result<(), WormholeError> {
        let (source_node, pointer) = pointer_of(source_map, marker_id)?;
        if pointer.component_uri.is_empty() {
            return Err(WormholeError::Precondition(format!(
                "marker '{marker_id}' has an empty component id"
            )));
        }
        let target_map = find_target_map(session, source_map, &pointer)?;
        let _guard = ConstructionGuard::acquire(&target_map);
        self.source_map = Some(source_map.clone());
        self.source_node = Some(source_node);
        self.source_marker = Some(marker_id.clone());
        self.target_map = Some(target_map.clone());
        self.stage = BuildStage::ComponentsAndMaps;

        let target_present = target_map.read().contains_node(&pointer.component_uri);
        if !target_present {
            if source_map
                .read()
                .contains_node(&pointer.originating_component_uri)
            {
                tracing::info!(
                    "[Wormhole] target '{}' is gone, keeping the source side of {}",
                    pointer.component_uri,
                    marker_id
                );
                self.source_node = Some(pointer.originating_component_uri.clone());
                set_role(source_map, marker_id, MarkerRole::Source);
                self.stage = BuildStage::MarkersCreated;
                self.resync(session)?;
                self.attach_listeners();
                return Ok(());
            }
            return Err(WormholeError::Inconsistent(format!(
                "neither target '{}' nor originating node '{}' exists",
                pointer.component_uri, pointer.originating_component_uri
            )));
        }

        let candidates = markers_of(&target_map, &pointer.component_uri);
        let target_marker = candidates
            .into_iter()
            .filter(|m| &m.id != marker_id)
            .find(|m| {
                m.pointed_component()
                    .map(|c| source_map.read().contains_node(c))
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                WormholeError::Inconsistent(format!(
                    "no marker on '{}' points back into the source map",
                    pointer.component_uri
                ))
            })?;

        set_role(&target_map, &target_marker.id, MarkerRole::Target);
        set_role(source_map, marker_id, MarkerRole::Source);
        self.target_node = Some(pointer.component_uri.clone());
        self.target_marker = Some(target_marker.id);
        self.stage = BuildStage::MarkersCreated;

        self.resync(session)?;
        self.attach_listeners();
        Ok(())
    }

    fn try_restore_reparented(
        &mut self,
        session: &mut MapSession,
        source_map: &MapHandle,
        marker_id: &NodeId,
        previous_parent: &str,
        new_parent: &NodeId,
    ) -> Result<(), WormholeError> {
        if previous_parent.is_empty() {
            return Err(WormholeError::Precondition(
                "re-parenting needs the previous parent's id".to_string(),
            ));
        }
        if !source_map.read().contains_node(new_parent) {
            return Err(WormholeError::Precondition(format!(
                "new parent '{new_parent}' is not in the map"
            )));
        }
        let (_, pointer) = pointer_of(source_map, marker_id)?;
        self.source_map = Some(source_map.clone());
        self.source_node = Some(new_parent.clone());
        self.source_marker = Some(marker_id.clone());
        session.force_save(source_map)?;

        let target_map = find_target_map(session, source_map, &pointer)?;
        let _guard = ConstructionGuard::acquire(&target_map);
        self.target_map = Some(target_map.clone());
        self.stage = BuildStage::ComponentsAndMaps;

        if !target_map.read().contains_node(&pointer.component_uri) {
            return Err(WormholeError::Inconsistent(format!(
                "target '{}' is not in its map",
                pointer.component_uri
            )));
        }
        let target_marker = markers_of(&target_map, &pointer.component_uri)
            .into_iter()
            .filter(|m| &m.id != marker_id)
            .find(|m| {
                m.pointed_component()
                    .map(|c| c.as_str() == previous_parent)
                    .unwrap_or(false)
            })
            .ok_or_else(|| {
                WormholeError::Inconsistent(format!(
                    "no marker on '{}' points at the previous parent '{}'",
                    pointer.component_uri, previous_parent
                ))
            })?;

        set_role(&target_map, &target_marker.id, MarkerRole::Target);
        set_role(source_map, marker_id, MarkerRole::Source);
        self.target_node = Some(pointer.component_uri.clone());
        self.target_marker = Some(target_marker.id);
        self.stage = BuildStage::MarkersCreated;

        self.resync(session)?;
        self.attach_listeners();
        Ok(())
    }
}
