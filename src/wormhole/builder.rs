//! Building a brand-new wormhole out of a node the user picked.

use std::path::PathBuf;

use crate::{
    error::WormholeError,
    event::Event,
    host::Focus,
    layout,
    map::{same_map, MapHandle, MapNode, WormholeMarker},
    properties::{MarkerRole, NodeId},
    session::MapSession,
    wormhole::{guard::ConstructionGuard, BuildStage, Wormhole},
};

/// Everything a failed build has to take back.
#[derive(Default)]
struct Rollback {
    markers: Vec<(MapHandle, NodeId)>,
    nodes: Vec<(MapHandle, NodeId)>,
    /// Maps this build wrote to disk, and whether the file was created by this build.
    written: Vec<(MapHandle, bool)>,
}

impl Rollback {
    fn wrote(&mut self, map: &MapHandle, created: bool) {
        if !self.written.iter().any(|(m, _)| same_map(m, map)) {
            self.written.push((map.clone(), created));
        }
    }

    fn undo(self, session: &mut MapSession) {
        for (map, marker) in self.markers.iter().rev() {
            map.write().detach_marker(marker);
        }
        for (map, node) in self.nodes.iter().rev() {
            map.write().remove_node(node);
        }
        for (map, created) in self.written {
            if created {
                let previous = map.write().set_file(None);
                if let Some(file) = previous {
                    tracing::debug!("[Wormhole] removing {:?} created by the cancelled build", file);
                    if let Err(e) = std::fs::remove_file(&file) {
                        tracing::warn!("[Wormhole] could not remove {:?}: {}", file, e);
                    }
                }
                session.close_map(&map);
            } else if let Err(e) = session.save_map(&map) {
                tracing::warn!("[Wormhole] could not restore map on disk: {}", e);
            }
        }
    }
}

impl Wormhole {
    /// Build a wormhole from `source_node` in `source_map` to a fresh node in a map the host
    /// chooses. The result is either complete or cancelled with its failure recorded; a
    /// cancelled build leaves no markers or target node behind, in memory or on disk.
    pub fn build(session: &mut MapSession, source_map: &MapHandle, source_node: &NodeId) -> Wormhole {
        let mut wormhole = Wormhole::empty();
        let mut guards = Vec::new();
        let mut rollback = Rollback::default();
        match wormhole.try_build(session, source_map, source_node, &mut guards, &mut rollback) {
            Ok(()) => {
                wormhole.finish();
                tracing::info!("[Wormhole] built {}", wormhole);
                if let (Some(source), Some(target)) =
                    (wormhole.source_node.clone(), wormhole.target_node.clone())
                {
                    session.emit(Event::WormholeCreated {
                        id: wormhole.id,
                        source,
                        target: target.clone(),
                    });
                    session.host().focus(Focus {
                        map: wormhole.target_file.clone(),
                        node: target,
                    });
                }
                for map in [wormhole.source_map.as_ref(), wormhole.target_map.as_ref()]
                    .into_iter()
                    .flatten()
                {
                    session.host().repaint(map);
                }
            }
            Err(e) => {
                rollback.undo(session);
                wormhole.cancel(e);
            }
        }
        drop(guards);
        wormhole
    }

    fn try_build(
        &mut self,
        session: &mut MapSession,
        source_map: &MapHandle,
        source_node: &NodeId,
        guards: &mut Vec<ConstructionGuard>,
        rollback: &mut Rollback,
    ) -> Result<(), WormholeError> {
        self.stage = BuildStage::Start;
        if session.config().save_open_maps_first {
            session.save_all_open_modified()?;
        }

        if source_node.is_empty() || !source_map.read().contains_node(source_node) {
            return Err(WormholeError::Precondition(format!(
                "source node '{source_node}' is not in the source map"
            )));
        }
        let source_map = session.adopt(source_map.clone());
        guards.push(ConstructionGuard::acquire(&source_map));
        self.source_file = Some(session.force_save(&source_map)?);
        rollback.wrote(&source_map, false);

        let config = session.config().clone();
        let mut target_node =
            MapNode::new(config.default_target_label.as_str()).bounds(config.default_target_bounds);
        let target_id = target_node.id.clone();

        let choice = session
            .host()
            .choose_target_map(&source_map)
            .ok_or(WormholeError::OperationCancelled)?;
        let target_map = session.adopt(choice.map().clone());
        guards.push(ConstructionGuard::acquire(&target_map));
        let target_existed = target_map.read().file().is_some();
        rollback.wrote(&target_map, choice.is_new() && !target_existed);
        let target_file: PathBuf = session.force_save(&target_map)?;
        self.target_file = Some(target_file);
        self.source_node = Some(source_node.clone());
        self.source_map = Some(source_map.clone());
        self.target_map = Some(target_map.clone());
        self.stage = BuildStage::ComponentsAndMaps;

        let source_marker = WormholeMarker::new(MarkerRole::Source, config.target_marker_label.as_str());
        let target_marker = WormholeMarker::new(MarkerRole::Target, config.target_marker_label.as_str());
        self.source_marker = Some(source_marker.id.clone());
        self.target_marker = Some(target_marker.id.clone());
        let source_marker_id = source_marker.id.clone();
        source_map.write().attach_marker(source_node, source_marker)?;
        rollback.markers.push((source_map.clone(), source_marker_id));
        target_node.markers.push(target_marker);
        self.stage = BuildStage::MarkersCreated;

        {
            let mut doc = target_map.write();
            doc.add_node(target_node);
            layout::spread_overlaps(session.host(), &mut doc, &target_id, config.spread_gap);
        }
        rollback.nodes.push((target_map.clone(), target_id.clone()));
        self.target_node = Some(target_id);
        self.stage = BuildStage::Placed;

        self.resync(session)?;
        self.attach_listeners();
        Ok(())
    }
}
