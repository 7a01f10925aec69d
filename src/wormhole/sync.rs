//! Keeping both pointers of a wormhole truthful after maps move or get renamed.

use std::path::{Path, MAIN_SEPARATOR_STR};
use url::Url;

use crate::{
    error::WormholeError,
    event::Event,
    map::{same_map, MapHandle},
    paths::path::{encode_for_uri, file_name_of, file_uri, relative_path_by_string_manipulation},
    properties::{MarkerRole, NodeId},
    resource::WormholeResource,
    session::MapSession,
    wormhole::{BuildStage, Wormhole},
};

/// Two unknown identities are the same; a known and an unknown one differ.
pub fn is_map_file_changed(previous: Option<&Path>, current: Option<&Path>) -> bool {
    match (previous, current) {
        (None, None) => false,
        (Some(previous), Some(current)) => previous != current,
        _ => true,
    }
}

/// What a resync rewrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub source_updated: bool,
    pub target_updated: bool,
    /// The target node is gone and the source pointer carries the `NOTFOUND` sentinel.
    pub target_missing: bool,
}

impl SyncReport {
    pub fn changed(&self) -> bool {
        self.source_updated || self.target_updated
    }
}

fn absolute_spec(path: &Path) -> String {
    file_uri(path).unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// The spec a map at `base` stores to reach the map at `target`: relative and percent-encoded
/// when that yields a usable URI reference, the absolute file URI otherwise.
pub fn pointer_spec(target: &Path, base: &Path) -> String {
    let relative = relative_path_by_string_manipulation(
        &target.to_string_lossy(),
        &base.to_string_lossy(),
        MAIN_SEPARATOR_STR,
    );
    let encoded = encode_for_uri(&relative);
    let joinable = Url::parse("file:///")
        .and_then(|base| base.join(&encoded))
        .is_ok();
    if encoded.is_empty() || !joinable {
        absolute_spec(target)
    } else {
        encoded
    }
}

/// The pointer the marker in the map at `owner` should carry to reach `other_node` in the map
/// at `other`.
pub fn pointer_between(
    owner: &Path,
    owner_node: &NodeId,
    other: &Path,
    other_node: NodeId,
) -> WormholeResource {
    WormholeResource {
        component_uri: other_node,
        originating_component_uri: owner_node.clone(),
        originating_filename: absolute_spec(owner),
        system_spec: pointer_spec(other, owner),
        target_filename: file_name_of(&other.to_string_lossy()),
    }
}

/// Overwrite the marker's pointer when it differs from `desired`. Returns whether it did.
fn write_pointer(
    map: &MapHandle,
    marker_id: &NodeId,
    desired: WormholeResource,
) -> Result<bool, WormholeError> {
    let mut doc = map.write();
    let marker = doc.find_marker_mut(marker_id).ok_or_else(|| {
        WormholeError::Inconsistent(format!("Marker '{marker_id}' vanished from its map"))
    })?;
    let changed = marker
        .wormhole_resource()
        .map(|current| current.differs_from(&desired))
        .unwrap_or(true);
    if changed {
        marker.resource = Some(desired.into());
        doc.mark_modified();
    }
    Ok(changed)
}

fn file_of(map: &MapHandle, side: &str) -> Result<std::path::PathBuf, WormholeError> {
    map.read()
        .file()
        .map(Path::to_path_buf)
        .ok_or_else(|| WormholeError::Precondition(format!("{side} map has never been saved")))
}

impl Wormhole {
    /// Recompute both pointers from the current file identities and node ids, rewriting only
    /// what differs. Saves and redisplays only when something was rewritten.
    pub fn resync(&mut self, session: &mut MapSession) -> Result<SyncReport, WormholeError> {
        let missing = |what: &str| WormholeError::Precondition(format!("wormhole has no {what}"));
        let source_map = self.source_map.clone().ok_or_else(|| missing("source map"))?;
        let target_map = self.target_map.clone().ok_or_else(|| missing("target map"))?;
        let source_node = self.source_node.clone().ok_or_else(|| missing("source node"))?;
        let source_marker = self.source_marker.clone().ok_or_else(|| missing("source marker"))?;

        let source_path = file_of(&source_map, "source")?;
        let target_path = file_of(&target_map, "target")?;
        let target_node = self
            .target_node
            .clone()
            .filter(|n| target_map.read().contains_node(n));

        let mut report = SyncReport::default();
        let source_pointer = pointer_between(
            &source_path,
            &source_node,
            &target_path,
            target_node.clone().unwrap_or_else(NodeId::not_found),
        );
        let source_spec = source_pointer.system_spec.clone();
        report.source_updated =
            write_pointer(&source_map, &source_marker, source_pointer)?;
        if report.source_updated {
            session.emit(Event::PointerUpdated {
                marker: source_marker.clone(),
                role: MarkerRole::Source,
                spec: source_spec,
            });
        }

        match (target_node.as_ref(), self.target_marker.as_ref()) {
            (Some(target_node), Some(target_marker)) => {
                let target_pointer =
                    pointer_between(&target_path, target_node, &source_path, source_node.clone());
                let target_spec = target_pointer.system_spec.clone();
                report.target_updated =
                    write_pointer(&target_map, target_marker, target_pointer)?;
                if report.target_updated {
                    session.emit(Event::PointerUpdated {
                        marker: target_marker.clone(),
                        role: MarkerRole::Target,
                        spec: target_spec,
                    });
                }
            }
            (None, _) => {
                tracing::warn!(
                    "[Wormhole] target of {} is missing from {:?}",
                    source_node,
                    target_path
                );
                report.target_missing = true;
                session.emit(Event::TargetMissing {
                    source: source_node.clone(),
                });
            }
            (Some(_), None) => {}
        }

        if report.changed() {
            session.force_save(&source_map)?;
            let identical = same_map(&source_map, &target_map);
            if !identical {
                session.force_save(&target_map)?;
            }
            session.host().redisplay(&source_path);
            if !identical {
                session.host().redisplay(&target_path);
            }
        } else {
            tracing::debug!("[Wormhole] {} pointers already current", self.id);
        }

        self.source_file = Some(source_path);
        self.target_file = Some(target_path);
        if self.stage < BuildStage::PointersSet {
            self.stage = BuildStage::PointersSet;
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn file_identity_change_detection() {
        let a = Path::new("/docs/A.map");
        let b = Path::new("/docs/B.map");
        assert!(!is_map_file_changed(None, None));
        assert!(is_map_file_changed(None, Some(a)));
        assert!(is_map_file_changed(Some(a), None));
        assert!(!is_map_file_changed(Some(a), Some(a)));
        assert!(is_map_file_changed(Some(a), Some(b)));
    }

    #[cfg(unix)]
    #[test]
    fn pointers_are_relative_and_encoded() {
        let spec = pointer_spec(Path::new("/docs/sub/My B.map"), Path::new("/docs/A.map"));
        assert_eq!(spec, "sub/My%20B.map");
        let spec = pointer_spec(Path::new("/docs/A.map"), Path::new("/docs/sub/My B.map"));
        assert_eq!(spec, "../A.map");
    }

    #[cfg(unix)]
    #[test]
    fn pointer_between_never_points_at_its_owner() {
        let owner = Path::new("/docs/A.map");
        let other = Path::new("/docs/B.map");
        let pointer = pointer_between(owner, &NodeId::from("n1"), other, NodeId::from("n42"));
        assert_eq!(pointer.component_uri, NodeId::from("n42"));
        assert_eq!(pointer.originating_component_uri, NodeId::from("n1"));
        assert_eq!(pointer.originating_filename, "file:///docs/A.map");
        assert_eq!(pointer.system_spec, "B.map");
        assert_eq!(pointer.target_filename, "B.map");
    }

    #[cfg(unix)]
    #[test]
    fn same_map_pointer_names_the_map_itself() {
        let owner = Path::new("/docs/A.map");
        let pointer = pointer_between(owner, &NodeId::from("n1"), owner, NodeId::from("n2"));
        assert_eq!(pointer.system_spec, "A.map");
    }
}
