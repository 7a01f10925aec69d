//! Wormholes surviving moves, renames, deletions and re-parenting.

mod common;

use common::*;
use std::path::{Path, PathBuf};
use test_log::test;
use wormhole_core::{
    event::Event,
    map::{MapNode, MapStore, TomlMapStore},
    properties::NodeId,
    wormhole::Wormhole,
    FailureKind, WormholeError,
};

/// Build A(n1) -> B in `dir`, save both, and return the target node id.
fn linked_pair(dir: &Path, b_name: &str, extra: &[(&str, &str)]) -> (PathBuf, PathBuf, NodeId) {
    let mut nodes = vec![("n1", "Source")];
    nodes.extend_from_slice(extra);
    let a = write_map(&dir.join("A.map"), &nodes);
    let b = write_map(&dir.join(b_name), &[("b1", "Existing")]);
    let host = ScriptedHost::new();
    host.push_existing(TomlMapStore::new().load(&b).unwrap().into_handle());
    let (mut session, _rx) = open_session(&host);
    let source = session.open_map(&a).unwrap();
    let id = session.create_wormhole(&source, &NodeId::from("n1")).unwrap();
    let target = session.wormhole(&id).unwrap().target_node().unwrap().clone();
    (a, b, target)
}

fn spec_of(path: &Path) -> String {
    pointers_on_disk(path)[0].1.system_spec.clone()
}

#[cfg(unix)]
#[test]
fn moving_the_target_rewrites_both_pointers() {
    let dir = temp_dir();
    let (a, b, _) = linked_pair(dir.path(), "B.map", &[]);
    let host = ScriptedHost::new();
    let (mut session, rx) = open_session(&host);
    session.open_map(&a).unwrap();
    let target = session.find_open_map(&b).unwrap();
    drain(&rx);

    let moved_to = dir.path().join("renamed/C.map");
    assert_eq!(session.move_map_file(&target, &moved_to).unwrap(), 1);
    assert!(!b.exists());
    assert_eq!(spec_of(&a), "renamed/C.map");
    assert_eq!(pointers_on_disk(&a)[0].1.target_filename, "C.map");
    assert_eq!(spec_of(&moved_to), "../A.map");
    assert_eq!(host.count("redisplay"), 2);

    let events = drain(&rx);
    assert!(events.iter().any(|e| matches!(e, Event::MapFileChanged { .. })));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, Event::PointerUpdated { .. }))
            .count(),
        2
    );

    // recording the same file again changes nothing
    assert_eq!(session.set_map_file(&target, Some(moved_to.clone())).unwrap(), 0);
}

#[cfg(unix)]
#[test]
fn moving_the_source_rewrites_both_pointers() {
    let dir = temp_dir();
    let (a, b, _) = linked_pair(dir.path(), "B.map", &[]);
    let (mut session, _rx) = open_session(&ScriptedHost::new());
    let source = session.open_map(&a).unwrap();

    let moved_to = dir.path().join("deep/A2.map");
    assert_eq!(session.move_map_file(&source, &moved_to).unwrap(), 1);
    assert_eq!(spec_of(&moved_to), "../B.map");
    assert_eq!(spec_of(&b), "deep/A2.map");
}

#[cfg(unix)]
#[test]
fn target_moved_behind_the_sessions_back_is_found_below() {
    let dir = temp_dir();
    let (a, b, target) = linked_pair(dir.path(), "B.map", &[]);
    let archived = dir.path().join("archive/old/B.map");
    std::fs::create_dir_all(archived.parent().unwrap()).unwrap();
    std::fs::rename(&b, &archived).unwrap();

    let (mut session, _rx) = open_session(&ScriptedHost::new());
    session.open_map(&a).unwrap();
    assert_eq!(session.wormholes().len(), 1);
    assert_eq!(session.wormholes()[0].target_node(), Some(&target));
    assert_eq!(spec_of(&a), "archive/old/B.map");
    assert_eq!(spec_of(&archived), "../../A.map");
}

#[test]
fn missing_target_node_keeps_the_source_side() {
    let dir = temp_dir();
    let a = write_map(&dir.path().join("A.map"), &[("n1", "Source")]);
    let host = ScriptedHost::new();
    let (mut session, _rx) = open_session(&host);
    let source = session.open_map(&a).unwrap();
    host.push_existing(source.clone());
    let id = session.create_wormhole(&source, &NodeId::from("n1")).unwrap();
    let target = session.wormhole(&id).unwrap().target_node().unwrap().clone();
    drop(session);

    let mut doc = load(&a);
    doc.remove_node(&target);
    TomlMapStore::new().save(&doc, &a).unwrap();

    let (mut session, rx) = open_session(&ScriptedHost::new());
    session.open_map(&a).unwrap();
    assert_eq!(session.wormholes().len(), 1);
    let wormhole = &session.wormholes()[0];
    assert!(wormhole.is_one_sided());
    assert!(!wormhole.is_cancelled());
    assert_eq!(wormhole.source_node(), Some(&NodeId::from("n1")));

    let pointer = &pointers_on_disk(&a)[0].1;
    assert!(pointer.component_uri.is_not_found());
    let events = drain(&rx);
    assert!(events.iter().any(|e| matches!(e, Event::TargetMissing { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::WormholeRestored { target: None, .. })));

    // once the sentinel is written, reopening is quiet
    let a_before = std::fs::read(&a).unwrap();
    let (mut session, _rx) = open_session(&ScriptedHost::new());
    session.open_map(&a).unwrap();
    assert!(session.wormholes()[0].is_one_sided());
    assert_eq!(std::fs::read(&a).unwrap(), a_before);
}

#[test]
fn missing_target_node_in_another_map_is_a_broken_link() {
    let dir = temp_dir();
    let (a, b, target) = linked_pair(dir.path(), "B.map", &[]);
    let mut doc = load(&b);
    doc.remove_node(&target);
    TomlMapStore::new().save(&doc, &b).unwrap();

    let (mut session, _rx) = open_session(&ScriptedHost::new());
    let map = session.load_map(&a).unwrap();
    let outcomes = session.restore_markers(&map);
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].result.as_ref().unwrap_err().is_broken_link());
}

#[test]
fn deleted_target_map_is_a_broken_link() {
    let dir = temp_dir();
    let (a, b, _) = linked_pair(dir.path(), "B.map", &[]);
    std::fs::remove_file(&b).unwrap();
    let a_before = std::fs::read(&a).unwrap();

    let (mut session, _rx) = open_session(&ScriptedHost::new());
    let map = session.load_map(&a).unwrap();
    let outcomes = session.restore_markers(&map);
    assert_eq!(outcomes.len(), 1);
    let err = outcomes[0].result.clone().unwrap_err();
    assert!(matches!(err, WormholeError::Unresolvable { .. }));
    assert!(err.is_broken_link());
    assert!(session.wormholes().is_empty());
    assert!(!map.read().is_constructing());
    assert_eq!(std::fs::read(&a).unwrap(), a_before);
}

#[test]
fn reparenting_moves_the_link_to_the_new_host() {
    let dir = temp_dir();
    let (a, b, target) = linked_pair(dir.path(), "B.map", &[("n2", "Other")]);
    let (mut session, _rx) = open_session(&ScriptedHost::new());
    let source = session.open_map(&a).unwrap();
    let marker = session.wormholes()[0].source_marker().unwrap().clone();

    let id = session
        .reparent_marker(&source, &marker, &NodeId::from("n2"))
        .unwrap();
    let wormhole = session.wormhole(&id).unwrap();
    assert_eq!(wormhole.source_node(), Some(&NodeId::from("n2")));
    assert_eq!(wormhole.target_node(), Some(&target));
    assert_eq!(session.wormholes().len(), 1);

    let (host, pointer) = &pointers_on_disk(&a)[0];
    assert_eq!(host, &NodeId::from("n2"));
    assert_eq!(pointer.originating_component_uri, NodeId::from("n2"));
    assert_eq!(pointer.component_uri, target);
    let (_, back) = &pointers_on_disk(&b)[0];
    assert_eq!(back.component_uri, NodeId::from("n2"));
}

#[test]
fn reparenting_without_a_matching_target_marker_fails() {
    let dir = temp_dir();
    let (a, b, _) = linked_pair(dir.path(), "B.map", &[("n2", "Other")]);
    let b_before = std::fs::read(&b).unwrap();
    let (mut session, _rx) = open_session(&ScriptedHost::new());
    let source = session.load_map(&a).unwrap();
    let marker = source.read().wormhole_markers()[0].1.clone();

    let wormhole = Wormhole::restore_reparented(
        &mut session,
        &source,
        &marker,
        "not-the-previous-parent",
        &NodeId::from("n2"),
    );
    assert!(wormhole.is_cancelled());
    assert_eq!(wormhole.failure().map(|e| e.kind()), Some(FailureKind::Inconsistent));
    assert!(wormhole.target_marker().is_none());
    assert!(wormhole.target_node().is_none());
    assert!(!source.read().is_constructing());
    assert_eq!(std::fs::read(&b).unwrap(), b_before);

    let wormhole =
        Wormhole::restore_reparented(&mut session, &source, &marker, "", &NodeId::from("n2"));
    assert_eq!(wormhole.failure().map(|e| e.kind()), Some(FailureKind::Precondition));
}

#[test]
fn suffix_named_target_is_not_mistaken_for_the_source_map() {
    let dir = temp_dir();
    let a = write_map(&dir.path().join("MyMap.map"), &[("n1", "Source")]);
    let b = write_map(&dir.path().join("Map.map"), &[("b1", "Existing")]);
    let target = {
        let host = ScriptedHost::new();
        host.push_existing(TomlMapStore::new().load(&b).unwrap().into_handle());
        let (mut session, _rx) = open_session(&host);
        let source = session.open_map(&a).unwrap();
        let id = session.create_wormhole(&source, &NodeId::from("n1")).unwrap();
        session.wormhole(&id).unwrap().target_node().unwrap().clone()
    };
    assert_eq!(spec_of(&a), "Map.map");
    let a_before = std::fs::read(&a).unwrap();
    let b_before = std::fs::read(&b).unwrap();

    let (mut session, _rx) = open_session(&ScriptedHost::new());
    session.open_map(&a).unwrap();
    assert_eq!(session.wormholes().len(), 1);
    let wormhole = &session.wormholes()[0];
    assert!(!wormhole.is_one_sided());
    assert_eq!(wormhole.target_node(), Some(&target));
    assert!(!pointers_on_disk(&a)[0].1.component_uri.is_not_found());
    assert_eq!(std::fs::read(&a).unwrap(), a_before);
    assert_eq!(std::fs::read(&b).unwrap(), b_before);
}

#[test]
fn one_sided_link_keeps_the_recorded_source_node() {
    let dir = temp_dir();
    let a = write_map(&dir.path().join("A.map"), &[("n1", "Source"), ("n2", "Other")]);
    let host = ScriptedHost::new();
    let (mut session, _rx) = open_session(&host);
    let source = session.open_map(&a).unwrap();
    host.push_existing(source.clone());
    let id = session.create_wormhole(&source, &NodeId::from("n1")).unwrap();
    let wormhole = session.wormhole(&id).unwrap();
    let target = wormhole.target_node().unwrap().clone();
    let marker = wormhole.source_marker().unwrap().clone();
    drop(session);

    let mut doc = load(&a);
    doc.remove_node(&target);
    doc.reparent_marker(&marker, &NodeId::from("n2")).unwrap();
    TomlMapStore::new().save(&doc, &a).unwrap();

    let (mut session, rx) = open_session(&ScriptedHost::new());
    session.open_map(&a).unwrap();
    let wormhole = &session.wormholes()[0];
    assert!(wormhole.is_one_sided());
    assert_eq!(wormhole.source_node(), Some(&NodeId::from("n1")));
    assert_eq!(
        pointers_on_disk(&a)[0].1.originating_component_uri,
        NodeId::from("n1")
    );
    assert!(drain(&rx).iter().any(|e| matches!(
        e,
        Event::WormholeRestored { source, target: None, .. } if source == &NodeId::from("n1")
    )));
}

#[test]
fn target_marker_on_a_child_node_is_still_found() {
    let dir = temp_dir();
    let (a, b, target) = linked_pair(dir.path(), "B.map", &[]);
    let mut doc = load(&b);
    let marker = doc.wormhole_markers()[0].1.clone();
    doc.find_node_mut(&target)
        .unwrap()
        .children
        .push(MapNode::with_id(NodeId::from("c1"), "Child"));
    doc.reparent_marker(&marker, &NodeId::from("c1")).unwrap();
    TomlMapStore::new().save(&doc, &b).unwrap();

    let (mut session, _rx) = open_session(&ScriptedHost::new());
    session.open_map(&a).unwrap();
    assert_eq!(session.wormholes().len(), 1);
    let wormhole = &session.wormholes()[0];
    assert!(!wormhole.is_one_sided());
    assert_eq!(wormhole.target_node(), Some(&target));
    assert_eq!(wormhole.target_marker(), Some(&marker));
}
