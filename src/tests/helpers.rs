//! Shared test utilities for session and wormhole testing

use crate::{
    config::WormholeConfig,
    host::{TargetChoice, WormholeHost},
    map::{MapDocument, MapHandle, MapNode, MapStore, TomlMapStore},
    properties::NodeId,
    session::MapSession,
};
use parking_lot::Mutex;
use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Host answering from queues the test fills up front. Every call is appended to `log`.
#[derive(Default)]
pub struct ScriptedHost {
    pub targets: Mutex<VecDeque<TargetChoice>>,
    pub save_paths: Mutex<VecDeque<PathBuf>>,
    pub log: Arc<Mutex<Vec<String>>>,
}

impl WormholeHost for ScriptedHost {
    fn choose_target_map(&self, _current: &MapHandle) -> Option<TargetChoice> {
        self.log.lock().push("choose_target_map".to_string());
        self.targets.lock().pop_front()
    }

    fn choose_save_path(&self, map: &MapDocument) -> Option<PathBuf> {
        self.log.lock().push(format!("choose_save_path {}", map.label));
        self.save_paths.lock().pop_front()
    }

    fn redisplay(&self, path: &Path) {
        self.log.lock().push(format!("redisplay {}", path.display()));
    }
}

/// Write a map holding one top-level node per `(id, label)` pair.
pub fn write_test_map(path: &Path, nodes: &[(&str, &str)]) -> PathBuf {
    let mut map = MapDocument::new(
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default(),
    );
    for (id, label) in nodes {
        map.add_node(MapNode::with_id(NodeId::from(*id), *label));
    }
    TomlMapStore::new().save(&map, path).unwrap();
    path.to_path_buf()
}

/// A session over the TOML store with default configuration.
pub fn test_session(host: ScriptedHost) -> MapSession {
    init_logging();
    MapSession::new(
        Box::new(TomlMapStore::new()),
        Box::new(host),
        WormholeConfig::default(),
    )
}
