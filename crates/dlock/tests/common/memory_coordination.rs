//! In-memory coordination service with sequential nodes and delete watches.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dlock_core::coord::CoordinationService;
use dlock_core::error::LockResult;
use tokio::sync::oneshot;

#[derive(Default)]
struct State {
    nodes: BTreeSet<String>,
    next_sequence: u64,
    watchers: HashMap<String, Vec<oneshot::Sender<()>>>,
}

/// Single-process stand-in for a hierarchical coordination service.
///
/// Sequence numbers come from one global counter, so siblings created
/// through different handles still order correctly.
#[derive(Default)]
pub struct MemoryCoordination {
    state: Mutex<State>,
}

impl MemoryCoordination {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn notify(state: &mut State, path: &str) {
        if let Some(senders) = state.watchers.remove(path) {
            for sender in senders {
                let _ = sender.send(());
            }
        }
    }

    /// Drops `path` as if the owning session had been lost, firing any
    /// delete watches.
    pub fn expire_node(&self, path: &str) {
        let mut state = self.state.lock().unwrap();
        if state.nodes.remove(path) {
            Self::notify(&mut state, path);
        }
    }

    /// Whether `path` currently exists.
    pub fn node_exists(&self, path: &str) -> bool {
        self.state.lock().unwrap().nodes.contains(path)
    }
}

#[async_trait]
impl CoordinationService for MemoryCoordination {
    async fn exists(&self, path: &str) -> LockResult<bool> {
        Ok(self.node_exists(path))
    }

    async fn create_persistent(&self, path: &str) -> LockResult<()> {
        self.state.lock().unwrap().nodes.insert(path.to_string());
        Ok(())
    }

    async fn create_ephemeral_sequential(&self, prefix: &str) -> LockResult<String> {
        let mut state = self.state.lock().unwrap();
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        let path = format!("{prefix}{sequence:010}");
        state.nodes.insert(path.clone());
        Ok(path)
    }

    async fn children(&self, path: &str) -> LockResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        let prefix = format!("{path}/");
        Ok(state
            .nodes
            .iter()
            .filter_map(|node| node.strip_prefix(&prefix))
            .filter(|name| !name.contains('/'))
            .map(str::to_string)
            .collect())
    }

    async fn watch_delete(&self, path: &str) -> LockResult<Option<oneshot::Receiver<()>>> {
        let mut state = self.state.lock().unwrap();
        if !state.nodes.contains(path) {
            return Ok(None);
        }
        let (sender, receiver) = oneshot::channel();
        state.watchers.entry(path.to_string()).or_default().push(sender);
        Ok(Some(receiver))
    }

    async fn delete(&self, path: &str) -> LockResult<bool> {
        let mut state = self.state.lock().unwrap();
        let removed = state.nodes.remove(path);
        if removed {
            Self::notify(&mut state, path);
        }
        Ok(removed)
    }
}
