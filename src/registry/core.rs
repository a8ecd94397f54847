use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use blake3::Hash;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::input::{Direction, NodeHandle};
use crate::logging::{LogLevel, Logger, emit, json_kv};
use crate::metrics::{SharedMetrics, record};
use crate::runtime::audit::{
    NullRuntimeAudit, RuntimeAudit, RuntimeAuditEventBuilder, RuntimeAuditStage,
};

pub type NodeId = String;

/// Complete id → node set for one mounted screen.
pub type NodeMapping = HashMap<NodeId, FocusableNode>;

/// Which directions focus may leave a control in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovePermissions {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl Default for MovePermissions {
    fn default() -> Self {
        Self {
            up: true,
            down: true,
            left: true,
            right: true,
        }
    }
}

impl MovePermissions {
    /// Every direction suppressed; focus can only leave through a shortcut.
    pub const fn locked() -> Self {
        Self {
            up: false,
            down: false,
            left: false,
            right: false,
        }
    }

    pub fn allows(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => self.up,
            Direction::Down => self.down,
            Direction::Left => self.left,
            Direction::Right => self.right,
        }
    }

    pub fn with(mut self, direction: Direction, allowed: bool) -> Self {
        match direction {
            Direction::Up => self.up = allowed,
            Direction::Down => self.down = allowed,
            Direction::Left => self.left = allowed,
            Direction::Right => self.right = allowed,
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusableNode {
    pub id: NodeId,
    pub handle: NodeHandle,
    pub moves: MovePermissions,
}

impl FocusableNode {
    pub fn new(id: impl Into<NodeId>, handle: NodeHandle) -> Self {
        Self {
            id: id.into(),
            handle,
            moves: MovePermissions::default(),
        }
    }

    pub fn with_moves(mut self, moves: MovePermissions) -> Self {
        self.moves = moves;
        self
    }
}

/// Build a mapping from nodes, keyed by their ids. Later duplicates win.
pub fn node_mapping<I>(nodes: I) -> NodeMapping
where
    I: IntoIterator<Item = FocusableNode>,
{
    nodes
        .into_iter()
        .map(|node| (node.id.clone(), node))
        .collect()
}

#[derive(Debug, Default)]
struct RegistryState {
    nodes: NodeMapping,
    fingerprint: Option<Hash>,
    exit: Option<NodeHandle>,
    generation: u64,
}

/// Index of the focusable controls of the mounted screen plus the exit sentinel.
///
/// The registry never owns UI elements; it maps stable ids to the handles the rendering layer
/// issued. Every `set_nodes` replaces the whole snapshot, so ids from a previous screen stop
/// resolving the moment the next screen publishes its set.
pub struct NodeRegistry {
    inner: RwLock<RegistryState>,
    logger: Option<Logger>,
    metrics: Option<SharedMetrics>,
    audit: Arc<dyn RuntimeAudit>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self {
            inner: RwLock::new(RegistryState::default()),
            logger: None,
            metrics: None,
            audit: Arc::new(NullRuntimeAudit),
        }
    }
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn RuntimeAudit>) -> Self {
        self.audit = audit;
        self
    }

    pub fn set_nodes(&self, nodes: NodeMapping) {
        let fingerprint = fingerprint_of(&nodes);
        let count = nodes.len();
        let (generation, unchanged) = match self.inner.write() {
            Ok(mut guard) => {
                let unchanged = guard.fingerprint == Some(fingerprint);
                guard.nodes = nodes;
                guard.fingerprint = Some(fingerprint);
                guard.generation = guard.generation.wrapping_add(1);
                (guard.generation, unchanged)
            }
            Err(_) => return,
        };

        record(self.metrics.as_ref(), |m| m.record_node_snapshot());
        let mut audit = RuntimeAuditEventBuilder::new(RuntimeAuditStage::NodesReplaced);
        audit
            .detail("nodes", json!(count))
            .detail("generation", json!(generation));
        self.audit.record(audit.finish());
        emit(
            self.logger.as_ref(),
            LogLevel::Debug,
            "tenfoot::registry",
            "nodes_replaced",
            [
                json_kv("nodes", json!(count)),
                json_kv("generation", json!(generation)),
                json_kv("unchanged", json!(unchanged)),
            ],
        );
    }

    pub fn set_exit_node(&self, handle: NodeHandle) {
        if let Ok(mut guard) = self.inner.write() {
            guard.exit = Some(handle);
        }
        emit(
            self.logger.as_ref(),
            LogLevel::Debug,
            "tenfoot::registry",
            "exit_node_set",
            [json_kv("handle", json!(handle.raw()))],
        );
    }

    pub fn clear_exit_node(&self) {
        if let Ok(mut guard) = self.inner.write() {
            guard.exit = None;
        }
    }

    /// Drop the snapshot and the exit sentinel when the owning container unmounts.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.inner.write() {
            guard.nodes.clear();
            guard.fingerprint = None;
            guard.exit = None;
            guard.generation = guard.generation.wrapping_add(1);
        }
    }

    pub fn nodes(&self) -> NodeMapping {
        self.inner
            .read()
            .map(|guard| guard.nodes.clone())
            .unwrap_or_default()
    }

    pub fn node(&self, id: &str) -> Option<FocusableNode> {
        self.inner
            .read()
            .ok()
            .and_then(|guard| guard.nodes.get(id).cloned())
    }

    pub fn resolve(&self, id: &str) -> Option<NodeHandle> {
        self.node(id).map(|node| node.handle)
    }

    pub fn find_by_handle(&self, handle: NodeHandle) -> Option<FocusableNode> {
        self.inner.read().ok().and_then(|guard| {
            guard
                .nodes
                .values()
                .find(|node| node.handle == handle)
                .cloned()
        })
    }

    pub fn exit_node(&self) -> Option<NodeHandle> {
        self.inner.read().ok().and_then(|guard| guard.exit)
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|guard| guard.nodes.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bumped on every replacement or clear.
    pub fn generation(&self) -> u64 {
        self.inner.read().map(|guard| guard.generation).unwrap_or(0)
    }

    /// Content hash of the current snapshot, `None` before the first `set_nodes`.
    pub fn fingerprint(&self) -> Option<Hash> {
        self.inner.read().ok().and_then(|guard| guard.fingerprint)
    }
}

fn fingerprint_of(nodes: &NodeMapping) -> Hash {
    let mut sorted: Vec<&FocusableNode> = nodes.values().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let mut hasher = blake3::Hasher::new();
    for node in sorted {
        hasher.update(node.id.as_bytes());
        hasher.update(&[0]);
        hasher.update(&node.handle.raw().to_le_bytes());
        let moves = node.moves;
        hasher.update(&[
            moves.up as u8,
            moves.down as u8,
            moves.left as u8,
            moves.right as u8,
        ]);
    }
    hasher.finalize()
}
