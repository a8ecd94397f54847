use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use serde_json::json;

use crate::error::Result;
use crate::input::{Direction, NodeHandle, RemoteEvent, RemoteEventKind};
use crate::logging::{LogLevel, Logger, emit, json_kv};
use crate::registry::{FocusableNode, MovePermissions, NodeId, NodeRegistry};

use super::bus::RemoteListener;

/// Neighbor-map id of the exit sentinel.
pub const EXIT_NODE_ID: &str = "__exit";

pub type FocusCallback = Box<dyn Fn(bool) + Send + Sync>;

/// Per-control movement contract.
///
/// The guard owns the control's direction flags and its focused flag. It never touches the
/// node registry: the owning screen publishes [`DirectionalFocusGuard::node`] as part of its
/// snapshot and the focus engine reads the flags from there.
pub struct DirectionalFocusGuard {
    handle: NodeHandle,
    moves: MovePermissions,
    focused: AtomicBool,
    on_focus_change: Option<FocusCallback>,
}

impl DirectionalFocusGuard {
    pub fn new(handle: NodeHandle, moves: MovePermissions) -> Self {
        Self {
            handle,
            moves,
            focused: AtomicBool::new(false),
            on_focus_change: None,
        }
    }

    /// Called with `true` on focus and `false` on blur, for visual state only.
    pub fn with_focus_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.on_focus_change = Some(Box::new(callback));
        self
    }

    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    pub fn permissions(&self) -> MovePermissions {
        self.moves
    }

    pub fn can_move(&self, direction: Direction) -> bool {
        self.moves.allows(direction)
    }

    pub fn node(&self, id: impl Into<NodeId>) -> FocusableNode {
        FocusableNode::new(id, self.handle).with_moves(self.moves)
    }

    pub fn is_focused(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }

    pub fn focus(&self) {
        self.transition(true);
    }

    pub fn blur(&self) {
        self.transition(false);
    }

    fn transition(&self, focused: bool) {
        if self.focused.swap(focused, Ordering::SeqCst) == focused {
            return;
        }
        if let Some(callback) = self.on_focus_change.as_ref() {
            callback(focused);
        }
    }
}

impl fmt::Debug for DirectionalFocusGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectionalFocusGuard")
            .field("handle", &self.handle)
            .field("moves", &self.moves)
            .field("focused", &self.is_focused())
            .finish()
    }
}

pub type ShortcutAction = Arc<dyn Fn() + Send + Sync>;

/// Global shortcut bound to a guarded control, e.g. the "jump to top" strip above a rail.
///
/// Fires on `gesture` no matter which element the event targets, and on a d-pad press in
/// `direction` targeted at the guarded control, which only reaches it while the control is
/// focused at the end of the reachable chain. Both paths run the same action, and ordinary
/// listeners on the bus still see the same event.
pub struct ShortcutAffordance {
    name: String,
    guard: Arc<DirectionalFocusGuard>,
    gesture: RemoteEventKind,
    direction: Direction,
    action: ShortcutAction,
    fired: AtomicUsize,
}

impl ShortcutAffordance {
    pub fn new<F>(
        name: impl Into<String>,
        guard: Arc<DirectionalFocusGuard>,
        gesture: RemoteEventKind,
        direction: Direction,
        action: F,
    ) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            guard,
            gesture,
            direction,
            action: Arc::new(action),
            fired: AtomicUsize::new(0),
        }
    }

    /// Swipe-up anywhere, or up on the guarded control.
    pub fn jump_to_top<F>(guard: Arc<DirectionalFocusGuard>, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::new(
            "shortcut.jump_to_top",
            guard,
            RemoteEventKind::SwipeUp,
            Direction::Up,
            action,
        )
    }

    pub fn guard(&self) -> &Arc<DirectionalFocusGuard> {
        &self.guard
    }

    pub fn matches(&self, event: &RemoteEvent) -> bool {
        if event.kind() == self.gesture {
            return true;
        }
        event.kind().direction() == Some(self.direction)
            && event.is_targeted_at(self.guard.handle())
    }

    pub fn fired(&self) -> usize {
        self.fired.load(Ordering::SeqCst)
    }
}

impl RemoteListener for ShortcutAffordance {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_event(&self, event: &RemoteEvent) -> Result<()> {
        if self.matches(event) {
            self.fired.fetch_add(1, Ordering::SeqCst);
            (self.action)();
        }
        Ok(())
    }
}

/// Layout knowledge the focus engine needs: which control lies in a given direction.
pub trait NeighborMap: Send + Sync {
    fn neighbor(&self, from: &str, direction: Direction) -> Option<NodeId>;
}

/// Explicit edge table.
#[derive(Debug, Default, Clone)]
pub struct StaticNeighbors {
    edges: HashMap<(NodeId, Direction), NodeId>,
}

impl StaticNeighbors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn link(mut self, from: &str, direction: Direction, to: &str) -> Self {
        self.edges
            .insert((from.to_string(), direction), to.to_string());
        self
    }

    /// Link `first` → `second` in `direction` and back in the opposite direction.
    pub fn link_pair(self, first: &str, direction: Direction, second: &str) -> Self {
        let back = match direction {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        };
        self.link(first, direction, second).link(second, back, first)
    }
}

impl NeighborMap for StaticNeighbors {
    fn neighbor(&self, from: &str, direction: Direction) -> Option<NodeId> {
        self.edges.get(&(from.to_string(), direction)).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusTarget {
    Node(NodeId),
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { from: FocusTarget, to: FocusTarget },
    /// The focused control forbids the direction; focus stays.
    Suppressed(FocusTarget),
    /// Nothing lies in that direction; focus stays.
    Boundary(FocusTarget),
    /// Nothing is focused (or the focused node left the snapshot).
    Unfocused,
}

/// Resolves d-pad movement against the registry snapshot, standing in for the platform
/// focus engine.
pub struct FocusNavigator {
    registry: Arc<NodeRegistry>,
    neighbors: RwLock<Arc<dyn NeighborMap>>,
    current: Mutex<Option<FocusTarget>>,
    guards: Mutex<HashMap<NodeId, Arc<DirectionalFocusGuard>>>,
    logger: Option<Logger>,
}

impl FocusNavigator {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            neighbors: RwLock::new(Arc::new(StaticNeighbors::new())),
            current: Mutex::new(None),
            guards: Mutex::new(HashMap::new()),
            logger: None,
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn set_neighbors(&self, neighbors: Arc<dyn NeighborMap>) {
        if let Ok(mut guard) = self.neighbors.write() {
            *guard = neighbors;
        }
    }

    /// Route focus/blur notifications for `id` to `guard`.
    pub fn attach_guard(&self, id: impl Into<NodeId>, guard: Arc<DirectionalFocusGuard>) {
        self.lock_guards().insert(id.into(), guard);
    }

    pub fn detach_guard(&self, id: &str) -> bool {
        self.lock_guards().remove(id).is_some()
    }

    /// Forget focus and guards, typically on a screen transition.
    pub fn reset(&self) {
        let previous = self.lock_current().take();
        if let Some(previous) = previous.as_ref() {
            self.notify(previous, false);
        }
        self.lock_guards().clear();
    }

    /// Focus a registered node. Unknown ids are a miss and leave focus unchanged.
    pub fn focus(&self, id: &str) -> bool {
        if self.registry.node(id).is_none() {
            return false;
        }
        self.set_current(FocusTarget::Node(id.to_string()));
        true
    }

    /// Focus the exit sentinel, if one is registered.
    pub fn focus_exit(&self) -> bool {
        if self.registry.exit_node().is_none() {
            return false;
        }
        self.set_current(FocusTarget::Exit);
        true
    }

    pub fn focused(&self) -> Option<FocusTarget> {
        self.lock_current().clone()
    }

    pub fn focused_handle(&self) -> Option<NodeHandle> {
        match self.focused()? {
            FocusTarget::Node(id) => self.registry.resolve(&id),
            FocusTarget::Exit => self.registry.exit_node(),
        }
    }

    pub fn move_focus(&self, direction: Direction) -> MoveOutcome {
        let Some(current) = self.focused() else {
            return MoveOutcome::Unfocused;
        };

        let from_id = match &current {
            FocusTarget::Node(id) => {
                let Some(node) = self.registry.node(id) else {
                    self.lock_current().take();
                    return MoveOutcome::Unfocused;
                };
                if !node.moves.allows(direction) {
                    self.log_move(&current, direction, "suppressed");
                    return MoveOutcome::Suppressed(current);
                }
                id.clone()
            }
            FocusTarget::Exit => EXIT_NODE_ID.to_string(),
        };

        let next = self
            .neighbors
            .read()
            .ok()
            .and_then(|map| map.neighbor(&from_id, direction))
            .and_then(|id| self.target_for(&id));

        match next {
            Some(to) => {
                self.set_current(to.clone());
                self.log_move(&to, direction, "moved");
                MoveOutcome::Moved { from: current, to }
            }
            None => {
                self.log_move(&current, direction, "boundary");
                MoveOutcome::Boundary(current)
            }
        }
    }

    fn target_for(&self, id: &str) -> Option<FocusTarget> {
        if id == EXIT_NODE_ID {
            return self.registry.exit_node().map(|_| FocusTarget::Exit);
        }
        self.registry
            .node(id)
            .map(|node| FocusTarget::Node(node.id))
    }

    fn set_current(&self, target: FocusTarget) {
        let previous = self.lock_current().replace(target.clone());
        if previous.as_ref() == Some(&target) {
            return;
        }
        if let Some(previous) = previous.as_ref() {
            self.notify(previous, false);
        }
        self.notify(&target, true);
    }

    fn notify(&self, target: &FocusTarget, focused: bool) {
        let FocusTarget::Node(id) = target else {
            return;
        };
        let guard = self.lock_guards().get(id).cloned();
        if let Some(guard) = guard {
            if focused {
                guard.focus();
            } else {
                guard.blur();
            }
        }
    }

    fn log_move(&self, target: &FocusTarget, direction: Direction, outcome: &str) {
        let label = match target {
            FocusTarget::Node(id) => id.as_str(),
            FocusTarget::Exit => EXIT_NODE_ID,
        };
        emit(
            self.logger.as_ref(),
            LogLevel::Trace,
            "tenfoot::focus",
            "focus_move",
            [
                json_kv("direction", json!(direction.as_str())),
                json_kv("outcome", json!(outcome)),
                json_kv("target", json!(label)),
            ],
        );
    }

    fn lock_current(&self) -> MutexGuard<'_, Option<FocusTarget>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_guards(&self) -> MutexGuard<'_, HashMap<NodeId, Arc<DirectionalFocusGuard>>> {
        self.guards
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
