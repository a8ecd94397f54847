use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;

use crate::error::{FocusError, Result};
use crate::input::NodeHandle;
use crate::logging::{LogLevel, emit, json_kv};
use crate::registry::{NodeId, NodeMapping};

use super::Services;
use super::back::NavigationBack;
use super::focus::{DirectionalFocusGuard, NeighborMap};
use super::scope::FocusScope;

/// Factory type responsible for creating a fresh [`Screen`] instance.
pub type ScreenFactory = Arc<dyn Fn() -> Box<dyn Screen> + Send + Sync>;

/// Declarative screen definition registered with the [`ScreenStack`].
pub struct ScreenDefinition {
    pub id: String,
    pub title: String,
    pub factory: ScreenFactory,
}

impl ScreenDefinition {
    pub fn new(id: impl Into<String>, title: impl Into<String>, factory: ScreenFactory) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            factory,
        }
    }
}

/// Lifecycle events emitted around screen activation/deactivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenLifecycleEvent {
    WillAppear,
    DidAppear,
    WillDisappear,
    DidDisappear,
}

/// Contract implemented by every navigable screen.
///
/// A screen publishes its focusable controls as a complete snapshot and hands back the focus
/// scopes whose side effects should only run while it is on top.
pub trait Screen: Send {
    fn focusable_nodes(&self) -> NodeMapping;

    /// Exit sentinel contributed by this screen. `None` keeps whatever is registered.
    fn exit_node(&self) -> Option<NodeHandle> {
        None
    }

    fn neighbors(&self) -> Option<Arc<dyn NeighborMap>> {
        None
    }

    fn guards(&self) -> Vec<(NodeId, Arc<DirectionalFocusGuard>)> {
        Vec::new()
    }

    fn initial_focus(&self) -> Option<NodeId> {
        None
    }

    fn mount(&mut self, _services: &Services) -> Result<Vec<FocusScope>> {
        Ok(Vec::new())
    }

    fn on_lifecycle(&mut self, _event: ScreenLifecycleEvent) -> Result<()> {
        Ok(())
    }
}

struct MountedScreen {
    id: String,
    screen: Box<dyn Screen>,
    scopes: Vec<FocusScope>,
}

impl MountedScreen {
    fn set_focused(&mut self, focused: bool) {
        for scope in self.scopes.iter_mut() {
            scope.set_focused(focused);
        }
    }
}

/// Navigation container: a stack of mounted screens, the top one being navigation-active.
pub struct ScreenStack {
    definitions: HashMap<String, ScreenDefinition>,
    stack: Vec<MountedScreen>,
    services: Services,
}

impl ScreenStack {
    pub fn new(services: Services) -> Self {
        Self {
            definitions: HashMap::new(),
            stack: Vec::new(),
            services,
        }
    }

    pub fn register_screen(&mut self, definition: ScreenDefinition) {
        self.definitions.insert(definition.id.clone(), definition);
    }

    pub fn active_id(&self) -> Option<&str> {
        self.stack.last().map(|screen| screen.id.as_str())
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn title(&self, id: &str) -> Option<&str> {
        self.definitions
            .get(id)
            .map(|definition| definition.title.as_str())
    }

    pub fn push(&mut self, screen_id: &str) -> Result<()> {
        let definition = self
            .definitions
            .get(screen_id)
            .ok_or_else(|| FocusError::ScreenNotFound(screen_id.to_string()))?;
        let factory = Arc::clone(&definition.factory);

        if let Some(active) = self.stack.last_mut() {
            active
                .screen
                .on_lifecycle(ScreenLifecycleEvent::WillDisappear)?;
        }

        let mut screen = factory();
        screen.on_lifecycle(ScreenLifecycleEvent::WillAppear)?;
        let scopes = screen.mount(&self.services)?;

        if let Some(previous) = self.stack.last_mut() {
            previous.set_focused(false);
            previous
                .screen
                .on_lifecycle(ScreenLifecycleEvent::DidDisappear)?;
        }

        self.stack.push(MountedScreen {
            id: screen_id.to_string(),
            screen,
            scopes,
        });
        self.activate_top("push")
    }

    /// Pop the top screen. The root screen is never popped.
    pub fn pop(&mut self) -> Result<bool> {
        if self.stack.len() <= 1 {
            return Ok(false);
        }
        let Some(mut leaving) = self.stack.pop() else {
            return Ok(false);
        };
        leaving
            .screen
            .on_lifecycle(ScreenLifecycleEvent::WillDisappear)?;
        if let Some(next) = self.stack.last_mut() {
            next.screen.on_lifecycle(ScreenLifecycleEvent::WillAppear)?;
        }
        for scope in leaving.scopes.iter_mut() {
            scope.unmount();
        }
        leaving
            .screen
            .on_lifecycle(ScreenLifecycleEvent::DidDisappear)?;

        self.activate_top("pop")?;
        Ok(true)
    }

    /// Tear every screen down, top first.
    pub fn unmount_all(&mut self) -> Result<()> {
        while let Some(mut screen) = self.stack.pop() {
            screen
                .screen
                .on_lifecycle(ScreenLifecycleEvent::WillDisappear)?;
            for scope in screen.scopes.iter_mut() {
                scope.unmount();
            }
            screen
                .screen
                .on_lifecycle(ScreenLifecycleEvent::DidDisappear)?;
        }
        self.services.navigator.reset();
        Ok(())
    }

    fn activate_top(&mut self, transition: &str) -> Result<()> {
        let services = self.services.clone();
        let depth = self.stack.len();
        let Some(top) = self.stack.last_mut() else {
            return Ok(());
        };

        let nodes = top.screen.focusable_nodes();
        let node_count = nodes.len();
        services.registry.set_nodes(nodes);
        if let Some(exit) = top.screen.exit_node() {
            services.registry.set_exit_node(exit);
        }

        let navigator = &services.navigator;
        navigator.reset();
        if let Some(neighbors) = top.screen.neighbors() {
            navigator.set_neighbors(neighbors);
        }
        for (id, guard) in top.screen.guards() {
            navigator.attach_guard(id, guard);
        }
        if let Some(initial) = top.screen.initial_focus() {
            navigator.focus(&initial);
        }

        top.set_focused(true);
        top.screen.on_lifecycle(ScreenLifecycleEvent::DidAppear)?;

        emit(
            services.logger(),
            LogLevel::Info,
            "tenfoot::screens",
            "screen_activated",
            [
                json_kv("screen", json!(top.id)),
                json_kv("transition", json!(transition)),
                json_kv("nodes", json!(node_count)),
                json_kv("depth", json!(depth)),
            ],
        );
        Ok(())
    }
}

impl NavigationBack for ScreenStack {
    fn go_back(&mut self) -> Result<bool> {
        self.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{Direction, RemoteEvent, RemoteEventKind, ScriptedSource};
    use crate::registry::{FocusableNode, node_mapping};
    use crate::runtime::RuntimeConfig;
    use crate::runtime::bus::Subscriber;
    use crate::runtime::focus::{FocusTarget, StaticNeighbors};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Journal = Arc<Mutex<Vec<(String, ScreenLifecycleEvent)>>>;

    struct TestScreen {
        name: &'static str,
        nodes: Vec<(&'static str, u64)>,
        journal: Journal,
        hits: Arc<AtomicUsize>,
    }

    impl Screen for TestScreen {
        fn focusable_nodes(&self) -> NodeMapping {
            node_mapping(
                self.nodes
                    .iter()
                    .map(|(id, raw)| FocusableNode::new(*id, NodeHandle::new(*raw))),
            )
        }

        fn neighbors(&self) -> Option<Arc<dyn NeighborMap>> {
            let [(first, _), (second, _)] = self.nodes.as_slice() else {
                return None;
            };
            Some(Arc::new(StaticNeighbors::new().link_pair(
                first,
                Direction::Down,
                second,
            )))
        }

        fn initial_focus(&self) -> Option<NodeId> {
            self.nodes.first().map(|(id, _)| id.to_string())
        }

        fn mount(&mut self, services: &Services) -> Result<Vec<FocusScope>> {
            let hits = Arc::clone(&self.hits);
            let subscriber = Subscriber::from_fn(move |_event: &RemoteEvent| {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
            Ok(vec![FocusScope::listener(
                self.name,
                Arc::clone(&services.bus),
                subscriber,
            )])
        }

        fn on_lifecycle(&mut self, event: ScreenLifecycleEvent) -> Result<()> {
            self.journal
                .lock()
                .unwrap()
                .push((self.name.to_string(), event));
            Ok(())
        }
    }

    fn definition(
        name: &'static str,
        nodes: Vec<(&'static str, u64)>,
        journal: &Journal,
        hits: &Arc<AtomicUsize>,
    ) -> ScreenDefinition {
        let journal = Arc::clone(journal);
        let hits = Arc::clone(hits);
        ScreenDefinition::new(
            name,
            name.to_uppercase(),
            Arc::new(move || {
                Box::new(TestScreen {
                    name,
                    nodes: nodes.clone(),
                    journal: Arc::clone(&journal),
                    hits: Arc::clone(&hits),
                }) as Box<dyn Screen>
            }),
        )
    }

    fn fixture() -> (ScreenStack, Services, Journal, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let services = Services::with_config(
            Box::new(ScriptedSource::new()),
            &RuntimeConfig::default(),
        );
        services.bus.init().unwrap();
        let journal: Journal = Arc::default();
        let home_hits = Arc::new(AtomicUsize::new(0));
        let detail_hits = Arc::new(AtomicUsize::new(0));
        let mut stack = ScreenStack::new(services.clone());
        stack.register_screen(definition(
            "home",
            vec![("rail", 1), ("menu", 2)],
            &journal,
            &home_hits,
        ));
        stack.register_screen(definition(
            "detail",
            vec![("play", 10)],
            &journal,
            &detail_hits,
        ));
        (stack, services, journal, home_hits, detail_hits)
    }

    #[test]
    fn unknown_screen_is_an_error() {
        let (mut stack, ..) = fixture();
        assert!(matches!(
            stack.push("missing"),
            Err(FocusError::ScreenNotFound(id)) if id == "missing"
        ));
    }

    #[test]
    fn transitions_replace_the_node_snapshot() {
        let (mut stack, services, ..) = fixture();
        stack.push("home").unwrap();
        assert_eq!(services.registry.resolve("rail"), Some(NodeHandle::new(1)));
        assert_eq!(
            services.navigator.focused(),
            Some(FocusTarget::Node("rail".into()))
        );

        stack.push("detail").unwrap();
        assert_eq!(services.registry.resolve("rail"), None);
        assert_eq!(services.registry.resolve("play"), Some(NodeHandle::new(10)));
        assert_eq!(stack.active_id(), Some("detail"));

        assert!(stack.go_back().unwrap());
        assert_eq!(services.registry.resolve("play"), None);
        assert_eq!(services.registry.resolve("menu"), Some(NodeHandle::new(2)));
        assert!(!stack.go_back().unwrap());
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn only_the_top_screen_receives_remote_events() {
        let (mut stack, services, _journal, home_hits, detail_hits) = fixture();
        let select = RemoteEvent::new(RemoteEventKind::Select);

        stack.push("home").unwrap();
        services.bus.dispatch(&select).unwrap();
        stack.push("detail").unwrap();
        services.bus.dispatch(&select).unwrap();
        stack.pop().unwrap();
        services.bus.dispatch(&select).unwrap();

        assert_eq!(home_hits.load(Ordering::SeqCst), 2);
        assert_eq!(detail_hits.load(Ordering::SeqCst), 1);
        assert_eq!(services.bus.listener_count(), 1);

        stack.unmount_all().unwrap();
        assert_eq!(services.bus.listener_count(), 0);
        assert_eq!(stack.active_id(), None);
    }

    #[test]
    fn lifecycle_order_on_push() {
        let (mut stack, _services, journal, ..) = fixture();
        stack.push("home").unwrap();
        stack.push("detail").unwrap();

        let journal = journal.lock().unwrap();
        let expected = vec![
            ("home".to_string(), ScreenLifecycleEvent::WillAppear),
            ("home".to_string(), ScreenLifecycleEvent::DidAppear),
            ("home".to_string(), ScreenLifecycleEvent::WillDisappear),
            ("detail".to_string(), ScreenLifecycleEvent::WillAppear),
            ("home".to_string(), ScreenLifecycleEvent::DidDisappear),
            ("detail".to_string(), ScreenLifecycleEvent::DidAppear),
        ];
        assert_eq!(*journal, expected);
    }
}
