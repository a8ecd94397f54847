//! Focus-bound side effects.
//!
//! A [`FocusScope`] pairs a producer with the teardown it returns. The producer runs when the
//! owning screen becomes the navigation-active one; the teardown runs when it stops being so,
//! or when the screen unmounts. A teardown never runs twice.

use std::fmt;
use std::sync::Arc;

use super::bus::{RemoteEventBus, Subscriber};

pub type Teardown = Box<dyn FnOnce() + Send>;

type Producer = Box<dyn FnMut() -> Option<Teardown> + Send>;

pub struct FocusScope {
    owner: String,
    producer: Producer,
    teardown: Option<Teardown>,
    active: bool,
}

impl FocusScope {
    pub fn new<F>(owner: impl Into<String>, producer: F) -> Self
    where
        F: FnMut() -> Option<Teardown> + Send + 'static,
    {
        Self {
            owner: owner.into(),
            producer: Box::new(producer),
            teardown: None,
            active: false,
        }
    }

    /// Subscribe `subscriber` to `bus` while the owner is focused.
    pub fn listener(owner: impl Into<String>, bus: Arc<RemoteEventBus>, subscriber: Subscriber) -> Self {
        Self::new(owner, move || {
            bus.add_event_listener(subscriber.clone());
            let bus = Arc::clone(&bus);
            let subscriber = subscriber.clone();
            Some(Box::new(move || {
                bus.remove_event_listener(&subscriber);
            }) as Teardown)
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_focused(&mut self, focused: bool) {
        match (focused, self.active) {
            (true, false) => {
                self.teardown = (self.producer)();
                self.active = true;
            }
            (false, true) => self.release(),
            _ => {}
        }
    }

    /// Run any pending teardown. The scope stays usable and re-arms on the next focus gain.
    pub fn unmount(&mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.active = false;
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }
}

impl Drop for FocusScope {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for FocusScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusScope")
            .field("owner", &self.owner)
            .field("active", &self.active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{RemoteEvent, RemoteEventKind, ScriptedSource};
    use crate::runtime::bus::BusConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_scope(produced: Arc<AtomicUsize>, torn: Arc<AtomicUsize>) -> FocusScope {
        FocusScope::new("home", move || {
            produced.fetch_add(1, Ordering::SeqCst);
            let torn = Arc::clone(&torn);
            Some(Box::new(move || {
                torn.fetch_add(1, Ordering::SeqCst);
            }) as Teardown)
        })
    }

    #[test]
    fn teardown_runs_once_per_focus_loss() {
        let produced = Arc::new(AtomicUsize::new(0));
        let torn = Arc::new(AtomicUsize::new(0));
        let mut scope = counting_scope(produced.clone(), torn.clone());

        scope.set_focused(true);
        scope.set_focused(true);
        assert_eq!(produced.load(Ordering::SeqCst), 1);
        scope.set_focused(false);
        scope.set_focused(false);
        assert_eq!(torn.load(Ordering::SeqCst), 1);

        scope.set_focused(true);
        assert_eq!(produced.load(Ordering::SeqCst), 2);
        scope.unmount();
        drop(scope);
        assert_eq!(torn.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn drop_releases_pending_teardown() {
        let produced = Arc::new(AtomicUsize::new(0));
        let torn = Arc::new(AtomicUsize::new(0));
        {
            let mut scope = counting_scope(produced.clone(), torn.clone());
            scope.set_focused(true);
        }
        assert_eq!(torn.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn producer_without_teardown_is_fine() {
        let mut scope = FocusScope::new("plain", || None);
        scope.set_focused(true);
        assert!(scope.is_active());
        scope.set_focused(false);
        assert!(!scope.is_active());
    }

    #[test]
    fn listener_scope_follows_focus() {
        let bus = Arc::new(RemoteEventBus::new(
            Box::new(ScriptedSource::new()),
            BusConfig::default(),
        ));
        bus.init().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let subscriber = Subscriber::from_fn(move |_event: &RemoteEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let mut scope = FocusScope::listener("home", Arc::clone(&bus), subscriber);

        bus.dispatch(&RemoteEvent::new(RemoteEventKind::Select)).unwrap();
        scope.set_focused(true);
        bus.dispatch(&RemoteEvent::new(RemoteEventKind::Select)).unwrap();
        scope.set_focused(false);
        bus.dispatch(&RemoteEvent::new(RemoteEventKind::Select)).unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(), 0);
    }
}
