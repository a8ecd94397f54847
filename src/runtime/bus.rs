//! Fan-out of hardware remote events to registered listeners.
//!
//! The bus is an explicitly constructed service owned by the application root and shared as
//! `Arc<RemoteEventBus>`. It attaches to one [`RemoteInputSource`] on [`RemoteEventBus::init`]
//! and detaches on [`RemoteEventBus::unmount`]; both are idempotent.
//!
//! Dispatch clones the subscriber list before invoking anyone and holds no lock while a
//! listener runs, so listeners may add or remove subscribers (themselves included) from
//! inside `on_event`. Those changes apply from the next event on.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::error::{FocusError, Result};
use crate::input::{RemoteEvent, RemoteEventKind, RemoteInputSource};
use crate::logging::{LogLevel, Logger, emit, json_kv};
use crate::metrics::{SharedMetrics, record};

use super::audit::{
    NullRuntimeAudit, RuntimeAudit, RuntimeAuditEventBuilder, RuntimeAuditStage, record_stage,
};

/// Receiver of remote events.
pub trait RemoteListener: Send + Sync {
    fn name(&self) -> &str {
        "remote_listener"
    }

    fn on_event(&self, event: &RemoteEvent) -> Result<()>;
}

impl<F> RemoteListener for F
where
    F: Fn(&RemoteEvent) -> Result<()> + Send + Sync,
{
    fn on_event(&self, event: &RemoteEvent) -> Result<()> {
        self(event)
    }
}

/// Identity-comparable handle to a listener.
///
/// Two subscribers are equal only when they wrap the same allocation, so registering one
/// subscriber twice yields two independent entries that a single remove takes out one at a
/// time.
#[derive(Clone)]
pub struct Subscriber {
    listener: Arc<dyn RemoteListener>,
}

impl Subscriber {
    pub fn new<L>(listener: L) -> Self
    where
        L: RemoteListener + 'static,
    {
        Self {
            listener: Arc::new(listener),
        }
    }

    /// Wrap a closure. Prefer this over [`Subscriber::new`] for closures so the argument type
    /// is inferred from the signature.
    pub fn from_fn<F>(listener: F) -> Self
    where
        F: Fn(&RemoteEvent) -> Result<()> + Send + Sync + 'static,
    {
        Self::new(listener)
    }

    pub fn from_arc(listener: Arc<dyn RemoteListener>) -> Self {
        Self { listener }
    }

    pub fn name(&self) -> &str {
        self.listener.name()
    }

    pub fn same(&self, other: &Subscriber) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.listener), Arc::as_ptr(&other.listener))
    }

    fn notify(&self, event: &RemoteEvent) -> Result<()> {
        self.listener.on_event(event)
    }
}

impl PartialEq for Subscriber {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Subscriber {}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("name", &self.name())
            .field("ptr", &Arc::as_ptr(&self.listener).cast::<()>())
            .finish()
    }
}

/// What happens to the rest of the fan-out when a listener fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerFailurePolicy {
    /// Stop at the failing listener and return its error.
    Abort,
    /// Record the failure and keep delivering to the remaining listeners.
    #[default]
    Isolate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    pub index: usize,
    pub listener: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub kind: RemoteEventKind,
    pub delivered: usize,
    pub failures: Vec<ListenerFailure>,
    /// The bus was detached and nobody saw the event.
    pub dropped: bool,
    /// Delivery stopped at the first failure (`Abort` policy).
    pub aborted: bool,
}

impl DispatchReport {
    fn new(kind: RemoteEventKind) -> Self {
        Self {
            kind,
            delivered: 0,
            failures: Vec::new(),
            dropped: false,
            aborted: false,
        }
    }

    fn dropped(kind: RemoteEventKind) -> Self {
        Self {
            dropped: true,
            ..Self::new(kind)
        }
    }

    pub fn is_clean(&self) -> bool {
        !self.dropped && self.failures.is_empty()
    }
}

#[derive(Clone)]
pub struct BusConfig {
    pub failure_policy: ListenerFailurePolicy,
    pub logger: Option<Logger>,
    pub metrics: Option<SharedMetrics>,
    pub audit: Arc<dyn RuntimeAudit>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            failure_policy: ListenerFailurePolicy::default(),
            logger: None,
            metrics: None,
            audit: Arc::new(NullRuntimeAudit),
        }
    }
}

#[derive(Default)]
struct BusState {
    attached: bool,
    subscribers: Vec<Subscriber>,
}

pub struct RemoteEventBus {
    state: Mutex<BusState>,
    source: Mutex<Box<dyn RemoteInputSource>>,
    config: BusConfig,
}

impl RemoteEventBus {
    pub fn new(source: Box<dyn RemoteInputSource>, config: BusConfig) -> Self {
        Self {
            state: Mutex::new(BusState::default()),
            source: Mutex::new(source),
            config,
        }
    }

    pub fn config(&self) -> &BusConfig {
        &self.config
    }

    /// Attach to the hardware source unless already attached.
    pub fn init(&self) -> Result<bool> {
        if self.is_init() {
            return Ok(true);
        }

        let source_name = {
            let mut source = self.lock_source();
            source.enable()?;
            source.name().to_string()
        };
        self.lock_state().attached = true;

        let mut audit = RuntimeAuditEventBuilder::new(RuntimeAuditStage::BusInitialized);
        audit.detail("source", json!(source_name));
        self.config.audit.record(audit.finish());
        self.log(
            LogLevel::Info,
            "bus_initialized",
            [json_kv("source", json!(source_name))],
        );
        Ok(self.is_init())
    }

    pub fn is_init(&self) -> bool {
        self.lock_state().attached
    }

    /// Detach from the source and drop every subscriber. `init` works again afterwards.
    pub fn unmount(&self) {
        let (was_attached, dropped) = {
            let mut state = self.lock_state();
            let was_attached = state.attached;
            let dropped = state.subscribers.len();
            state.attached = false;
            state.subscribers.clear();
            (was_attached, dropped)
        };
        if was_attached {
            self.lock_source().disable();
        }

        record_stage(self.config.audit.as_ref(), RuntimeAuditStage::BusUnmounted);
        self.log(
            LogLevel::Info,
            "bus_unmounted",
            [
                json_kv("was_attached", json!(was_attached)),
                json_kv("dropped_listeners", json!(dropped)),
            ],
        );
    }

    pub fn add_event_listener(&self, subscriber: Subscriber) {
        let name = subscriber.name().to_string();
        let count = {
            let mut state = self.lock_state();
            state.subscribers.push(subscriber);
            state.subscribers.len()
        };

        let mut audit = RuntimeAuditEventBuilder::new(RuntimeAuditStage::ListenerAdded);
        audit
            .detail("listener", json!(name))
            .detail("listeners", json!(count));
        self.config.audit.record(audit.finish());
        self.log(
            LogLevel::Debug,
            "listener_added",
            [
                json_kv("listener", json!(name)),
                json_kv("listeners", json!(count)),
            ],
        );
    }

    /// Remove the first registration of `subscriber`. Returns `false` when it was not
    /// registered.
    pub fn remove_event_listener(&self, subscriber: &Subscriber) -> bool {
        let removed = {
            let mut state = self.lock_state();
            match state.subscribers.iter().position(|item| item.same(subscriber)) {
                Some(index) => {
                    state.subscribers.remove(index);
                    true
                }
                None => false,
            }
        };

        if removed {
            let mut audit = RuntimeAuditEventBuilder::new(RuntimeAuditStage::ListenerRemoved);
            audit.detail("listener", json!(subscriber.name()));
            self.config.audit.record(audit.finish());
            self.log(
                LogLevel::Debug,
                "listener_removed",
                [json_kv("listener", json!(subscriber.name()))],
            );
        }
        removed
    }

    pub fn event_listeners(&self) -> Vec<Subscriber> {
        self.lock_state().subscribers.clone()
    }

    pub fn set_event_listeners(&self, subscribers: Vec<Subscriber>) {
        self.lock_state().subscribers = subscribers;
    }

    pub fn listener_count(&self) -> usize {
        self.lock_state().subscribers.len()
    }

    /// Deliver `event` to every subscriber in registration order.
    pub fn dispatch(&self, event: &RemoteEvent) -> Result<DispatchReport> {
        match self.fan_out(event) {
            (_, Some(err)) => Err(err),
            (report, None) => Ok(report),
        }
    }

    /// Like [`dispatch`](Self::dispatch), but hands back the report even when the `Abort`
    /// policy stopped delivery, together with the error that stopped it.
    pub fn fan_out(&self, event: &RemoteEvent) -> (DispatchReport, Option<FocusError>) {
        let snapshot = {
            let state = self.lock_state();
            if !state.attached {
                drop(state);
                self.log(
                    LogLevel::Debug,
                    "event_dropped",
                    [json_kv("event", json!(event.kind().as_str()))],
                );
                return (DispatchReport::dropped(event.kind()), None);
            }
            state.subscribers.clone()
        };

        let mut report = DispatchReport::new(event.kind());
        for (index, subscriber) in snapshot.iter().enumerate() {
            let err = match subscriber.notify(event) {
                Ok(()) => {
                    report.delivered += 1;
                    continue;
                }
                Err(err) => err,
            };

            let failure = ListenerFailure {
                index,
                listener: subscriber.name().to_string(),
                error: err.to_string(),
            };
            self.record_failure(event, &failure);

            match self.config.failure_policy {
                ListenerFailurePolicy::Abort => {
                    report.failures.push(failure);
                    report.aborted = true;
                    self.finish_dispatch(event, &report, snapshot.len(), true);
                    return (report, Some(err));
                }
                ListenerFailurePolicy::Isolate => report.failures.push(failure),
            }
        }

        self.finish_dispatch(event, &report, snapshot.len(), false);
        (report, None)
    }

    /// Read the next event from the attached source without dispatching it.
    pub fn poll_source(&self, timeout: Duration) -> Result<Option<RemoteEvent>> {
        if !self.is_init() {
            return Ok(None);
        }
        self.lock_source().poll(timeout)
    }

    /// Poll the source once and dispatch whatever arrived.
    pub fn pump(&self, timeout: Duration) -> Result<Option<DispatchReport>> {
        match self.poll_source(timeout)? {
            Some(event) => self.dispatch(&event).map(Some),
            None => Ok(None),
        }
    }

    fn record_failure(&self, event: &RemoteEvent, failure: &ListenerFailure) {
        let mut audit = RuntimeAuditEventBuilder::new(RuntimeAuditStage::ListenerFailed);
        audit
            .detail("listener", json!(failure.listener))
            .detail("index", json!(failure.index))
            .detail("error", json!(failure.error));
        self.config.audit.record(audit.finish());
        self.log(
            LogLevel::Warn,
            "listener_failed",
            [
                json_kv("event", json!(event.kind().as_str())),
                json_kv("listener", json!(failure.listener)),
                json_kv("index", json!(failure.index)),
                json_kv("error", json!(failure.error)),
            ],
        );
    }

    fn finish_dispatch(
        &self,
        event: &RemoteEvent,
        report: &DispatchReport,
        listeners: usize,
        aborted: bool,
    ) {
        record(self.config.metrics.as_ref(), |m| {
            m.record_dispatch(report.delivered, report.failures.len())
        });

        let mut audit = RuntimeAuditEventBuilder::new(RuntimeAuditStage::EventDispatched);
        audit
            .detail("event", json!(event.kind().as_str()))
            .detail("delivered", json!(report.delivered))
            .detail("aborted", json!(aborted));
        self.config.audit.record(audit.finish());
        self.log(
            LogLevel::Debug,
            "event_dispatched",
            [
                json_kv("event", json!(event.kind().as_str())),
                json_kv(
                    "target",
                    json!(event.target().map(|handle| handle.raw())),
                ),
                json_kv("listeners", json!(listeners)),
                json_kv("delivered", json!(report.delivered)),
                json_kv("failures", json!(report.failures.len())),
                json_kv("aborted", json!(aborted)),
            ],
        );
    }

    fn log<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        emit(
            self.config.logger.as_ref(),
            level,
            "tenfoot::bus",
            message,
            fields,
        );
    }

    fn lock_state(&self) -> MutexGuard<'_, BusState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_source(&self) -> MutexGuard<'_, Box<dyn RemoteInputSource>> {
        self.source
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FocusError;
    use crate::input::{NodeHandle, ScriptedSource};
    use crate::logging::MemorySink;
    use crate::runtime::audit::BufferedAudit;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Log = Arc<Mutex<Vec<(String, RemoteEventKind, Option<NodeHandle>)>>>;

    fn attached_bus(config: BusConfig) -> RemoteEventBus {
        let bus = RemoteEventBus::new(Box::new(ScriptedSource::new()), config);
        assert!(bus.init().unwrap());
        bus
    }

    fn recorder(label: &str, log: &Log) -> Subscriber {
        let label = label.to_string();
        let log = Arc::clone(log);
        Subscriber::from_fn(move |event: &RemoteEvent| {
            log.lock()
                .unwrap()
                .push((label.clone(), event.kind(), event.target()));
            Ok(())
        })
    }

    fn failing(reason: &'static str) -> Subscriber {
        Subscriber::from_fn(move |_event: &RemoteEvent| Err(FocusError::listener("failing", reason)))
    }

    #[test]
    fn init_is_idempotent_and_unmount_resets() {
        let bus = RemoteEventBus::new(Box::new(ScriptedSource::new()), BusConfig::default());
        assert!(!bus.is_init());
        assert!(bus.init().unwrap());
        assert!(bus.init().unwrap());

        let log = Log::default();
        bus.add_event_listener(recorder("a", &log));
        bus.unmount();
        assert!(!bus.is_init());
        assert!(bus.event_listeners().is_empty());

        assert!(bus.init().unwrap());
        assert_eq!(bus.listener_count(), 0);
        let report = bus.dispatch(&RemoteEvent::new(RemoteEventKind::Select)).unwrap();
        assert_eq!(report.delivered, 0);
        assert!(!report.dropped);
    }

    #[test]
    fn listeners_keep_registration_order_minus_removed() {
        let bus = attached_bus(BusConfig::default());
        let log = Log::default();
        let a = recorder("a", &log);
        let b = recorder("b", &log);
        let c = recorder("c", &log);
        bus.add_event_listener(a.clone());
        bus.add_event_listener(b.clone());
        bus.add_event_listener(c.clone());
        assert!(bus.remove_event_listener(&b));

        assert_eq!(bus.event_listeners(), vec![a, c]);
    }

    #[test]
    fn removing_unknown_listener_is_noop() {
        let bus = attached_bus(BusConfig::default());
        let log = Log::default();
        bus.add_event_listener(recorder("a", &log));
        assert!(!bus.remove_event_listener(&recorder("a", &log)));
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn duplicate_registrations_fire_independently() {
        let bus = attached_bus(BusConfig::default());
        let log = Log::default();
        let a = recorder("a", &log);
        bus.add_event_listener(a.clone());
        bus.add_event_listener(a.clone());

        bus.dispatch(&RemoteEvent::new(RemoteEventKind::Up)).unwrap();
        assert_eq!(log.lock().unwrap().len(), 2);

        assert!(bus.remove_event_listener(&a));
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn swipe_reaches_every_listener_in_order_without_target() {
        let bus = attached_bus(BusConfig::default());
        let log = Log::default();
        bus.add_event_listener(recorder("l1", &log));
        bus.add_event_listener(recorder("l2", &log));

        let report = bus.dispatch(&RemoteEvent::new(RemoteEventKind::SwipeUp)).unwrap();
        assert_eq!(report.delivered, 2);
        assert!(report.is_clean());
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ("l1".to_string(), RemoteEventKind::SwipeUp, None),
                ("l2".to_string(), RemoteEventKind::SwipeUp, None),
            ]
        );
    }

    #[test]
    fn self_removal_during_dispatch_does_not_skip_others() {
        let bus = Arc::new(attached_bus(BusConfig::default()));
        let log = Log::default();

        let slot: Arc<Mutex<Option<Subscriber>>> = Arc::new(Mutex::new(None));
        let once = {
            let bus = Arc::clone(&bus);
            let slot = Arc::clone(&slot);
            let log = Arc::clone(&log);
            Subscriber::from_fn(move |event: &RemoteEvent| {
                log.lock()
                    .unwrap()
                    .push(("once".to_string(), event.kind(), None));
                if let Some(me) = slot.lock().unwrap().take() {
                    bus.remove_event_listener(&me);
                }
                Ok(())
            })
        };
        *slot.lock().unwrap() = Some(once.clone());

        bus.add_event_listener(once);
        bus.add_event_listener(recorder("after", &log));

        bus.dispatch(&RemoteEvent::new(RemoteEventKind::Select)).unwrap();
        bus.dispatch(&RemoteEvent::new(RemoteEventKind::Select)).unwrap();

        let labels: Vec<String> = log.lock().unwrap().iter().map(|e| e.0.clone()).collect();
        assert_eq!(labels, vec!["once", "after", "after"]);
    }

    #[test]
    fn removing_another_listener_mid_dispatch_takes_effect_next_event() {
        let bus = Arc::new(attached_bus(BusConfig::default()));
        let log = Log::default();

        let l3 = recorder("l3", &log);
        let l1 = {
            let bus = Arc::clone(&bus);
            let l3 = l3.clone();
            let log = Arc::clone(&log);
            Subscriber::from_fn(move |event: &RemoteEvent| {
                log.lock()
                    .unwrap()
                    .push(("l1".to_string(), event.kind(), None));
                bus.remove_event_listener(&l3);
                Ok(())
            })
        };

        bus.add_event_listener(l1);
        bus.add_event_listener(recorder("l2", &log));
        bus.add_event_listener(l3);

        let first = bus.dispatch(&RemoteEvent::new(RemoteEventKind::Right)).unwrap();
        assert_eq!(first.delivered, 3);
        let second = bus.dispatch(&RemoteEvent::new(RemoteEventKind::Left)).unwrap();
        assert_eq!(second.delivered, 2);

        let seen: Vec<(String, RemoteEventKind)> = log
            .lock()
            .unwrap()
            .iter()
            .map(|e| (e.0.clone(), e.1))
            .collect();
        assert_eq!(
            seen,
            vec![
                ("l1".to_string(), RemoteEventKind::Right),
                ("l2".to_string(), RemoteEventKind::Right),
                ("l3".to_string(), RemoteEventKind::Right),
                ("l1".to_string(), RemoteEventKind::Left),
                ("l2".to_string(), RemoteEventKind::Left),
            ]
        );
        assert_eq!(bus.listener_count(), 2);
    }

    #[test]
    fn listener_added_mid_dispatch_starts_with_next_event() {
        let bus = Arc::new(attached_bus(BusConfig::default()));
        let log = Log::default();

        let late = recorder("late", &log);
        let adder = {
            let bus = Arc::clone(&bus);
            let pending = Arc::new(Mutex::new(Some(late)));
            Subscriber::from_fn(move |_event: &RemoteEvent| {
                if let Some(subscriber) = pending.lock().unwrap().take() {
                    bus.add_event_listener(subscriber);
                }
                Ok(())
            })
        };
        bus.add_event_listener(adder);

        let first = bus.dispatch(&RemoteEvent::new(RemoteEventKind::Select)).unwrap();
        assert_eq!(first.delivered, 1);
        assert!(log.lock().unwrap().is_empty());

        let second = bus.dispatch(&RemoteEvent::new(RemoteEventKind::Menu)).unwrap();
        assert_eq!(second.delivered, 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec![("late".to_string(), RemoteEventKind::Menu, None)]
        );
    }

    #[test]
    fn fan_out_keeps_the_report_when_aborting() {
        let bus = attached_bus(BusConfig {
            failure_policy: ListenerFailurePolicy::Abort,
            ..BusConfig::default()
        });
        let log = Log::default();
        bus.add_event_listener(recorder("before", &log));
        bus.add_event_listener(failing("boom"));

        let (report, err) = bus.fan_out(&RemoteEvent::new(RemoteEventKind::Back));
        assert!(matches!(err, Some(FocusError::Listener { .. })));
        assert!(report.aborted);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
    }

    #[test]
    fn abort_policy_stops_fan_out() {
        let audit = Arc::new(BufferedAudit::new());
        let bus = attached_bus(BusConfig {
            failure_policy: ListenerFailurePolicy::Abort,
            audit: audit.clone(),
            ..BusConfig::default()
        });
        let log = Log::default();
        bus.add_event_listener(recorder("before", &log));
        bus.add_event_listener(failing("boom"));
        bus.add_event_listener(recorder("after", &log));

        let err = bus
            .dispatch(&RemoteEvent::new(RemoteEventKind::Down))
            .unwrap_err();
        assert!(matches!(err, FocusError::Listener { .. }));
        let labels: Vec<String> = log.lock().unwrap().iter().map(|e| e.0.clone()).collect();
        assert_eq!(labels, vec!["before"]);
        assert_eq!(audit.count(RuntimeAuditStage::ListenerFailed), 1);
    }

    #[test]
    fn isolate_policy_reports_and_continues() {
        let sink = MemorySink::new();
        let metrics = crate::metrics::InputMetrics::shared();
        let bus = attached_bus(BusConfig {
            logger: Some(Logger::new(sink.clone())),
            metrics: Some(metrics.clone()),
            ..BusConfig::default()
        });
        let log = Log::default();
        bus.add_event_listener(failing("boom"));
        bus.add_event_listener(recorder("after", &log));

        let report = bus.dispatch(&RemoteEvent::new(RemoteEventKind::Down)).unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 0);
        assert_eq!(log.lock().unwrap().len(), 1);
        assert!(sink.contains("listener_failed"));

        let snapshot = metrics.lock().unwrap().snapshot(Duration::ZERO);
        assert_eq!(snapshot.listener_failures, 1);
        assert_eq!(snapshot.deliveries, 1);
    }

    #[test]
    fn detached_bus_drops_events() {
        let bus = RemoteEventBus::new(Box::new(ScriptedSource::new()), BusConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        bus.add_event_listener(Subscriber::from_fn(move |_event: &RemoteEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let report = bus.dispatch(&RemoteEvent::new(RemoteEventKind::Select)).unwrap();
        assert!(report.dropped);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn pump_pulls_from_source() {
        let source = ScriptedSource::with_events([
            RemoteEvent::new(RemoteEventKind::Left),
            RemoteEvent::new(RemoteEventKind::Right),
        ]);
        let bus = RemoteEventBus::new(Box::new(source), BusConfig::default());
        assert!(bus.pump(Duration::ZERO).unwrap().is_none());
        bus.init().unwrap();

        let log = Log::default();
        bus.add_event_listener(recorder("a", &log));
        let first = bus.pump(Duration::ZERO).unwrap().expect("first");
        assert_eq!(first.kind, RemoteEventKind::Left);
        bus.pump(Duration::ZERO).unwrap().expect("second");
        assert!(bus.pump(Duration::ZERO).unwrap().is_none());
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn set_event_listeners_replaces_list() {
        let bus = attached_bus(BusConfig::default());
        let log = Log::default();
        bus.add_event_listener(recorder("a", &log));
        let b = recorder("b", &log);
        bus.set_event_listeners(vec![b.clone()]);
        assert_eq!(bus.event_listeners(), vec![b]);
    }
}
