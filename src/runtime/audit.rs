//! Lifecycle audit hooks for the input core.
//!
//! Records capture a stage identifier plus structured metadata so callers can log, buffer,
//! or assert on the sequence of bus, registry and modal transitions without threading a
//! logger through every call site.

use std::sync::Mutex;
use std::time::SystemTime;

use serde_json::Value;

/// Distinct checkpoints emitted by the bus, registry, modal slot and runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeAuditStage {
    /// The bus attached to its hardware source.
    BusInitialized,
    /// The bus detached and dropped its subscribers.
    BusUnmounted,
    ListenerAdded,
    ListenerRemoved,
    /// A remote event finished fanning out.
    EventDispatched,
    /// A listener returned an error during fan-out.
    ListenerFailed,
    /// The node registry received a new snapshot.
    NodesReplaced,
    ModalOpened,
    /// An open request arrived while the slot was occupied and replaced its content.
    ModalReplaced,
    ModalClosed,
    /// A back press was claimed before reaching navigation.
    BackCaptured,
    RuntimeStarted,
    RuntimeStopped,
}

/// Structured audit entry.
#[derive(Debug, Clone)]
pub struct RuntimeAuditEvent {
    pub timestamp: SystemTime,
    pub stage: RuntimeAuditStage,
    pub details: Vec<(String, Value)>,
}

impl RuntimeAuditEvent {
    fn new(stage: RuntimeAuditStage) -> Self {
        Self {
            timestamp: SystemTime::now(),
            stage,
            details: Vec::new(),
        }
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value)
    }
}

/// Builder helper to append fields ergonomically.
pub struct RuntimeAuditEventBuilder {
    event: RuntimeAuditEvent,
}

impl RuntimeAuditEventBuilder {
    pub fn new(stage: RuntimeAuditStage) -> Self {
        Self {
            event: RuntimeAuditEvent::new(stage),
        }
    }

    pub fn detail(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.event.details.push((key.into(), value));
        self
    }

    pub fn finish(self) -> RuntimeAuditEvent {
        self.event
    }
}

/// Trait implemented by any audit sink.
pub trait RuntimeAudit: Send + Sync {
    fn record(&self, event: RuntimeAuditEvent);
}

/// Default no-op implementation used when auditing is disabled.
#[derive(Debug, Default)]
pub struct NullRuntimeAudit;

impl RuntimeAudit for NullRuntimeAudit {
    fn record(&self, _event: RuntimeAuditEvent) {}
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct BufferedAudit {
    events: Mutex<Vec<RuntimeAuditEvent>>,
}

impl BufferedAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RuntimeAuditEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn stages(&self) -> Vec<RuntimeAuditStage> {
        self.events().into_iter().map(|event| event.stage).collect()
    }

    pub fn count(&self, stage: RuntimeAuditStage) -> usize {
        self.events()
            .iter()
            .filter(|event| event.stage == stage)
            .count()
    }
}

impl RuntimeAudit for BufferedAudit {
    fn record(&self, event: RuntimeAuditEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}

/// Record a stage with no details.
pub(crate) fn record_stage(audit: &dyn RuntimeAudit, stage: RuntimeAuditStage) {
    audit.record(RuntimeAuditEventBuilder::new(stage).finish());
}
