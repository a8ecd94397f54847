//! Back-press arbitration.
//!
//! Overlays register a [`BackHandler`]; the dispatcher asks them most-recent-first and stops
//! at the first one that consumes the press. Only when nobody consumes it does the press reach
//! the navigation collaborator.

use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::json;

use crate::error::Result;
use crate::logging::{LogLevel, Logger, emit, json_kv};
use crate::metrics::{SharedMetrics, record};

use super::audit::{NullRuntimeAudit, RuntimeAudit, RuntimeAuditEventBuilder, RuntimeAuditStage};

/// Control the propagation of a back press across handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFlow {
    Continue,
    Consumed,
}

pub trait BackHandler: Send + Sync {
    fn name(&self) -> &str {
        "back_handler"
    }

    fn on_back(&self) -> Result<EventFlow>;
}

/// Default back behavior of the navigation container.
pub trait NavigationBack {
    /// Returns `true` when the container navigated.
    fn go_back(&mut self) -> Result<bool>;
}

/// Fallback for callers without a navigation container.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNavigation;

impl NavigationBack for NoNavigation {
    fn go_back(&mut self) -> Result<bool> {
        Ok(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackOutcome {
    /// A handler consumed the press; navigation never saw it.
    Captured(String),
    Navigated,
    Unhandled,
}

pub struct BackDispatcher {
    handlers: Mutex<Vec<Arc<dyn BackHandler>>>,
    logger: Option<Logger>,
    metrics: Option<SharedMetrics>,
    audit: Arc<dyn RuntimeAudit>,
}

impl Default for BackDispatcher {
    fn default() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
            logger: None,
            metrics: None,
            audit: Arc::new(NullRuntimeAudit),
        }
    }
}

impl BackDispatcher {
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

    pub fn add_handler(&self, handler: Arc<dyn BackHandler>) {
        self.lock_handlers().push(handler);
    }

    /// Remove by identity.
    pub fn remove_handler(&self, handler: &Arc<dyn BackHandler>) -> bool {
        let mut handlers = self.lock_handlers();
        match handlers.iter().rposition(|candidate| {
            std::ptr::addr_eq(Arc::as_ptr(candidate), Arc::as_ptr(handler))
        }) {
            Some(index) => {
                handlers.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn handler_count(&self) -> usize {
        self.lock_handlers().len()
    }

    pub fn dispatch(&self, navigation: &mut dyn NavigationBack) -> Result<BackOutcome> {
        let handlers: Vec<Arc<dyn BackHandler>> = self.lock_handlers().clone();

        for handler in handlers.iter().rev() {
            if handler.on_back()? == EventFlow::Consumed {
                let name = handler.name().to_string();
                record(self.metrics.as_ref(), |m| m.record_back(true));
                let mut audit = RuntimeAuditEventBuilder::new(RuntimeAuditStage::BackCaptured);
                audit.detail("handler", json!(name));
                self.audit.record(audit.finish());
                emit(
                    self.logger.as_ref(),
                    LogLevel::Debug,
                    "tenfoot::back",
                    "back_captured",
                    [json_kv("handler", json!(name))],
                );
                return Ok(BackOutcome::Captured(name));
            }
        }

        record(self.metrics.as_ref(), |m| m.record_back(false));
        let outcome = if navigation.go_back()? {
            BackOutcome::Navigated
        } else {
            BackOutcome::Unhandled
        };
        emit(
            self.logger.as_ref(),
            LogLevel::Debug,
            "tenfoot::back",
            "back_forwarded",
            [json_kv(
                "navigated",
                json!(outcome == BackOutcome::Navigated),
            )],
        );
        Ok(outcome)
    }

    fn lock_handlers(&self) -> MutexGuard<'_, Vec<Arc<dyn BackHandler>>> {
        self.handlers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
