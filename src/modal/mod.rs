//! Single-slot overlay dialogs that capture the back button.
//!
//! The orchestrator owns exactly one slot. While it is open every back press is consumed by the
//! dialog and routed to its confirm or cancel action (or swallowed), so background navigation
//! never sees it. A [`BackgroundAffordance`] such as the go-back button is hidden for as long as
//! the slot is open.

pub mod variants;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::json;

use crate::error::{FocusError, Result};
use crate::logging::{LogLevel, Logger, emit, json_kv};
use crate::metrics::{SharedMetrics, record};
use crate::runtime::audit::{
    NullRuntimeAudit, RuntimeAudit, RuntimeAuditEventBuilder, RuntimeAuditStage,
};
use crate::runtime::back::{BackHandler, EventFlow};

pub use variants::{BackPolicy, ErrorContext, ModalButton, ModalButtonRole, ModalContent};

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_millis(500);

pub type ModalAction = Arc<dyn Fn() + Send + Sync>;

/// Callbacks supplied by whoever opens a dialog.
#[derive(Clone, Default)]
pub struct ModalActions {
    confirm: Option<ModalAction>,
    reject: Option<ModalAction>,
    cancel: Option<ModalAction>,
}

impl ModalActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_confirm<F>(mut self, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.confirm = Some(Arc::new(action));
        self
    }

    pub fn on_reject<F>(mut self, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.reject = Some(Arc::new(action));
        self
    }

    pub fn on_cancel<F>(mut self, action: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.cancel = Some(Arc::new(action));
        self
    }
}

impl fmt::Debug for ModalActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalActions")
            .field("confirm", &self.confirm.is_some())
            .field("reject", &self.reject.is_some())
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ModalRequest {
    pub content: ModalContent,
    pub actions: ModalActions,
}

impl ModalRequest {
    pub fn new(content: ModalContent) -> Self {
        Self {
            content,
            actions: ModalActions::default(),
        }
    }

    pub fn with_actions(mut self, actions: ModalActions) -> Self {
        self.actions = actions;
        self
    }
}

/// Post-open state of the subscription prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GracePhase {
    JustOpened,
    Settled,
}

#[derive(Debug, Clone)]
pub struct MountedModal {
    pub request: ModalRequest,
    pub opened_at: Instant,
    pub phase: GracePhase,
}

impl MountedModal {
    fn new(request: ModalRequest, opened_at: Instant) -> Self {
        let phase = if request.content.uses_grace_period() {
            GracePhase::JustOpened
        } else {
            GracePhase::Settled
        };
        Self {
            request,
            opened_at,
            phase,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum ModalSlot {
    #[default]
    Closed,
    Open(MountedModal),
}

impl ModalSlot {
    pub fn is_open(&self) -> bool {
        matches!(self, ModalSlot::Open(_))
    }
}

/// What `open_modal` does when the slot is already occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModalOpenPolicy {
    /// Swap in the new content and log a warning.
    #[default]
    Replace,
    /// Refuse with [`FocusError::ModalOccupied`].
    Reject,
}

/// Background control that must disappear while a dialog is up.
pub trait BackgroundAffordance: Send + Sync {
    fn hide(&self);
    fn show(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    Confirm,
    Reject,
    Cancel,
}

impl ActionKind {
    fn as_str(self) -> &'static str {
        match self {
            ActionKind::Confirm => "confirm",
            ActionKind::Reject => "reject",
            ActionKind::Cancel => "cancel",
        }
    }
}

pub struct ModalOrchestrator {
    slot: Mutex<ModalSlot>,
    policy: ModalOpenPolicy,
    grace_period: Duration,
    background: Mutex<Option<Arc<dyn BackgroundAffordance>>>,
    logger: Option<Logger>,
    metrics: Option<SharedMetrics>,
    audit: Arc<dyn RuntimeAudit>,
}

impl Default for ModalOrchestrator {
    fn default() -> Self {
        Self {
            slot: Mutex::new(ModalSlot::Closed),
            policy: ModalOpenPolicy::default(),
            grace_period: DEFAULT_GRACE_PERIOD,
            background: Mutex::new(None),
            logger: None,
            metrics: None,
            audit: Arc::new(NullRuntimeAudit),
        }
    }
}

impl ModalOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(mut self, policy: ModalOpenPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
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

    /// Swap the background control. While a modal is up the outgoing one is shown again and
    /// the incoming one hidden.
    pub fn set_background_affordance(&self, affordance: Arc<dyn BackgroundAffordance>) {
        let previous = self.lock_background().replace(Arc::clone(&affordance));
        if self.is_open() {
            if let Some(previous) = previous {
                previous.show();
            }
            affordance.hide();
        }
    }

    pub fn open_modal(&self, request: ModalRequest) -> Result<()> {
        self.open_modal_at(request, Instant::now())
    }

    /// Open with an explicit clock reading; the grace timer counts from `now`.
    pub fn open_modal_at(&self, request: ModalRequest, now: Instant) -> Result<()> {
        let kind = request.content.kind();
        let previous = {
            let mut slot = self.lock_slot();
            let previous = match &*slot {
                ModalSlot::Closed => None,
                ModalSlot::Open(mounted) => Some(mounted.request.content.kind()),
            };
            if let (Some(current), ModalOpenPolicy::Reject) = (previous, self.policy) {
                drop(slot);
                emit(
                    self.logger.as_ref(),
                    LogLevel::Warn,
                    "tenfoot::modal",
                    "modal_open_rejected",
                    [
                        json_kv("requested", json!(kind)),
                        json_kv("current", json!(current)),
                    ],
                );
                return Err(FocusError::ModalOccupied(current.to_string()));
            }
            *slot = ModalSlot::Open(MountedModal::new(request, now));
            previous
        };

        let replaced = previous.is_some();
        record(self.metrics.as_ref(), |m| m.record_modal_open(replaced));
        let stage = if replaced {
            RuntimeAuditStage::ModalReplaced
        } else {
            RuntimeAuditStage::ModalOpened
        };
        let mut audit = RuntimeAuditEventBuilder::new(stage);
        audit.detail("content", json!(kind));
        self.audit.record(audit.finish());

        match previous {
            Some(current) => emit(
                self.logger.as_ref(),
                LogLevel::Warn,
                "tenfoot::modal",
                "modal_replaced",
                [
                    json_kv("content", json!(kind)),
                    json_kv("previous", json!(current)),
                ],
            ),
            None => {
                if let Some(background) = self.background() {
                    background.hide();
                }
                emit(
                    self.logger.as_ref(),
                    LogLevel::Info,
                    "tenfoot::modal",
                    "modal_opened",
                    [json_kv("content", json!(kind))],
                );
            }
        }
        Ok(())
    }

    /// Returns `false` when nothing was open.
    pub fn close_modal(&self) -> bool {
        let closed = std::mem::take(&mut *self.lock_slot());
        let ModalSlot::Open(mounted) = closed else {
            return false;
        };

        if let Some(background) = self.background() {
            background.show();
        }
        record(self.metrics.as_ref(), |m| m.record_modal_close());
        let kind = mounted.request.content.kind();
        let mut audit = RuntimeAuditEventBuilder::new(RuntimeAuditStage::ModalClosed);
        audit.detail("content", json!(kind));
        self.audit.record(audit.finish());
        emit(
            self.logger.as_ref(),
            LogLevel::Info,
            "tenfoot::modal",
            "modal_closed",
            [json_kv("content", json!(kind))],
        );
        true
    }

    /// Close, then run `after` once the slot is observably closed.
    pub fn close_modal_then<F>(&self, after: F) -> bool
    where
        F: FnOnce(),
    {
        let closed = self.close_modal();
        after();
        closed
    }

    /// Returns `false` when nothing was open.
    pub fn confirm(&self) -> bool {
        self.invoke(ActionKind::Confirm)
    }

    pub fn reject(&self) -> bool {
        self.invoke(ActionKind::Reject)
    }

    pub fn cancel(&self) -> bool {
        self.invoke(ActionKind::Cancel)
    }

    /// Advance the grace timer. Returns `true` when the phase changed.
    pub fn tick(&self, now: Instant) -> bool {
        let mut slot = self.lock_slot();
        let ModalSlot::Open(mounted) = &mut *slot else {
            return false;
        };
        if mounted.phase == GracePhase::JustOpened
            && now.saturating_duration_since(mounted.opened_at) >= self.grace_period
        {
            mounted.phase = GracePhase::Settled;
            drop(slot);
            emit(
                self.logger.as_ref(),
                LogLevel::Trace,
                "tenfoot::modal",
                "modal_settled",
                [json_kv(
                    "grace_ms",
                    json!(self.grace_period.as_millis() as u64),
                )],
            );
            return true;
        }
        false
    }

    pub fn is_open(&self) -> bool {
        self.lock_slot().is_open()
    }

    pub fn slot(&self) -> ModalSlot {
        self.lock_slot().clone()
    }

    pub fn current(&self) -> Option<ModalContent> {
        match &*self.lock_slot() {
            ModalSlot::Open(mounted) => Some(mounted.request.content.clone()),
            ModalSlot::Closed => None,
        }
    }

    pub fn phase(&self) -> Option<GracePhase> {
        match &*self.lock_slot() {
            ModalSlot::Open(mounted) => Some(mounted.phase),
            ModalSlot::Closed => None,
        }
    }

    fn invoke(&self, kind: ActionKind) -> bool {
        let action = {
            let slot = self.lock_slot();
            let ModalSlot::Open(mounted) = &*slot else {
                return false;
            };
            let actions = &mounted.request.actions;
            match kind {
                ActionKind::Confirm => actions.confirm.clone(),
                ActionKind::Reject => actions.reject.clone(),
                ActionKind::Cancel => actions.cancel.clone(),
            }
        };

        emit(
            self.logger.as_ref(),
            LogLevel::Debug,
            "tenfoot::modal",
            "modal_action",
            [
                json_kv("action", json!(kind.as_str())),
                json_kv("handled", json!(action.is_some())),
            ],
        );
        match action {
            Some(action) => action(),
            None => {
                self.close_modal();
            }
        }
        true
    }

    fn background(&self) -> Option<Arc<dyn BackgroundAffordance>> {
        self.lock_background().clone()
    }

    fn lock_slot(&self) -> MutexGuard<'_, ModalSlot> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_background(&self) -> MutexGuard<'_, Option<Arc<dyn BackgroundAffordance>>> {
        self.background
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl BackHandler for ModalOrchestrator {
    fn name(&self) -> &str {
        "modal"
    }

    fn on_back(&self) -> Result<EventFlow> {
        let policy = match self.current() {
            Some(content) => content.back_policy(),
            None => return Ok(EventFlow::Continue),
        };
        match policy {
            BackPolicy::Confirm => {
                self.confirm();
            }
            BackPolicy::Cancel => {
                self.cancel();
            }
            BackPolicy::Swallow => {}
        }
        Ok(EventFlow::Consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MemorySink;
    use crate::runtime::audit::BufferedAudit;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        (count, move || {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[derive(Default)]
    struct GoBackButton {
        visible: Mutex<Vec<bool>>,
    }

    impl BackgroundAffordance for GoBackButton {
        fn hide(&self) {
            self.visible.lock().unwrap().push(false);
        }

        fn show(&self) {
            self.visible.lock().unwrap().push(true);
        }
    }

    #[test]
    fn closed_slot_lets_back_through() {
        let modals = ModalOrchestrator::new();
        assert_eq!(modals.on_back().unwrap(), EventFlow::Continue);
        assert!(!modals.close_modal());
        assert!(!modals.confirm());
    }

    #[test]
    fn not_subscribed_back_confirms_immediately() {
        let modals = ModalOrchestrator::new();
        let (confirms, on_confirm) = counter();
        let opened = Instant::now();
        modals
            .open_modal_at(
                ModalRequest::new(ModalContent::NotSubscribed)
                    .with_actions(ModalActions::new().on_confirm(on_confirm)),
                opened,
            )
            .unwrap();

        assert_eq!(modals.phase(), Some(GracePhase::JustOpened));
        assert_eq!(modals.on_back().unwrap(), EventFlow::Consumed);
        assert_eq!(confirms.load(Ordering::SeqCst), 1);

        assert!(!modals.tick(opened + Duration::from_millis(100)));
        assert!(modals.tick(opened + Duration::from_millis(600)));
        assert_eq!(modals.phase(), Some(GracePhase::Settled));
        assert_eq!(modals.on_back().unwrap(), EventFlow::Consumed);
        assert_eq!(confirms.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn swallowing_variants_consume_without_actions() {
        let modals = ModalOrchestrator::new();
        let (confirms, on_confirm) = counter();
        modals
            .open_modal(
                ModalRequest::new(ModalContent::RentalStatusChecking {
                    title: "Tosca".into(),
                })
                .with_actions(ModalActions::new().on_confirm(on_confirm)),
            )
            .unwrap();
        assert_eq!(modals.on_back().unwrap(), EventFlow::Consumed);
        assert_eq!(confirms.load(Ordering::SeqCst), 0);
        assert!(modals.is_open());
        assert_eq!(modals.phase(), Some(GracePhase::Settled));
    }

    #[test]
    fn continue_watching_back_cancels() {
        let modals = ModalOrchestrator::new();
        let (cancels, on_cancel) = counter();
        modals
            .open_modal(
                ModalRequest::new(ModalContent::ContinueWatching {
                    video_title: "Tosca".into(),
                    resume_from: Duration::from_secs(90),
                    is_live_stream: false,
                })
                .with_actions(ModalActions::new().on_cancel(on_cancel)),
            )
            .unwrap();
        modals.on_back().unwrap();
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_handler_closes_the_slot() {
        let modals = ModalOrchestrator::new();
        modals
            .open_modal(ModalRequest::new(ModalContent::error(
                "Playback failed",
                ErrorContext::GoBack,
            )))
            .unwrap();
        assert_eq!(modals.on_back().unwrap(), EventFlow::Consumed);
        assert!(!modals.is_open());
    }

    #[test]
    fn handler_may_close_from_inside() {
        let modals = Arc::new(ModalOrchestrator::new());
        let inner = Arc::clone(&modals);
        modals
            .open_modal(
                ModalRequest::new(ModalContent::WarningOfExit).with_actions(
                    ModalActions::new().on_reject(move || {
                        inner.close_modal();
                    }),
                ),
            )
            .unwrap();
        assert!(modals.reject());
        assert!(!modals.is_open());
    }

    #[test]
    fn replace_policy_swaps_content_and_warns() {
        let sink = MemorySink::new();
        let audit = Arc::new(BufferedAudit::new());
        let modals = ModalOrchestrator::new()
            .with_logger(Logger::new(sink.clone()))
            .with_audit(audit.clone());
        modals
            .open_modal(ModalRequest::new(ModalContent::WarningOfExit))
            .unwrap();
        modals
            .open_modal(ModalRequest::new(ModalContent::NotSubscribed))
            .unwrap();

        assert_eq!(modals.current(), Some(ModalContent::NotSubscribed));
        assert!(sink.contains("modal_replaced"));
        assert_eq!(
            audit.stages(),
            vec![RuntimeAuditStage::ModalOpened, RuntimeAuditStage::ModalReplaced]
        );
    }

    #[test]
    fn reject_policy_keeps_current_dialog() {
        let modals = ModalOrchestrator::new().with_policy(ModalOpenPolicy::Reject);
        modals
            .open_modal(ModalRequest::new(ModalContent::WarningOfExit))
            .unwrap();
        let err = modals
            .open_modal(ModalRequest::new(ModalContent::NotSubscribed))
            .unwrap_err();
        assert!(matches!(err, FocusError::ModalOccupied(ref kind) if kind == "warning_of_exit"));
        assert_eq!(modals.current(), Some(ModalContent::WarningOfExit));
    }

    #[test]
    fn background_affordance_tracks_slot() {
        let modals = ModalOrchestrator::new();
        let button = Arc::new(GoBackButton::default());
        modals.set_background_affordance(button.clone());

        modals
            .open_modal(ModalRequest::new(ModalContent::WarningOfExit))
            .unwrap();
        modals
            .open_modal(ModalRequest::new(ModalContent::NotSubscribed))
            .unwrap();
        let mut after = Vec::new();
        modals.close_modal_then(|| after.push(modals.is_open()));

        assert_eq!(*button.visible.lock().unwrap(), vec![false, true]);
        assert_eq!(after, vec![false]);
    }

    #[test]
    fn replacing_affordance_while_open_restores_the_old_one() {
        let modals = ModalOrchestrator::new();
        let old = Arc::new(GoBackButton::default());
        let new = Arc::new(GoBackButton::default());
        modals.set_background_affordance(old.clone());
        modals
            .open_modal(ModalRequest::new(ModalContent::WarningOfExit))
            .unwrap();

        modals.set_background_affordance(new.clone());
        assert_eq!(*old.visible.lock().unwrap(), vec![false, true]);
        assert_eq!(*new.visible.lock().unwrap(), vec![false]);

        assert!(modals.close_modal());
        assert_eq!(*old.visible.lock().unwrap(), vec![false, true]);
        assert_eq!(*new.visible.lock().unwrap(), vec![false, true]);
    }

    #[test]
    fn close_then_runs_even_when_already_closed() {
        let modals = ModalOrchestrator::new();
        let mut ran = false;
        assert!(!modals.close_modal_then(|| ran = true));
        assert!(ran);
    }
}
