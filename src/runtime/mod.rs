use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::json;

use crate::error::{FocusError, Result};
use crate::input::{RemoteEvent, RemoteInputSource};
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};
use crate::metrics::{InputMetrics, SharedMetrics};
use crate::modal::{DEFAULT_GRACE_PERIOD, ModalOpenPolicy, ModalOrchestrator};
use crate::registry::NodeRegistry;

pub mod audit;
pub mod back;
pub mod bus;
pub mod diagnostics;
pub mod driver;
pub mod focus;
pub mod scope;
pub mod screens;

use audit::{NullRuntimeAudit, RuntimeAudit, RuntimeAuditEventBuilder, RuntimeAuditStage};
use back::{BackDispatcher, BackHandler, BackOutcome};
use bus::{BusConfig, DispatchReport, ListenerFailurePolicy, RemoteEventBus};
use focus::{FocusNavigator, MoveOutcome};
use screens::{ScreenDefinition, ScreenStack};

/// Configuration knobs for the runtime loop and the services it builds.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Interval between timer ticks (grace timers, metrics).
    pub tick_interval: Duration,
    /// Optional structured logger shared by every service.
    pub logger: Option<Logger>,
    /// Metrics accumulator used for periodic snapshots.
    pub metrics: Option<SharedMetrics>,
    /// Interval between metrics snapshot emissions. Zero disables snapshots.
    pub metrics_interval: Duration,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
    pub failure_policy: ListenerFailurePolicy,
    pub modal_open_policy: ModalOpenPolicy,
    /// How long a freshly opened subscription prompt stays in its grace phase.
    pub grace_period: Duration,
    pub audit: Arc<dyn RuntimeAudit>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(200),
            logger: None,
            metrics: None,
            metrics_interval: Duration::from_secs(5),
            metrics_target: "tenfoot::runtime.metrics".to_string(),
            failure_policy: ListenerFailurePolicy::default(),
            modal_open_policy: ModalOpenPolicy::default(),
            grace_period: DEFAULT_GRACE_PERIOD,
            audit: Arc::new(NullRuntimeAudit),
        }
    }
}

impl RuntimeConfig {
    /// Defaults overlaid with a JSON settings document.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let settings: RuntimeSettings = serde_json::from_str(text)?;
        let mut config = Self::default();
        config.apply_settings(&settings)?;
        Ok(config)
    }

    pub fn apply_settings(&mut self, settings: &RuntimeSettings) -> Result<()> {
        if let Some(ms) = settings.tick_interval_ms {
            if ms == 0 {
                return Err(FocusError::Config(
                    "tick_interval_ms must be greater than zero".into(),
                ));
            }
            self.tick_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = settings.metrics_interval_ms {
            self.metrics_interval = Duration::from_millis(ms);
        }
        if let Some(target) = settings.metrics_target.as_ref() {
            self.metrics_target = target.clone();
        }
        if let Some(policy) = settings.failure_policy {
            self.failure_policy = policy;
        }
        if let Some(policy) = settings.modal_open_policy {
            self.modal_open_policy = policy;
        }
        if let Some(ms) = settings.grace_period_ms {
            self.grace_period = Duration::from_millis(ms);
        }
        Ok(())
    }

    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(InputMetrics::shared());
        }
    }

    /// Disable metrics collection and prevent further snapshots.
    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    /// Access the shared metrics handle if metrics are enabled.
    pub fn metrics_handle(&self) -> Option<SharedMetrics> {
        self.metrics.as_ref().map(Arc::clone)
    }
}

/// File form of [`RuntimeConfig`]. Durations are in milliseconds; absent keys keep defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeSettings {
    pub tick_interval_ms: Option<u64>,
    pub metrics_interval_ms: Option<u64>,
    pub metrics_target: Option<String>,
    pub failure_policy: Option<ListenerFailurePolicy>,
    pub modal_open_policy: Option<ModalOpenPolicy>,
    pub grace_period_ms: Option<u64>,
}

/// The explicitly constructed service instances shared across screens.
#[derive(Clone)]
pub struct Services {
    pub bus: Arc<RemoteEventBus>,
    pub registry: Arc<NodeRegistry>,
    pub navigator: Arc<FocusNavigator>,
    pub modals: Arc<ModalOrchestrator>,
    pub back: Arc<BackDispatcher>,
    logger: Option<Logger>,
}

impl Services {
    /// Build every service from one config. The modal orchestrator is registered as the first
    /// back handler.
    pub fn with_config(source: Box<dyn RemoteInputSource>, config: &RuntimeConfig) -> Self {
        let bus = RemoteEventBus::new(
            source,
            BusConfig {
                failure_policy: config.failure_policy,
                logger: config.logger.clone(),
                metrics: config.metrics.clone(),
                audit: Arc::clone(&config.audit),
            },
        );

        let mut registry = NodeRegistry::new().with_audit(Arc::clone(&config.audit));
        let mut back = BackDispatcher::new().with_audit(Arc::clone(&config.audit));
        let mut modals = ModalOrchestrator::new()
            .with_policy(config.modal_open_policy)
            .with_grace_period(config.grace_period)
            .with_audit(Arc::clone(&config.audit));
        if let Some(logger) = config.logger.clone() {
            registry = registry.with_logger(logger.clone());
            back = back.with_logger(logger.clone());
            modals = modals.with_logger(logger);
        }
        if let Some(metrics) = config.metrics.clone() {
            registry = registry.with_metrics(metrics.clone());
            back = back.with_metrics(metrics.clone());
            modals = modals.with_metrics(metrics);
        }

        let registry = Arc::new(registry);
        let mut navigator = FocusNavigator::new(Arc::clone(&registry));
        if let Some(logger) = config.logger.clone() {
            navigator = navigator.with_logger(logger);
        }

        let modals = Arc::new(modals);
        let back = Arc::new(back);
        back.add_handler(Arc::clone(&modals) as Arc<dyn BackHandler>);

        Self {
            bus: Arc::new(bus),
            registry,
            navigator: Arc::new(navigator),
            modals,
            back,
            logger: config.logger.clone(),
        }
    }

    pub fn logger(&self) -> Option<&Logger> {
        self.logger.as_ref()
    }
}

/// What the runtime did with one remote event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutcome {
    pub report: DispatchReport,
    pub back: Option<BackOutcome>,
    pub movement: Option<MoveOutcome>,
}

/// Application root: owns the services and the screen stack, and routes each remote event
/// through listeners, back arbitration and focus movement.
pub struct TenFootRuntime {
    services: Services,
    screens: ScreenStack,
    config: RuntimeConfig,
    exit: Arc<AtomicBool>,
    start_instant: Option<Instant>,
    last_metrics_emit: Option<Instant>,
}

impl TenFootRuntime {
    pub fn new(source: Box<dyn RemoteInputSource>, mut config: RuntimeConfig) -> Self {
        if config.metrics.is_none() && config.metrics_interval > Duration::ZERO {
            config.enable_metrics();
        }
        let services = Services::with_config(source, &config);
        let screens = ScreenStack::new(services.clone());
        Self {
            services,
            screens,
            config,
            exit: Arc::new(AtomicBool::new(false)),
            start_instant: None,
            last_metrics_emit: None,
        }
    }

    /// Share an externally owned exit flag, e.g. one raised by the input source.
    pub fn with_exit_handle(mut self, exit: Arc<AtomicBool>) -> Self {
        self.exit = exit;
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn screens(&self) -> &ScreenStack {
        &self.screens
    }

    pub fn screens_mut(&mut self) -> &mut ScreenStack {
        &mut self.screens
    }

    pub fn register_screen(&mut self, definition: ScreenDefinition) {
        self.screens.register_screen(definition);
    }

    pub fn push_screen(&mut self, screen_id: &str) -> Result<()> {
        self.screens.push(screen_id)
    }

    /// Cloneable flag; setting it stops `run` after the current event.
    pub fn exit_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.exit)
    }

    pub fn request_exit(&self) {
        self.exit.store(true, Ordering::SeqCst);
    }

    pub fn should_exit(&self) -> bool {
        self.exit.load(Ordering::SeqCst)
    }

    /// Attach the bus to its source and start the clocks. Safe to call twice.
    pub fn start(&mut self) -> Result<()> {
        if self.start_instant.is_some() {
            return Ok(());
        }
        self.services.bus.init()?;
        let now = Instant::now();
        self.start_instant = Some(now);
        self.last_metrics_emit = Some(now);

        let mut audit = RuntimeAuditEventBuilder::new(RuntimeAuditStage::RuntimeStarted);
        audit.detail("screens", json!(self.screens.depth()));
        self.config.audit.record(audit.finish());
        self.log_runtime_event(
            LogLevel::Info,
            "runtime_started",
            [
                json_kv("screens", json!(self.screens.depth())),
                json_kv("listeners", json!(self.services.bus.listener_count())),
            ],
        );
        Ok(())
    }

    pub fn handle_event(&mut self, event: RemoteEvent) -> Result<EventOutcome> {
        let event = match (event.kind().targets_focus(), event.target()) {
            (true, None) => match self.services.navigator.focused_handle() {
                Some(handle) => event.with_target(handle),
                None => event,
            },
            _ => event,
        };

        // An aborted fan-out still leaves back arbitration and movement to run.
        let (report, aborted) = self.services.bus.fan_out(&event);
        if let Some(err) = aborted {
            self.log_runtime_event(
                LogLevel::Warn,
                "fan_out_aborted",
                [
                    json_kv("kind", json!(event.kind().as_str())),
                    json_kv("error", json!(err.to_string())),
                ],
            );
        }
        let mut outcome = EventOutcome {
            report,
            back: None,
            movement: None,
        };
        if outcome.report.dropped {
            return Ok(outcome);
        }

        if event.kind().is_back() {
            outcome.back = Some(self.services.back.dispatch(&mut self.screens)?);
        } else if let Some(direction) = event.kind().direction() {
            if !self.services.modals.is_open() {
                outcome.movement = Some(self.services.navigator.move_focus(direction));
            }
        }

        self.log_runtime_event(
            LogLevel::Debug,
            "event_handled",
            [
                json_kv("kind", json!(event.kind().as_str())),
                json_kv("delivered", json!(outcome.report.delivered)),
                json_kv("back", json!(outcome.back.as_ref().map(describe_back))),
            ],
        );
        self.maybe_emit_metrics(Instant::now());
        Ok(outcome)
    }

    /// Advance timers to `now`.
    pub fn tick(&mut self, now: Instant) {
        self.services.modals.tick(now);
        self.maybe_emit_metrics(now);
    }

    pub fn run(&mut self) -> Result<()> {
        self.start()?;
        let result = self.run_loop();
        self.finalize();
        result
    }

    fn run_loop(&mut self) -> Result<()> {
        let mut last_tick = Instant::now();

        while !self.should_exit() && self.services.bus.is_init() {
            let timeout = self
                .config
                .tick_interval
                .checked_sub(last_tick.elapsed())
                .unwrap_or(Duration::ZERO);

            if let Some(event) = self.services.bus.poll_source(timeout)? {
                let kind = event.kind();
                if let Err(err) = self.handle_event(event) {
                    self.log_runtime_event(
                        LogLevel::Error,
                        "event_failed",
                        [
                            json_kv("kind", json!(kind.as_str())),
                            json_kv("error", json!(err.to_string())),
                        ],
                    );
                }
                if self.should_exit() {
                    break;
                }
            }

            if last_tick.elapsed() >= self.config.tick_interval {
                let now = Instant::now();
                last_tick = now;
                self.tick(now);
            }
        }
        Ok(())
    }

    pub fn run_scripted<I>(&mut self, events: I) -> Result<Vec<EventOutcome>>
    where
        I: IntoIterator<Item = RemoteEvent>,
    {
        self.start()?;
        let mut outcomes = Vec::new();
        for event in events {
            outcomes.push(self.handle_event(event)?);
            self.tick(Instant::now());
            if self.should_exit() {
                break;
            }
        }
        self.finalize();
        Ok(outcomes)
    }

    /// Unmount every screen, detach the bus and drop the node snapshot.
    pub fn shutdown(&mut self) -> Result<()> {
        self.screens.unmount_all()?;
        self.services.bus.unmount();
        self.services.registry.clear();
        self.start_instant = None;
        Ok(())
    }

    fn finalize(&mut self) {
        let uptime_ms = self
            .start_instant
            .map(|start| start.elapsed().as_millis())
            .unwrap_or(0);
        let mut audit = RuntimeAuditEventBuilder::new(RuntimeAuditStage::RuntimeStopped);
        audit.detail("uptime_ms", json!(uptime_ms as u64));
        self.config.audit.record(audit.finish());
        self.log_runtime_event(
            LogLevel::Info,
            "runtime_stopped",
            [json_kv("uptime_ms", json!(uptime_ms as u64))],
        );
    }

    fn log_runtime_event<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            if logger.enabled(level) {
                let event = event_with_fields(level, "tenfoot::runtime", message, fields);
                let _ = logger.log_event(event);
            }
        }
    }

    fn maybe_emit_metrics(&mut self, now: Instant) {
        if self.config.metrics.is_none() || self.config.metrics_interval == Duration::ZERO {
            return;
        }

        match self.last_metrics_emit {
            Some(last) if now.saturating_duration_since(last) < self.config.metrics_interval => {
                return;
            }
            _ => {
                self.last_metrics_emit = Some(now);
            }
        }

        let uptime = self
            .start_instant
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default();

        if let (Some(logger), Some(metrics)) =
            (self.config.logger.as_ref(), self.config.metrics.as_ref())
        {
            if let Ok(guard) = metrics.lock() {
                let target = self.config.metrics_target.as_str();
                let _ = logger.log_event(guard.snapshot(uptime).to_log_event(target));
            }
        }
    }
}

fn describe_back(outcome: &BackOutcome) -> String {
    match outcome {
        BackOutcome::Captured(handler) => format!("captured:{handler}"),
        BackOutcome::Navigated => "navigated".to_string(),
        BackOutcome::Unhandled => "unhandled".to_string(),
    }
}
