//! Remote-control input and focus core for ten-foot (TV) interfaces.
//!
//! Hardware remote events fan out through a [`RemoteEventBus`]; screens publish their
//! focusable controls to a [`NodeRegistry`]; [`DirectionalFocusGuard`]s and
//! [`ShortcutAffordance`]s shape d-pad movement; [`FocusScope`]s tie side effects to the
//! navigation-active screen; and the [`ModalOrchestrator`] runs a single overlay slot that
//! captures the back button. [`TenFootRuntime`] wires the services together.

pub mod error;
pub mod input;
pub mod logging;
pub mod metrics;
pub mod modal;
pub mod registry;
pub mod runtime;

pub use error::{FocusError, Result};
pub use input::{
    Direction, KeyboardSource, NodeHandle, RemoteEvent, RemoteEventKind, RemoteInputSource,
    ScriptedSource, map_key,
};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink, NullSink,
};
pub use metrics::{InputMetrics, MetricSnapshot, SharedMetrics};
pub use modal::{
    BackPolicy, BackgroundAffordance, ErrorContext, GracePhase, ModalAction, ModalActions,
    ModalButton, ModalButtonRole, ModalContent, ModalOpenPolicy, ModalOrchestrator, ModalRequest,
    ModalSlot, MountedModal,
};
pub use registry::{
    FocusableNode, MovePermissions, NodeId, NodeMapping, NodeRegistry, node_mapping,
};
pub use runtime::audit::{
    BufferedAudit, NullRuntimeAudit, RuntimeAudit, RuntimeAuditEvent, RuntimeAuditEventBuilder,
    RuntimeAuditStage,
};
pub use runtime::back::{
    BackDispatcher, BackHandler, BackOutcome, EventFlow, NavigationBack, NoNavigation,
};
pub use runtime::bus::{
    BusConfig, DispatchReport, ListenerFailure, ListenerFailurePolicy, RemoteEventBus,
    RemoteListener, Subscriber,
};
pub use runtime::diagnostics::EventLogListener;
pub use runtime::driver::cli::{DriverResult, KeyboardDriver, KeyboardDriverError};
pub use runtime::focus::{
    DirectionalFocusGuard, EXIT_NODE_ID, FocusNavigator, FocusTarget, MoveOutcome, NeighborMap,
    ShortcutAffordance, StaticNeighbors,
};
pub use runtime::scope::{FocusScope, Teardown};
pub use runtime::screens::{
    Screen, ScreenDefinition, ScreenFactory, ScreenLifecycleEvent, ScreenStack,
};
pub use runtime::{EventOutcome, RuntimeConfig, RuntimeSettings, Services, TenFootRuntime};
