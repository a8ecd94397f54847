use serde_json::{Value, json};

use crate::error::Result;
use crate::input::RemoteEvent;
use crate::logging::{LogLevel, Logger, event_with_fields, json_kv};

use super::bus::RemoteListener;

/// Logs every remote event it sees, for observability/debugging.
pub struct EventLogListener {
    logger: Logger,
    level: LogLevel,
    log_dpad: bool,
    log_swipes: bool,
    log_media: bool,
    log_focus: bool,
}

impl EventLogListener {
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            level: LogLevel::Debug,
            log_dpad: true,
            log_swipes: true,
            log_media: true,
            log_focus: false,
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn log_dpad(mut self, enabled: bool) -> Self {
        self.log_dpad = enabled;
        self
    }

    pub fn log_swipes(mut self, enabled: bool) -> Self {
        self.log_swipes = enabled;
        self
    }

    pub fn log_media(mut self, enabled: bool) -> Self {
        self.log_media = enabled;
        self
    }

    pub fn log_focus(mut self, enabled: bool) -> Self {
        self.log_focus = enabled;
        self
    }

    fn wants(&self, event: &RemoteEvent) -> bool {
        use crate::input::RemoteEventKind::*;
        match event.kind() {
            Up | Down | Left | Right => self.log_dpad,
            SwipeUp | SwipeDown | SwipeLeft | SwipeRight => self.log_swipes,
            PlayPause | Rewind | FastForward => self.log_media,
            Focus | Blur => self.log_focus,
            Select | LongSelect | Menu | Back => true,
        }
    }

    fn emit(&self, message: &str, fields: impl IntoIterator<Item = (String, Value)>) {
        let event = event_with_fields(self.level, "tenfoot::remote", message, fields);
        let _ = self.logger.log_event(event);
    }
}

impl RemoteListener for EventLogListener {
    fn name(&self) -> &str {
        "diagnostics.event_logger"
    }

    fn on_event(&self, event: &RemoteEvent) -> Result<()> {
        if !self.wants(event) {
            return Ok(());
        }
        let target = event.target().map(|handle| handle.raw());
        self.emit(
            "remote_event",
            [
                json_kv("kind", json!(event.kind().as_str())),
                json_kv("target", json!(target)),
            ],
        );
        Ok(())
    }
}
