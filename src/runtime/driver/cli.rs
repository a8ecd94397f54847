use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use thiserror::Error;

use crate::error::FocusError;
use crate::input::KeyboardSource;
use crate::runtime::{RuntimeConfig, TenFootRuntime};

pub type DriverResult<T> = std::result::Result<T, KeyboardDriverError>;

#[derive(Debug, Error)]
pub enum KeyboardDriverError {
    #[error("runtime error: {0}")]
    Runtime(#[from] FocusError),
    #[error("terminal error: {0}")]
    Terminal(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Terminal driver that feeds keyboard presses into a `TenFootRuntime` as remote events.
///
/// Raw mode and the alternate screen are entered before the loop and always restored
/// afterwards, even when the runtime fails.
pub struct KeyboardDriver {
    runtime: TenFootRuntime,
}

impl KeyboardDriver {
    /// Ctrl+C requests exit through the runtime's exit handle.
    pub fn new(config: RuntimeConfig) -> Self {
        let quit = Arc::new(AtomicBool::new(false));
        let source = KeyboardSource::new().with_quit_flag(Arc::clone(&quit));
        let runtime = TenFootRuntime::new(Box::new(source), config).with_exit_handle(quit);
        Self { runtime }
    }

    /// Wrap a runtime built elsewhere, e.g. one with screens already registered.
    pub fn with_runtime(runtime: TenFootRuntime) -> Self {
        Self { runtime }
    }

    pub fn runtime_mut(&mut self) -> &mut TenFootRuntime {
        &mut self.runtime
    }

    pub fn run(mut self) -> DriverResult<()> {
        let mut stdout = io::stdout();
        self.enter(&mut stdout)?;
        let result = self.run_inner();
        self.exit(&mut stdout);
        result
    }

    fn run_inner(&mut self) -> DriverResult<()> {
        let ran = self.runtime.run();
        let shut = self.runtime.shutdown();
        ran?;
        shut?;
        Ok(())
    }

    fn enter(&self, stdout: &mut impl Write) -> DriverResult<()> {
        terminal::enable_raw_mode()
            .map_err(|err| KeyboardDriverError::Terminal(err.to_string()))?;
        execute!(stdout, EnterAlternateScreen, Hide, Clear(ClearType::All))?;
        Ok(())
    }

    fn exit(&self, stdout: &mut impl Write) {
        execute!(stdout, Show, LeaveAlternateScreen).ok();
        terminal::disable_raw_mode().ok();
    }
}
