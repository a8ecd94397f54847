use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::event::{
    self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
};

use crate::error::{FocusError, Result};

use super::{RemoteEvent, RemoteEventKind};

/// Platform hardware-input source the bus attaches to.
///
/// `enable`/`disable` bracket the attachment; `poll` waits at most `timeout` for the next
/// event and returns `Ok(None)` when nothing arrived.
pub trait RemoteInputSource: Send {
    fn name(&self) -> &str {
        "remote_source"
    }

    fn enable(&mut self) -> Result<()>;

    fn disable(&mut self);

    fn poll(&mut self, timeout: Duration) -> Result<Option<RemoteEvent>>;
}

/// Replays a fixed queue of events. Used by tests, benches and scripted sessions.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    queue: VecDeque<RemoteEvent>,
    enabled: bool,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events<I>(events: I) -> Self
    where
        I: IntoIterator<Item = RemoteEvent>,
    {
        Self {
            queue: events.into_iter().collect(),
            enabled: false,
        }
    }

    pub fn push(&mut self, event: RemoteEvent) {
        self.queue.push_back(event);
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl RemoteInputSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    fn enable(&mut self) -> Result<()> {
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn poll(&mut self, _timeout: Duration) -> Result<Option<RemoteEvent>> {
        if !self.enabled {
            return Ok(None);
        }
        Ok(self.queue.pop_front())
    }
}

/// Terminal keyboard standing in for a TV remote during development.
#[derive(Debug, Default)]
pub struct KeyboardSource {
    enabled: bool,
    quit: Option<Arc<AtomicBool>>,
}

impl KeyboardSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise `flag` on Ctrl+C instead of emitting anything.
    pub fn with_quit_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.quit = Some(flag);
        self
    }
}

impl RemoteInputSource for KeyboardSource {
    fn name(&self) -> &str {
        "keyboard"
    }

    fn enable(&mut self) -> Result<()> {
        self.enabled = true;
        Ok(())
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn poll(&mut self, timeout: Duration) -> Result<Option<RemoteEvent>> {
        if !self.enabled {
            return Ok(None);
        }
        if !event::poll(timeout).map_err(|err| FocusError::source("keyboard", err.to_string()))? {
            return Ok(None);
        }
        match event::read().map_err(|err| FocusError::source("keyboard", err.to_string()))? {
            CrosstermEvent::Key(key) if is_interrupt(&key) => {
                if let Some(flag) = self.quit.as_ref() {
                    flag.store(true, Ordering::SeqCst);
                }
                Ok(None)
            }
            CrosstermEvent::Key(key) => Ok(map_key(&key).map(RemoteEvent::new)),
            _ => Ok(None),
        }
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Translate a key press into the remote button it emulates.
pub fn map_key(key: &KeyEvent) -> Option<RemoteEventKind> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    let kind = match key.code {
        KeyCode::Up => RemoteEventKind::Up,
        KeyCode::Down => RemoteEventKind::Down,
        KeyCode::Left => RemoteEventKind::Left,
        KeyCode::Right => RemoteEventKind::Right,
        KeyCode::Enter => RemoteEventKind::Select,
        KeyCode::Esc | KeyCode::Backspace => RemoteEventKind::Back,
        KeyCode::Char('m') => RemoteEventKind::Menu,
        KeyCode::Char('l') => RemoteEventKind::LongSelect,
        KeyCode::Char(' ') => RemoteEventKind::PlayPause,
        KeyCode::Char(',') => RemoteEventKind::Rewind,
        KeyCode::Char('.') => RemoteEventKind::FastForward,
        KeyCode::PageUp => RemoteEventKind::SwipeUp,
        KeyCode::PageDown => RemoteEventKind::SwipeDown,
        KeyCode::Home => RemoteEventKind::SwipeLeft,
        KeyCode::End => RemoteEventKind::SwipeRight,
        _ => return None,
    };
    Some(kind)
}
