//! Hardware remote events as delivered to the bus.
//!
//! Events are plain immutable values: once a source produces a [`RemoteEvent`] nothing in
//! the core changes it. The only "rewrite" the runtime performs is stamping the focused
//! handle on d-pad presses that arrive without one, and that produces a new value.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

pub mod source;

pub use source::{KeyboardSource, RemoteInputSource, ScriptedSource, map_key};

/// Opaque reference to a focusable element, issued by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeHandle(u64);

impl NodeHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The four d-pad directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RemoteEventKind {
    Up,
    Down,
    Left,
    Right,
    Select,
    LongSelect,
    Menu,
    Back,
    PlayPause,
    Rewind,
    FastForward,
    SwipeUp,
    SwipeDown,
    SwipeLeft,
    SwipeRight,
    Focus,
    Blur,
}

impl RemoteEventKind {
    /// D-pad kinds map onto a movement direction; everything else returns `None`.
    pub fn direction(self) -> Option<Direction> {
        match self {
            RemoteEventKind::Up => Some(Direction::Up),
            RemoteEventKind::Down => Some(Direction::Down),
            RemoteEventKind::Left => Some(Direction::Left),
            RemoteEventKind::Right => Some(Direction::Right),
            _ => None,
        }
    }

    /// `Back` on Android-style remotes, `Menu` on Apple remotes.
    pub fn is_back(self) -> bool {
        matches!(self, RemoteEventKind::Back | RemoteEventKind::Menu)
    }

    pub fn is_swipe(self) -> bool {
        matches!(
            self,
            RemoteEventKind::SwipeUp
                | RemoteEventKind::SwipeDown
                | RemoteEventKind::SwipeLeft
                | RemoteEventKind::SwipeRight
        )
    }

    /// Kinds the platform reports against the currently focused element.
    pub fn targets_focus(self) -> bool {
        self.direction().is_some()
            || matches!(self, RemoteEventKind::Select | RemoteEventKind::LongSelect)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RemoteEventKind::Up => "up",
            RemoteEventKind::Down => "down",
            RemoteEventKind::Left => "left",
            RemoteEventKind::Right => "right",
            RemoteEventKind::Select => "select",
            RemoteEventKind::LongSelect => "longSelect",
            RemoteEventKind::Menu => "menu",
            RemoteEventKind::Back => "back",
            RemoteEventKind::PlayPause => "playPause",
            RemoteEventKind::Rewind => "rewind",
            RemoteEventKind::FastForward => "fastForward",
            RemoteEventKind::SwipeUp => "swipeUp",
            RemoteEventKind::SwipeDown => "swipeDown",
            RemoteEventKind::SwipeLeft => "swipeLeft",
            RemoteEventKind::SwipeRight => "swipeRight",
            RemoteEventKind::Focus => "focus",
            RemoteEventKind::Blur => "blur",
        }
    }
}

impl From<Direction> for RemoteEventKind {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Up => RemoteEventKind::Up,
            Direction::Down => RemoteEventKind::Down,
            Direction::Left => RemoteEventKind::Left,
            Direction::Right => RemoteEventKind::Right,
        }
    }
}

impl fmt::Display for RemoteEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEvent {
    kind: RemoteEventKind,
    target: Option<NodeHandle>,
    timestamp: SystemTime,
}

impl RemoteEvent {
    pub fn new(kind: RemoteEventKind) -> Self {
        Self {
            kind,
            target: None,
            timestamp: SystemTime::now(),
        }
    }

    pub fn targeted(kind: RemoteEventKind, target: NodeHandle) -> Self {
        Self {
            target: Some(target),
            ..Self::new(kind)
        }
    }

    /// Copy of this event reported against `target`, keeping the original timestamp.
    pub fn with_target(&self, target: NodeHandle) -> Self {
        Self {
            target: Some(target),
            ..self.clone()
        }
    }

    pub fn kind(&self) -> RemoteEventKind {
        self.kind
    }

    pub fn target(&self) -> Option<NodeHandle> {
        self.target
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    pub fn is_targeted_at(&self, handle: NodeHandle) -> bool {
        self.target == Some(handle)
    }
}
