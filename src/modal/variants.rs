use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::input::Direction;
use crate::registry::MovePermissions;

/// Where an error dialog leads when confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorContext {
    /// Connectivity failure; confirming leaves the app.
    Exit,
    /// Arrived through a deep link; confirming lands on the browse surface.
    Explore,
    GoBack,
}

impl ErrorContext {
    /// Connectivity takes precedence over deep links.
    pub fn from_flags(from_internet_connection: bool, from_deep_link: bool) -> Self {
        if from_internet_connection {
            Self::Exit
        } else if from_deep_link {
            Self::Explore
        } else {
            Self::GoBack
        }
    }

    pub fn confirm_label(self) -> &'static str {
        match self {
            Self::Exit => "Exit",
            Self::Explore => "Explore",
            Self::GoBack => "Go back",
        }
    }
}

/// What a back press does while a given variant is mounted. The press is consumed either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackPolicy {
    Confirm,
    Cancel,
    Swallow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalButtonRole {
    Confirm,
    Reject,
}

/// One focusable control of a dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalButton {
    pub label: String,
    pub role: ModalButtonRole,
    pub moves: MovePermissions,
    pub preferred_focus: bool,
}

impl ModalButton {
    fn new(label: impl Into<String>, role: ModalButtonRole, moves: MovePermissions) -> Self {
        Self {
            label: label.into(),
            role,
            moves,
            preferred_focus: false,
        }
    }

    fn preferred(mut self) -> Self {
        self.preferred_focus = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalContent {
    Error {
        title: String,
        subtitle: Option<String>,
        context: ErrorContext,
    },
    NotSubscribed,
    RentalStatusChecking {
        title: String,
    },
    WarningOfExit,
    ContinueWatching {
        video_title: String,
        resume_from: Duration,
        is_live_stream: bool,
    },
}

impl ModalContent {
    pub fn error(title: impl Into<String>, context: ErrorContext) -> Self {
        Self::Error {
            title: title.into(),
            subtitle: None,
            context,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Error { .. } => "error",
            Self::NotSubscribed => "not_subscribed",
            Self::RentalStatusChecking { .. } => "rental_status_checking",
            Self::WarningOfExit => "warning_of_exit",
            Self::ContinueWatching { .. } => "continue_watching",
        }
    }

    pub fn back_policy(&self) -> BackPolicy {
        match self {
            Self::Error { .. } | Self::NotSubscribed => BackPolicy::Confirm,
            Self::RentalStatusChecking { .. } | Self::WarningOfExit => BackPolicy::Swallow,
            Self::ContinueWatching { .. } => BackPolicy::Cancel,
        }
    }

    /// Only the subscription prompt runs the post-open grace timer.
    pub fn uses_grace_period(&self) -> bool {
        matches!(self, Self::NotSubscribed)
    }

    pub fn headline(&self) -> String {
        match self {
            Self::Error { title, .. } if title.is_empty() => "Error".to_string(),
            Self::Error { title, .. } => title.clone(),
            Self::NotSubscribed => "Subscribe to watch this performance".to_string(),
            Self::RentalStatusChecking { title } => {
                format!("Checking subscription status of {title}")
            }
            Self::WarningOfExit => "Are you sure you want to quit?".to_string(),
            Self::ContinueWatching { .. } => "Continue watching".to_string(),
        }
    }

    pub fn subtitle(&self) -> Option<String> {
        match self {
            Self::Error { subtitle, .. } => subtitle.clone().filter(|text| !text.is_empty()),
            Self::ContinueWatching { video_title, .. } => Some(video_title.clone()),
            _ => None,
        }
    }

    /// Focusable controls in top-to-bottom order, with the movement each one allows.
    pub fn buttons(&self) -> Vec<ModalButton> {
        let locked = MovePermissions::locked();
        match self {
            Self::Error { context, .. } => {
                vec![ModalButton::new(context.confirm_label(), ModalButtonRole::Confirm, locked).preferred()]
            }
            Self::NotSubscribed => {
                vec![ModalButton::new("Explore stream", ModalButtonRole::Confirm, locked).preferred()]
            }
            Self::RentalStatusChecking { .. } => Vec::new(),
            Self::WarningOfExit => vec![
                ModalButton::new(
                    "Yes, I want to quit",
                    ModalButtonRole::Confirm,
                    locked.with(Direction::Right, true),
                ),
                ModalButton::new(
                    "No, I want to stay",
                    ModalButtonRole::Reject,
                    locked.with(Direction::Left, true),
                )
                .preferred(),
            ],
            Self::ContinueWatching {
                resume_from,
                is_live_stream,
                ..
            } => {
                let primary = if *is_live_stream {
                    "Watch Live".to_string()
                } else {
                    format!("Resume from {}", clock_label(*resume_from))
                };
                vec![
                    ModalButton::new(
                        primary,
                        ModalButtonRole::Confirm,
                        locked.with(Direction::Down, true),
                    )
                    .preferred(),
                    ModalButton::new(
                        "Start from the beginning",
                        ModalButtonRole::Reject,
                        locked.with(Direction::Up, true),
                    ),
                ]
            }
        }
    }
}

fn clock_label(position: Duration) -> String {
    let total = position.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}
