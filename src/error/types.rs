use thiserror::Error;

/// Unified result type for the tenfoot crate.
pub type Result<T> = std::result::Result<T, FocusError>;

/// Errors surfaced by the remote input, focus and modal core.
#[derive(Debug, Error)]
pub enum FocusError {
    #[error("remote input source `{source_name}` failed: {reason}")]
    Source { source_name: String, reason: String },
    #[error("listener `{listener}` failed: {reason}")]
    Listener { listener: String, reason: String },
    #[error("modal slot already occupied by `{0}`")]
    ModalOccupied(String),
    #[error("screen `{0}` not found")]
    ScreenNotFound(String),
    #[error("screen `{screen}` failed: {reason}")]
    Screen { screen: String, reason: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FocusError {
    /// Build the error a [`RemoteListener`](crate::RemoteListener) returns when it cannot
    /// handle an event.
    pub fn listener(listener: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Listener {
            listener: listener.into(),
            reason: reason.into(),
        }
    }

    pub fn source(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Source {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }
}
