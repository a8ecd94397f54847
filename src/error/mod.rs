mod types;

pub use types::{FocusError, Result};
