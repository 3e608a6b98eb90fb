//! Transient user-facing notices.
//!
//! Broadcast to every subscriber; a notice sent with no subscribers is
//! dropped.

use std::fmt;

/// Something the shopper should be told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The anonymous wishlist was moved into the account.
    Synced { succeeded: usize, failed: usize },
    /// An add or remove was rejected. `message` is shown as-is.
    ToggleFailed { message: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synced { failed: 0, .. } => write!(f, "Wishlist synced"),
            Self::Synced { succeeded, failed } => write!(
                f,
                "Wishlist synced ({succeeded} saved, {failed} not saved)"
            ),
            Self::ToggleFailed { message } => f.write_str(message),
        }
    }
}
