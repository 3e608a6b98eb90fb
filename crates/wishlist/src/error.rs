//! Error types for the wishlist client.

use thiserror::Error;

/// Errors from the device-local storage slot.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem read or write failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Slot contents could not be encoded.
    #[error("failed to encode slot: {0}")]
    Encode(#[from] serde_json::Error),

    /// Slot key is not usable as a storage name.
    #[error("invalid slot key: {0:?}")]
    InvalidKey(String),

    /// In-memory storage lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Errors from wishlist operations.
#[derive(Debug, Error)]
pub enum WishlistError {
    /// Transport failure (connect, timeout, decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The storefront answered with a non-success status.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// Local slot could not be written.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The guest wishlist is at its size cap.
    #[error("Your wishlist is full ({max} products). Sign in to save more.")]
    Full { max: usize },

    /// Storefront URL could not be joined with an API path.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl WishlistError {
    /// Whether the storefront rejected the request for lack of a session.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Status { status: 401, .. })
    }

    /// Message suitable for showing to the shopper.
    ///
    /// Server messages are passed through verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            Self::Http(e) if e.is_timeout() => "The storefront took too long to respond".to_string(),
            Self::Http(_) => "Could not reach the storefront".to_string(),
            Self::Full { .. } => self.to_string(),
            Self::Storage(_) => "Could not save your wishlist on this device".to_string(),
            Self::Url(e) => e.to_string(),
        }
    }
}

/// Errors loading client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}
