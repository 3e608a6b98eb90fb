//! Nectar wishlist reconciliation.
//!
//! Decides which store is authoritative for a shopper's saved products and
//! moves the anonymous list into the account once, at login.
//!
//! - Anonymous: a device-local slot ([`LocalStorage`]) holds the list. Toggles
//!   are written through immediately and never touch the network.
//! - Authenticated: the storefront holds the list ([`RemoteWishlist`]). Reads
//!   come from a cached view that is invalidated after every successful
//!   toggle.
//! - Anonymous → authenticated: the local list is added to the account as a
//!   concurrent batch, the slot is cleared, and one [`Notice::Synced`] is
//!   broadcast.
//!
//! # Example
//!
//! ```rust,ignore
//! use nectar_wishlist::{ClientConfig, FileStorage, HttpRemote, Wishlist};
//!
//! let config = ClientConfig::from_env()?;
//! let remote = HttpRemote::new(&config)?;
//! let mut wishlist = Wishlist::new(FileStorage::new("/var/lib/nectar"), remote.clone(), &config);
//!
//! wishlist.toggle(&"p1".parse()?).await?;
//!
//! remote.login("shopper@example.com", "correct horse").await?;
//! if let Some(report) = wishlist.observe_auth(true).await {
//!     tracing::info!(failed = report.failed.len(), "merged");
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod merge;
pub mod notice;
pub mod remote;
pub mod storage;
pub mod store;
pub mod wishlist;

#[cfg(test)]
mod testing;

pub use config::ClientConfig;
pub use error::{ConfigError, StorageError, WishlistError};
pub use merge::{MergePolicy, MergeReport};
pub use notice::Notice;
pub use remote::{Account, HttpRemote, RemoteWishlist};
pub use storage::{FileStorage, LocalStorage, MemoryStorage};
pub use store::{ActiveStore, LocalSet, RemoteView};
pub use wishlist::{LoadingHandle, Toggled, Wishlist};
