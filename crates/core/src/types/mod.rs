//! Core types for Nectar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod wishlist;

pub use email::{Email, EmailError};
pub use id::*;
pub use wishlist::{MAX_GUEST_WISHLIST_ITEMS, WishlistItem, WishlistItemRequest, WishlistProductIds};
