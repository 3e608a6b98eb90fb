//! Nectar Core - Shared types library.
//!
//! This crate provides common types used across all Nectar components:
//! - `storefront` - HTTP API server (auth sessions, wishlist persistence)
//! - `wishlist` - Client-side wishlist reconciliation (guest vs. account)
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. Both sides of the wishlist wire contract live here so the
//! server and the client cannot drift apart.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, and wishlist wire types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
