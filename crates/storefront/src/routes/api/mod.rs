//! JSON API endpoints.

pub mod auth;
pub mod wishlist;
