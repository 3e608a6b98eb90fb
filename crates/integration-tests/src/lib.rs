//! Integration tests for Nectar.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate and start the storefront; every test registers an account, so
//! # raise the auth burst above the default of 5
//! nectar-cli migrate storefront
//! STOREFRONT_AUTH_RATE_BURST=1000 cargo run -p nectar-storefront
//!
//! # Run the ignored end-to-end tests against it
//! cargo test -p nectar-integration-tests -- --ignored
//! ```
//!
//! `STOREFRONT_TEST_URL` points the tests at a different server
//! (default `http://localhost:3000`).
//!
//! # Test Categories
//!
//! - `storefront_api` - HTTP contract of the auth and wishlist endpoints
//! - `wishlist_merge` - anonymous → authenticated merge through the client

#![allow(clippy::expect_used, clippy::missing_panics_doc)]

use nectar_wishlist::{ClientConfig, HttpRemote};
use reqwest::Client;
use serde_json::json;
use url::Url;
use uuid::Uuid;

/// Password used for every throwaway test account.
pub const TEST_PASSWORD: &str = "integration-test-password";

/// Base URL for the storefront (configurable via environment).
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// An email address no other test run has used.
#[must_use]
pub fn unique_email() -> String {
    format!("test-{}@example.com", Uuid::new_v4().simple())
}

/// A cookie-keeping client with no session yet.
#[must_use]
pub fn anonymous_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Register a fresh account and return a client holding its session.
pub async fn registered_client() -> (Client, String) {
    let client = anonymous_client();
    let email = unique_email();

    let resp = client
        .post(format!("{}/api/auth/register", storefront_base_url()))
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .send()
        .await
        .expect("Failed to register test account");
    assert_eq!(resp.status(), reqwest::StatusCode::CREATED);

    (client, email)
}

/// Client configuration pointing the wishlist client at the test storefront.
#[must_use]
pub fn client_config() -> ClientConfig {
    let url: Url = format!("{}/", storefront_base_url().trim_end_matches('/'))
        .parse()
        .expect("Invalid STOREFRONT_TEST_URL");
    ClientConfig::new(url)
}

/// A wishlist remote for a freshly registered account, plus its email.
///
/// Registration leaves the remote signed in; call `logout` to test the
/// anonymous path first.
pub async fn registered_remote() -> (HttpRemote, String) {
    let remote = HttpRemote::new(&client_config()).expect("Failed to create remote");
    let email = unique_email();
    remote
        .register(&email, TEST_PASSWORD)
        .await
        .expect("Failed to register test account");
    (remote, email)
}
