//! Storefront HTTP client.
//!
//! Holds the session cookie, so one `HttpRemote` is one shopper session.
//! Clones share the cookie jar.

use std::sync::Arc;

use nectar_core::{ProductId, WishlistItemRequest, WishlistProductIds};
use reqwest::Method;
use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use super::{Account, RemoteWishlist};
use crate::config::ClientConfig;
use crate::error::WishlistError;

const WISHLIST_PATH: &str = "api/wishlist";

/// HTTP implementation of [`RemoteWishlist`] plus the session endpoints.
#[derive(Clone)]
pub struct HttpRemote {
    inner: Arc<HttpRemoteInner>,
}

struct HttpRemoteInner {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

impl HttpRemote {
    /// Create a client for the configured storefront.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, WishlistError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(HttpRemoteInner {
                client,
                base_url: config.storefront_url.clone(),
            }),
        })
    }

    /// Start a session with email and password.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Status` with the server's message on rejection.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Account, WishlistError> {
        let response = self
            .request(Method::POST, "api/auth/login")?
            .json(&Credentials { email, password })
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Create an account and start a session for it.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::Status` with the server's message on rejection.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<Account, WishlistError> {
        let response = self
            .request(Method::POST, "api/auth/register")?
            .json(&Credentials { email, password })
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// End the session.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError` on transport failure or a non-success status.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), WishlistError> {
        let response = self.request(Method::POST, "api/auth/logout")?.send().await?;
        check(response).await?;
        Ok(())
    }

    /// The session's account, or `None` when not signed in.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError` on transport failure or an unexpected status.
    #[instrument(skip(self))]
    pub async fn me(&self) -> Result<Option<Account>, WishlistError> {
        let response = self.request(Method::GET, "api/auth/me")?.send().await?;
        match check(response).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(e) if e.is_unauthorized() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Whether the session is signed in.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError` on transport failure or an unexpected status.
    pub async fn is_authenticated(&self) -> Result<bool, WishlistError> {
        Ok(self.me().await?.is_some())
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, WishlistError> {
        let url = self.inner.base_url.join(path)?;
        Ok(self.inner.client.request(method, url))
    }

    async fn send_item(&self, method: Method, product_id: &ProductId) -> Result<(), WishlistError> {
        let body = WishlistItemRequest::new(product_id.clone());
        let response = self.request(method, WISHLIST_PATH)?.json(&body).send().await?;
        let response = check(response).await?;
        debug!(status = %response.status(), "Wishlist updated");
        Ok(())
    }
}

impl RemoteWishlist for HttpRemote {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<ProductId>, WishlistError> {
        let response = self.request(Method::GET, WISHLIST_PATH)?.send().await?;
        let body: WishlistProductIds = check(response).await?.json().await?;
        Ok(body.product_ids)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn add(&self, product_id: &ProductId) -> Result<(), WishlistError> {
        self.send_item(Method::POST, product_id).await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn remove(&self, product_id: &ProductId) -> Result<(), WishlistError> {
        self.send_item(Method::DELETE, product_id).await
    }
}

/// Turn a non-success response into an error carrying the body text.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, WishlistError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        body
    };

    debug!(status = %status, message = %message, "Storefront rejected request");
    Err(WishlistError::Status {
        status: status.as_u16(),
        message,
    })
}
