//! Storefront account commands.
//!
//! # Usage
//!
//! ```bash
//! NECTAR_PASSWORD='correct horse battery' nectar-cli user create -e shopper@example.com
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//! - `NECTAR_PASSWORD` - Password for the new account

use nectar_core::UserId;
use nectar_storefront::services::{AuthError, AuthService};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use thiserror::Error;

use super::MissingEnvVar;
use super::migrate::storefront_database_url;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a storefront account with a password.
///
/// # Errors
///
/// Returns `UserError::Auth` if the email is invalid, the password is too
/// weak, or the account already exists.
pub async fn create(email: &str) -> Result<UserId, UserError> {
    dotenvy::dotenv().ok();

    let password = super::password_from_env()?;
    let database_url = storefront_database_url()?;

    tracing::info!("Connecting to storefront database...");
    let pool = PgPool::connect(&database_url).await?;

    let user = AuthService::new(&pool)
        .register_with_password(email, password.expose_secret())
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "Account created");
    Ok(user.id)
}
