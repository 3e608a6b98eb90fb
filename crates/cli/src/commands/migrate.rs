//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! nectar-cli migrate storefront
//! ```
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! Migration files live in `crates/storefront/migrations/` and are embedded
//! at compile time.

use sqlx::PgPool;
use thiserror::Error;

use super::MissingEnvVar;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database is unreachable or a migration fails.
pub async fn storefront() -> Result<(), MigrationError> {
    dotenvy::dotenv().ok();

    let database_url = storefront_database_url()?;

    tracing::info!("Connecting to storefront database...");
    let pool = PgPool::connect(&database_url).await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Storefront migrations complete");
    Ok(())
}

/// `STOREFRONT_DATABASE_URL`, falling back to `DATABASE_URL`.
pub(crate) fn storefront_database_url() -> Result<String, MissingEnvVar> {
    super::required_env("STOREFRONT_DATABASE_URL")
        .or_else(|_| super::required_env("DATABASE_URL"))
        .map_err(|_| MissingEnvVar("STOREFRONT_DATABASE_URL"))
}
