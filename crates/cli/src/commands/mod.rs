//! CLI command implementations.

pub mod migrate;
pub mod user;
pub mod wishlist;

use secrecy::SecretString;

/// Environment variable holding the account password for `user create` and
/// `wishlist merge`.
pub const PASSWORD_ENV: &str = "NECTAR_PASSWORD";

/// Read an environment variable that must be set and non-empty.
fn required_env(key: &'static str) -> Result<String, MissingEnvVar> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(MissingEnvVar(key))
}

/// Read the account password from `NECTAR_PASSWORD`.
fn password_from_env() -> Result<SecretString, MissingEnvVar> {
    required_env(PASSWORD_ENV).map(SecretString::from)
}

/// A required environment variable is unset or empty.
#[derive(Debug, thiserror::Error)]
#[error("Missing environment variable: {0}")]
pub struct MissingEnvVar(pub &'static str);
