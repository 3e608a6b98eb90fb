//! Device wishlist commands.
//!
//! `--storage-dir` plays the role of the device's local storage: the
//! anonymous wishlist lives in `<dir>/nectar.wishlist.json` (or the slot
//! named by `NECTAR_WISHLIST_SLOT`).
//!
//! # Environment Variables
//!
//! - `NECTAR_STOREFRONT_URL` - Storefront base URL
//! - `NECTAR_PASSWORD` - Account password for `merge`
//! - `NECTAR_WISHLIST_MERGE_POLICY` - `retain` or `discard`

use std::path::PathBuf;

use nectar_core::{ProductId, ProductIdError};
use nectar_wishlist::{
    ClientConfig, ConfigError, FileStorage, HttpRemote, LocalSet, Notice, Toggled, Wishlist,
    WishlistError,
};
use secrecy::ExposeSecret;
use thiserror::Error;

use super::MissingEnvVar;

/// Errors that can occur during wishlist commands.
#[derive(Debug, Error)]
pub enum WishlistCommandError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVar),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid product ID: {0}")]
    InvalidProduct(#[from] ProductIdError),

    #[error(transparent)]
    Wishlist(#[from] WishlistError),
}

/// Print the anonymous wishlist.
///
/// # Errors
///
/// Returns `WishlistCommandError::Config` if the client configuration is invalid.
pub fn show(storage_dir: PathBuf) -> Result<(), WishlistCommandError> {
    let config = ClientConfig::from_env()?;
    let local = LocalSet::load(&FileStorage::new(storage_dir), &config.slot_key);

    #[allow(clippy::print_stdout)]
    {
        if local.is_empty() {
            println!("Wishlist is empty");
        }
        for id in local.ids() {
            println!("{id}");
        }
    }
    Ok(())
}

/// Toggle a product in the anonymous wishlist.
///
/// # Errors
///
/// Returns `WishlistCommandError` if the product ID is invalid or the slot
/// cannot be written.
pub async fn toggle(product: &str, storage_dir: PathBuf) -> Result<(), WishlistCommandError> {
    let config = ClientConfig::from_env()?;
    let product_id = ProductId::parse(product)?;

    let remote = HttpRemote::new(&config)?;
    let mut wishlist = Wishlist::new(FileStorage::new(storage_dir), remote, &config);

    let toggled = wishlist.toggle(&product_id).await?;

    #[allow(clippy::print_stdout)]
    {
        match toggled {
            Toggled::Added => println!("Saved {product_id}"),
            Toggled::Removed => println!("Removed {product_id}"),
        }
    }
    Ok(())
}

/// Sign in and run the anonymous → authenticated transition.
///
/// # Errors
///
/// Returns `WishlistCommandError` if sign-in fails. Individual item failures
/// are reported, not returned.
pub async fn merge(email: &str, storage_dir: PathBuf) -> Result<(), WishlistCommandError> {
    let config = ClientConfig::from_env()?;
    let password = super::password_from_env()?;

    let remote = HttpRemote::new(&config)?;
    let mut wishlist = Wishlist::new(FileStorage::new(storage_dir), remote.clone(), &config);
    let mut notices = wishlist.subscribe();

    let account = remote.login(email, password.expose_secret()).await?;
    tracing::info!(user_id = %account.id, "Signed in");

    let report = wishlist.observe_auth(remote.is_authenticated().await?).await;
    let ids = wishlist.product_ids().await?;

    #[allow(clippy::print_stdout)]
    {
        match report {
            Some(report) => {
                println!(
                    "Merged {} of {} item(s)",
                    report.succeeded.len(),
                    report.total()
                );
                for id in &report.failed {
                    println!("  not saved: {id}");
                }
            }
            None => println!("Nothing to merge"),
        }
        while let Ok(notice) = notices.try_recv() {
            if let Notice::Synced { .. } = notice {
                println!("{notice}");
            }
        }
        println!("Account wishlist ({} item(s)):", ids.len());
        for id in ids {
            println!("  {id}");
        }
    }
    Ok(())
}
