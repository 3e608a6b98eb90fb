//! Nectar CLI - database migrations, accounts, and wishlist sync.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! nectar-cli migrate storefront
//!
//! # Create a storefront account (password from NECTAR_PASSWORD)
//! nectar-cli user create -e shopper@example.com
//!
//! # Show or edit this device's anonymous wishlist
//! nectar-cli wishlist show --storage-dir ~/.local/share/nectar
//! nectar-cli wishlist toggle -p p1 --storage-dir ~/.local/share/nectar
//!
//! # Sign in and move the anonymous wishlist into the account
//! nectar-cli wishlist merge -e shopper@example.com --storage-dir ~/.local/share/nectar
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "nectar-cli")]
#[command(author, version, about = "Nectar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        target: MigrateTarget,
    },
    /// Manage storefront accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Work with a device's wishlist
    Wishlist {
        #[command(subcommand)]
        action: WishlistAction,
    },
}

#[derive(Subcommand)]
enum MigrateTarget {
    /// Run storefront database migrations
    Storefront,
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new account (password from `NECTAR_PASSWORD`)
    Create {
        /// Account email address
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Print the anonymous wishlist stored on this device
    Show {
        /// Directory holding the local wishlist slot
        #[arg(long)]
        storage_dir: PathBuf,
    },
    /// Add or remove a product in the anonymous wishlist
    Toggle {
        /// Product ID
        #[arg(short, long)]
        product: String,

        /// Directory holding the local wishlist slot
        #[arg(long)]
        storage_dir: PathBuf,
    },
    /// Sign in and merge the anonymous wishlist into the account
    Merge {
        /// Account email address (password from `NECTAR_PASSWORD`)
        #[arg(short, long)]
        email: String,

        /// Directory holding the local wishlist slot
        #[arg(long)]
        storage_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nectar_cli=info,nectar_wishlist=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate { target } => match target {
            MigrateTarget::Storefront => commands::migrate::storefront().await?,
        },
        Commands::User { action } => match action {
            UserAction::Create { email } => {
                commands::user::create(&email).await?;
            }
        },
        Commands::Wishlist { action } => match action {
            WishlistAction::Show { storage_dir } => commands::wishlist::show(storage_dir)?,
            WishlistAction::Toggle {
                product,
                storage_dir,
            } => commands::wishlist::toggle(&product, storage_dir).await?,
            WishlistAction::Merge { email, storage_dir } => {
                commands::wishlist::merge(&email, storage_dir).await?;
            }
        },
    }
    Ok(())
}
