//! E-Shop CLI - offline cache and cart maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Fetch the app shell into the current cache bucket
//! eshop-cli cache warm --origin http://127.0.0.1:3000
//!
//! # Delete every bucket except the current one
//! eshop-cli cache activate
//!
//! # List buckets (and their entries)
//! eshop-cli cache list --entries
//!
//! # Show or empty the persisted cart
//! eshop-cli cart show
//! eshop-cli cart clear
//! ```
//!
//! # Commands
//!
//! - `cache warm` - Install the shell manifest into the current bucket
//! - `cache activate` - Prune stale buckets
//! - `cache list` - List buckets
//! - `cart show` - Print the persisted cart
//! - `cart clear` - Empty the persisted cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use eshop_offline::manifest::CACHE_NAME;
use url::Url;

mod commands;

#[derive(Parser)]
#[command(name = "eshop-cli")]
#[command(author, version, about = "E-Shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the offline cache buckets
    Cache {
        #[command(flatten)]
        location: CacheLocation,

        #[command(subcommand)]
        action: CacheAction,
    },
    /// Inspect the persisted cart
    Cart {
        /// Directory holding `ecommerce_cart.json`
        #[arg(long, env = "STOREFRONT_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        #[command(subcommand)]
        action: CartAction,
    },
}

/// Where the disk cache lives and which bucket is current.
#[derive(Args)]
struct CacheLocation {
    /// Cache root directory
    #[arg(long, env = "OFFLINE_CACHE_DIR", default_value = "cache")]
    cache_dir: PathBuf,

    /// Current bucket name
    #[arg(long, env = "OFFLINE_CACHE_VERSION", default_value = CACHE_NAME)]
    cache_version: String,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Fetch every shell asset into the current bucket
    Warm {
        /// Storefront origin the shell is fetched from
        #[arg(long, env = "OFFLINE_ORIGIN")]
        origin: Url,

        /// Extra hosts treated as the app's own (comma-separated)
        #[arg(
            long,
            env = "OFFLINE_ALLOWED_HOSTS",
            default_value = "placehold.co",
            value_delimiter = ','
        )]
        allowed_hosts: Vec<String>,
    },
    /// Delete every bucket except the current one
    Activate,
    /// List buckets
    List {
        /// Also list the requests stored in each bucket
        #[arg(long)]
        entries: bool,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Print the cart lines, count, and total
    Show,
    /// Empty the cart
    Clear,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Cache { location, action } => {
            let storage = commands::cache::open(&location.cache_dir).await?;
            match action {
                CacheAction::Warm {
                    origin,
                    allowed_hosts,
                } => {
                    let manager = commands::cache::http_manager(
                        storage,
                        origin,
                        allowed_hosts,
                        &location.cache_version,
                    )?;
                    commands::cache::warm(&manager).await?;
                }
                CacheAction::Activate => {
                    commands::cache::activate(&storage, &location.cache_version).await?;
                }
                CacheAction::List { entries } => {
                    commands::cache::list(&storage, &location.cache_version, entries).await?;
                }
            }
        }
        Commands::Cart { data_dir, action } => match action {
            CartAction::Show => {
                commands::cart::show(&data_dir).await?;
            }
            CartAction::Clear => commands::cart::clear(&data_dir).await?,
        },
    }
    Ok(())
}
