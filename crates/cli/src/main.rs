//! ComfyCube CLI - browse the catalog and manage a cart from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse
//! comfycube products --featured
//! comfycube products --category sofas
//! comfycube product p1
//!
//! # Account
//! comfycube signup Ada Lovelace -e ada@example.com -p secret1
//! comfycube signin -e ada@example.com -p secret1
//!
//! # Cart and wishlist
//! comfycube cart add p1 -q 2
//! comfycube cart
//! comfycube wishlist toggle p1
//! ```
//!
//! Session, cart and wishlist are kept in `COMFYCUBE_DATA_DIR` between runs.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout)]

use std::sync::Arc;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use comfycube_storefront::config::{AuthMode, ConfigError, StorefrontConfig};
use comfycube_storefront::session::AuthBackend;
use comfycube_storefront::storage::{FileStorage, Storage};
use comfycube_storefront::{Storefront, StorefrontError};

mod commands;

#[derive(Parser)]
#[command(name = "comfycube")]
#[command(author, version, about = "ComfyCube storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products
    Products {
        /// Only products in this category
        #[arg(short, long)]
        category: Option<String>,

        /// Only the featured products shown on the home page
        #[arg(long)]
        featured: bool,
    },
    /// List categories with product counts
    Categories,
    /// Show a product with similar products and reviews
    Product {
        /// Product ID
        id: String,
    },
    /// Review a product (requires sign-in)
    Review {
        /// Product ID
        id: String,

        /// Rating from 1 to 5
        #[arg(short, long)]
        rating: i64,

        /// Review text
        #[arg(short, long)]
        comment: String,
    },
    /// Sign in to an existing account
    Signin {
        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,
    },
    /// Create an account and sign in
    Signup {
        first_name: String,
        last_name: String,

        #[arg(short, long)]
        email: String,

        /// At least 6 characters
        #[arg(short, long)]
        password: String,

        /// Request an administrator account
        #[arg(long)]
        admin: bool,
    },
    /// Sign out
    Signout,
    /// Show the signed-in user
    Whoami,
    /// Show or change the cart
    Cart {
        #[command(subcommand)]
        action: Option<CartAction>,
    },
    /// Show or change the wishlist
    Wishlist {
        #[command(subcommand)]
        action: Option<WishlistAction>,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart lines and total
    Show,
    /// Add a product
    Add {
        id: String,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity; 0 removes it
    Update {
        id: String,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove { id: String },
    /// Remove every line
    Clear,
}

#[derive(Subcommand)]
enum WishlistAction {
    /// Show saved products
    Show,
    /// Save or unsave a product
    Toggle { id: String },
    /// Unsave a product
    Remove { id: String },
}

/// Errors that end a CLI run.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storefront(#[from] StorefrontError),
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for the library if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "comfycube_storefront=info,comfycube=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("{e}");
            std::process::exit(2);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = run(cli, config).await {
        report(&e);
        std::process::exit(1);
    }
}

/// Print a failure the way the storefront UI would surface it.
fn report(err: &CliError) {
    match err {
        CliError::Storefront(e) if e.requires_sign_in() => {
            println!("{}", e.user_message());
            println!("Please sign in: comfycube signin -e <email> -p <password>");
        }
        CliError::Storefront(e) => {
            tracing::debug!(error = %e, "Command failed");
            println!("{}", e.user_message());
        }
        CliError::Config(e) => tracing::error!("{e}"),
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CliError> {
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(config.data_dir.clone()));

    match config.auth_mode {
        AuthMode::Remote => {
            let storefront = Storefront::remote(&config.api, storage)?;
            dispatch(storefront, cli.command).await
        }
        AuthMode::Demo => {
            let storefront = Storefront::demo(&config.api, storage)?;
            dispatch(storefront, cli.command).await
        }
    }
}

async fn dispatch<A: AuthBackend>(
    mut storefront: Storefront<A>,
    command: Commands,
) -> Result<(), CliError> {
    match command {
        Commands::Products { category, featured } => {
            commands::catalog::products(&storefront, category.as_deref(), featured).await?;
        }
        Commands::Categories => commands::catalog::categories(&storefront).await?,
        Commands::Product { id } => commands::catalog::product(&storefront, &id).await?,
        Commands::Review {
            id,
            rating,
            comment,
        } => commands::catalog::review(&storefront, &id, rating, &comment).await?,
        Commands::Signin { email, password } => {
            commands::account::sign_in(&mut storefront, &email, &password).await?;
        }
        Commands::Signup {
            first_name,
            last_name,
            email,
            password,
            admin,
        } => {
            commands::account::sign_up(
                &mut storefront,
                &first_name,
                &last_name,
                &email,
                &password,
                admin,
            )
            .await?;
        }
        Commands::Signout => commands::account::sign_out(&mut storefront)?,
        Commands::Whoami => commands::account::whoami(&storefront),
        Commands::Cart { action } => match action.unwrap_or(CartAction::Show) {
            CartAction::Show => commands::cart::show(&storefront),
            CartAction::Add { id, quantity } => {
                commands::cart::add(&mut storefront, &id, quantity).await?;
            }
            CartAction::Update { id, quantity } => {
                commands::cart::update(&mut storefront, &id, quantity).await?;
            }
            CartAction::Remove { id } => commands::cart::remove(&mut storefront, &id).await?,
            CartAction::Clear => commands::cart::clear(&mut storefront).await?,
        },
        Commands::Wishlist { action } => match action.unwrap_or(WishlistAction::Show) {
            WishlistAction::Show => commands::wishlist::show(&storefront),
            WishlistAction::Toggle { id } => {
                commands::wishlist::toggle(&mut storefront, &id).await?;
            }
            WishlistAction::Remove { id } => {
                commands::wishlist::remove(&mut storefront, &id).await?;
            }
        },
    }
    Ok(())
}
