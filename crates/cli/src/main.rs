//! Oakline CLI - a terminal front end for the cart store.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! oakline products --category 4
//!
//! # Anonymous cart, persisted under OAKLINE_DATA_DIR
//! oakline cart add 12 -q 2
//! oakline cart show
//!
//! # Sign in: the local cart is merged into the account cart
//! oakline --token "$OAKLINE_API_TOKEN" cart sync
//! ```
//!
//! # Commands
//!
//! - `products` - List catalog products
//! - `cart show|add|remove|set|clear|sync` - Cart operations

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use oakline_cart::config::CartConfig;
use oakline_core::{CategoryId, ProductId};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "oakline")]
#[command(author, version, about = "Oakline storefront cart")]
struct Cli {
    /// Bearer token of the signed-in customer (overrides `OAKLINE_API_TOKEN`)
    #[arg(long, global = true)]
    token: Option<String>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List catalog products
    Products {
        /// Only products in this category
        #[arg(short, long)]
        category: Option<CategoryId>,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        product_id: ProductId,

        /// Quantity to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove a product
    Remove { product_id: ProductId },
    /// Set the quantity of a product (0 or below removes it)
    Set {
        product_id: ProductId,

        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove everything
    Clear,
    /// Apply the current sign-in state, merging the local cart if needed
    Sync,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CartConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "oakline_cart=info,oakline_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Sentry must be initialized before the tracing subscriber
    let config = CartConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing();

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: CartConfig) -> Result<(), commands::CliError> {
    let mut app = commands::App::new(config, cli.token, cli.json)?;

    match cli.command {
        Commands::Products { category } => commands::products::list(&app, category).await,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(&mut app).await,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(&mut app, product_id, quantity).await,
            CartAction::Remove { product_id } => commands::cart::remove(&mut app, product_id).await,
            CartAction::Set {
                product_id,
                quantity,
            } => commands::cart::set(&mut app, product_id, quantity).await,
            CartAction::Clear => commands::cart::clear(&mut app).await,
            CartAction::Sync => commands::cart::sync(&mut app).await,
        },
    }
}
