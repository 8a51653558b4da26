//! CLI command implementations.
//!
//! [`App`] is the application root: it owns the configured storage, API
//! client, identity and the single [`CartStore`] every command goes through.

pub mod cart;
pub mod products;

use std::sync::Arc;

use oakline_cart::CartError;
use oakline_cart::api::{ApiError, StoreApiClient};
use oakline_cart::config::{CartConfig, ConfigError, validate_token};
use oakline_cart::identity::SessionIdentity;
use oakline_cart::notify::TracingNotifier;
use oakline_cart::storage::FileStorage;
use oakline_cart::store::CartStore;
use thiserror::Error;
use tracing::debug;

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Cart(#[from] CartError),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Everything a command needs, wired once per invocation.
pub struct App {
    pub client: Arc<StoreApiClient>,
    pub store: CartStore,
    pub json: bool,
}

impl App {
    /// Build the application root.
    ///
    /// A `--token` flag takes precedence over `OAKLINE_API_TOKEN`; without
    /// either the session is anonymous and the cart lives on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is rejected or the HTTP client cannot be
    /// built.
    pub fn new(config: CartConfig, token: Option<String>, json: bool) -> Result<Self, CliError> {
        let token = match token {
            Some(token) => Some(validate_token(token, "--token")?),
            None => config.api_token,
        };
        let identity = Arc::new(token.map_or_else(
            SessionIdentity::anonymous,
            SessionIdentity::authenticated,
        ));

        let client = Arc::new(StoreApiClient::new(&config.api)?);
        debug!(
            api = %config.api.base_url,
            data_dir = %config.data_dir.display(),
            "Cart store configured"
        );

        let store = CartStore::new(
            Arc::new(FileStorage::new(config.data_dir)),
            &config.cart_key,
            client.clone(),
            identity,
            Arc::new(TracingNotifier),
        );

        Ok(Self {
            client,
            store,
            json,
        })
    }
}
