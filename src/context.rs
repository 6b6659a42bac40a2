//! Composition root for the client.
//!
//! One [`AppContext`] is constructed at startup and handed (or cloned)
//! into every screen. It owns the process-wide singletons: the auth
//! [`Session`], the REST [`ApiClient`], the [`CartStore`], and the one
//! [`OrderFeed`]. Lifecycle is explicit — [`connect`](AppContext::connect)
//! after construction, [`shutdown`](AppContext::shutdown) at process
//! exit — never a module-load side effect.

use std::io;
use std::path::{Path, PathBuf};

use crate::api::ApiClient;
use crate::cart::CartStore;
use crate::error::ApiError;
use crate::live::{FeedConfig, OrderFeed};
use crate::session::Session;

/// Default REST base URL for local development.
const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:4600/api/v1";

/// Default event-channel endpoint for local development.
const DEFAULT_EVENTS_ENDPOINT: &str = "http://127.0.0.1:4650";

/// Builder for configuring and constructing an [`AppContext`].
///
/// # Examples
///
/// ```no_run
/// use tableside::AppContextBuilder;
///
/// # fn example() -> Result<(), tableside::ApiError> {
/// let ctx = AppContextBuilder::new()
///     .api_base_url("https://host.example/api/v1")
///     .events_endpoint("https://events.host.example")
///     .base_dir("/var/lib/tableside")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct AppContextBuilder {
    api_base_url: Option<String>,
    events_endpoint: Option<String>,
    base_dir: Option<PathBuf>,
    feed_config: FeedConfig,
}

impl AppContextBuilder {
    /// Create a builder with local-development defaults.
    pub fn new() -> Self {
        Self {
            api_base_url: None,
            events_endpoint: None,
            base_dir: None,
            feed_config: FeedConfig::default(),
        }
    }

    /// Set the REST API base URL (e.g. `"https://host.example/api/v1"`).
    ///
    /// # Returns
    ///
    /// `self` for method chaining.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Set the event-channel endpoint URL.
    ///
    /// # Returns
    ///
    /// `self` for method chaining.
    pub fn events_endpoint(mut self, url: impl Into<String>) -> Self {
        self.events_endpoint = Some(url.into());
        self
    }

    /// Set the local directory for persisted carts.
    ///
    /// If not set, defaults to a system temp directory.
    ///
    /// # Returns
    ///
    /// `self` for method chaining.
    pub fn base_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.base_dir = Some(path.as_ref().to_owned());
        self
    }

    /// Override the feed's reconnection policy.
    ///
    /// If not called, [`FeedConfig::default()`] is used.
    ///
    /// # Returns
    ///
    /// `self` for method chaining.
    pub fn feed_config(mut self, config: FeedConfig) -> Self {
        self.feed_config = config;
        self
    }

    /// Construct the [`AppContext`].
    ///
    /// No network activity happens here; the event feed connects on
    /// [`AppContext::connect`] and the REST client on first request.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the HTTP client cannot be
    /// constructed.
    pub fn build(self) -> Result<AppContext, ApiError> {
        let session = Session::new();
        let api = ApiClient::new(
            self.api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            session.clone(),
        )?;
        let base_dir = self
            .base_dir
            .unwrap_or_else(|| std::env::temp_dir().join("tableside"));
        let carts = CartStore::open(base_dir);
        let feed = OrderFeed::new(
            self.events_endpoint
                .unwrap_or_else(|| DEFAULT_EVENTS_ENDPOINT.to_string()),
            session.clone(),
            self.feed_config,
        );

        Ok(AppContext {
            session,
            api,
            carts,
            feed,
        })
    }
}

impl Default for AppContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide context shared by every screen.
///
/// `Clone` is cheap and clones share state: the same session, the same
/// cookie jar, the same feed connection.
#[derive(Debug, Clone)]
pub struct AppContext {
    session: Session,
    api: ApiClient,
    carts: CartStore,
    feed: OrderFeed,
}

impl AppContext {
    /// The shared auth session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The REST client.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// The per-table cart store.
    pub fn carts(&self) -> &CartStore {
        &self.carts
    }

    /// The live order feed.
    pub fn feed(&self) -> &OrderFeed {
        &self.feed
    }

    /// Establish the event feed. Idempotent; any screen may call it.
    pub async fn connect(&self) {
        self.feed.connect().await;
    }

    /// Stop the event feed. Called once at process exit.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if the feed loop task panicked.
    pub async fn shutdown(&self) -> io::Result<()> {
        self.feed.shutdown().await
    }
}
