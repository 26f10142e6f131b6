//! Request Tracker Backend
//!
//! REST backend that keeps one list of Patreon art requests in step across a Google Sheet,
//! its published CSV export, a persistent client cache and an Excel export.

mod api;
mod auth;
mod cache;
mod config;
mod db;
mod errors;
mod models;
mod normalize;
mod sources;
mod stats;
mod sync;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cache::ClientCache;
use config::Config;
use db::KvStore;
use sources::{CsvAdapter, ExcelExporter, LocalStore, RequestSource, SheetsAdapter};
use sync::SyncOrchestrator;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<SyncOrchestrator>,
    /// Raw key-value store, for documents outside the request cache
    pub kv: KvStore,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire the adapters described by `config` around `kv`.
    ///
    /// `sheets` is taken separately so callers can supply their own Sheets client.
    pub fn build(
        config: Config,
        kv: KvStore,
        sheets: Arc<dyn RequestSource>,
        http: reqwest::Client,
    ) -> Self {
        let cache = ClientCache::new(LocalStore::new(kv.clone(), config.storage_key.clone()));
        let csv = Arc::new(CsvAdapter::new(http, config.csv_url.clone()));
        let exporter = ExcelExporter::new(config.export_path.clone());

        Self {
            sync: Arc::new(SyncOrchestrator::new(sheets, csv, cache, exporter)),
            kv,
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Request Tracker Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Export path: {:?}", config.export_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (TRACKER_API_PSK). Authentication is disabled!");
    }
    if config.sheets.spreadsheet_id.is_none() {
        tracing::warn!("GOOGLE_SPREADSHEET_ID not set, updates will only reach the client cache");
    } else if config.sheets.access_token.is_none()
        && (config.sheets.client_email.is_none() || config.sheets.private_key.is_none())
    {
        tracing::warn!(
            "No Sheets credentials (GOOGLE_SHEETS_ACCESS_TOKEN or GOOGLE_CLIENT_EMAIL + GOOGLE_PRIVATE_KEY)"
        );
    }
    if config.csv_url.is_none() {
        tracing::info!("GOOGLE_SHEETS_CSV_URL not set, CSV fallback disabled");
    }

    let pool = db::init_database(&config.db_path).await?;
    let http = reqwest::Client::new();
    let sheets = Arc::new(SheetsAdapter::from_config(http.clone(), &config.sheets));

    let bind_addr = config.bind_addr;
    let state = AppState::build(config, KvStore::new(pool), sheets, http);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Requests
        .route(
            "/requests",
            get(api::list_requests)
                .put(api::update_request)
                .post(api::create_request),
        )
        .route("/requests/{id}", delete(api::delete_request))
        // Excel export
        .route("/sync", post(api::export_requests))
        // Client cache
        .route(
            "/cache",
            get(api::get_cache)
                .put(api::put_cache)
                .delete(api::reset_cache),
        )
        .route("/cache/seed", post(api::seed_cache))
        .route("/commits", get(api::list_commits))
        // Dashboard
        .route("/stats", get(api::get_stats))
        .route("/options", get(api::get_options))
        .route(
            "/colab-accounts",
            get(api::list_accounts).put(api::put_accounts),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_psk,
        ));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
