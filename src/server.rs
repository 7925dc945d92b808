//! # Server Configuration
//!
//! Router assembly, shared application state and the serve loop.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{Method, header},
    middleware,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::crypto::CryptoKey;
use crate::handlers::{app, callback, erp_config, health, sync, webhooks};
use crate::handshake::{InstallationHandshake, TokenExchangeCredentials};
use crate::repositories::{
    ErpConfigRepository, InstallationRepository, InstallationStore, StoreDataRepository,
    SyncOperationRepository,
};
use crate::telemetry::trace_context_middleware;

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub crypto_key: CryptoKey,
    pub handshake: InstallationHandshake,
    /// `None` when the profile allows running without client credentials
    pub credentials: Option<TokenExchangeCredentials>,
    pub installations: Arc<dyn InstallationStore>,
}

impl AppState {
    /// Builds the state from loaded configuration and an open database pool.
    pub fn new(config: Arc<AppConfig>, db: DatabaseConnection) -> Result<Self> {
        let key_bytes = config
            .crypto_key
            .clone()
            .context("crypto key not present in configuration")?;
        let crypto_key = CryptoKey::new(key_bytes).context("initializing crypto key")?;
        let handshake =
            InstallationHandshake::from_config(&config).context("building token exchange client")?;

        let credentials = match config.credentials() {
            Ok(credentials) => Some(credentials),
            Err(err) => {
                tracing::warn!(error = %err, "Installation callback disabled");
                None
            }
        };

        let db = Arc::new(db);
        let installations = Arc::new(InstallationRepository::new(
            Arc::clone(&db),
            crypto_key.clone(),
        ));

        Ok(Self {
            config,
            db,
            crypto_key,
            handshake,
            credentials,
            installations,
        })
    }

    /// Replaces the storage used by the installation callback.
    pub fn with_installation_store(mut self, store: Arc<dyn InstallationStore>) -> Self {
        self.installations = store;
        self
    }

    pub fn installation_repository(&self) -> InstallationRepository {
        InstallationRepository::new(Arc::clone(&self.db), self.crypto_key.clone())
    }

    pub fn erp_configs(&self) -> ErpConfigRepository {
        ErpConfigRepository::new(Arc::clone(&self.db), self.crypto_key.clone())
    }

    pub fn sync_operations(&self) -> SyncOperationRepository {
        SyncOperationRepository::new(Arc::clone(&self.db))
    }

    pub fn store_data(&self) -> StoreDataRepository {
        StoreDataRepository::new(Arc::clone(&self.db))
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(app::serve_app))
        .route("/app", get(app::serve_app))
        .route("/api/callback", get(callback::installation_callback))
        .route(
            "/api/erp-config",
            get(erp_config::get_erp_config).post(erp_config::save_erp_config),
        )
        .route(
            "/api/sync-products",
            get(sync::sync_history).post(sync::start_product_sync),
        )
        .route("/api/webhooks/store-redact", post(webhooks::store_redact))
        .route(
            "/api/webhooks/customers-redact",
            post(webhooks::customers_redact),
        )
        .route(
            "/api/webhooks/customers-data-request",
            post(webhooks::customers_data_request),
        )
        .route("/api/test", get(health::test_endpoint))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

/// Starts the server with the given configuration
pub async fn run_server(config: Arc<AppConfig>, db: DatabaseConnection) -> Result<()> {
    let addr = config
        .bind_addr()
        .with_context(|| format!("Invalid server address: {}", config.api_bind_addr))?;

    let state = AppState::new(Arc::clone(&config), db)?;
    let app = create_app(state);

    tracing::warn!(
        "Privacy webhooks under /api/webhooks accept unauthenticated requests; request signatures are not verified"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, profile = %config.profile, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::app::serve_app,
        crate::handlers::callback::installation_callback,
        crate::handlers::erp_config::get_erp_config,
        crate::handlers::erp_config::save_erp_config,
        crate::handlers::sync::start_product_sync,
        crate::handlers::sync::sync_history,
        crate::handlers::webhooks::store_redact,
        crate::handlers::webhooks::customers_redact,
        crate::handlers::webhooks::customers_data_request,
        crate::handlers::health::test_endpoint,
    ),
    components(
        schemas(
            crate::error::ApiError,
            crate::handlers::types::SuccessResponse,
            crate::handlers::erp_config::ErpConfigStatus,
            crate::handlers::erp_config::SaveErpConfigRequest,
            crate::handlers::sync::StartSyncRequest,
            crate::handlers::sync::SyncStartedResponse,
            crate::handlers::sync::SyncHistoryEntry,
            crate::handlers::sync::SyncHistoryResponse,
            crate::handlers::webhooks::StoreRedactRequest,
            crate::handlers::webhooks::CustomerRef,
            crate::handlers::webhooks::CustomerRedactRequest,
            crate::handlers::webhooks::CustomerDataRequest,
            crate::handlers::webhooks::StoreRedactResponse,
            crate::handlers::webhooks::CustomerRedactResponse,
            crate::handlers::webhooks::DataReport,
            crate::handlers::webhooks::CustomerDataResponse,
            crate::handlers::health::HealthReport,
        )
    ),
    info(
        title = "Nuvemshop ERP Bridge",
        description = "App installation, ERP settings, product sync bookkeeping and privacy webhooks",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
