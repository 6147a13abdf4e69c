//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{DbAdapter, GoogleTokenVerifier, LocalStore, QuranCloudAdapter},
    config::{AccountBackend, Config},
    error::ApiError,
    web::{
        auth::{google_login_handler, login_handler, logout_handler, signup_handler},
        get_surah_handler, health_handler, list_surahs_handler, me_handler,
        middleware::require_auth,
        record_history_handler,
        rest::ApiDoc,
        state::AppState,
    },
};
use axum::http::{
    header::{ACCEPT, CONTENT_TYPE},
    HeaderValue, Method,
};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use noor_core::ports::{AccountStore, IdentityProvider};
use noor_core::{Accounts, ChapterLoader};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

async fn account_store(config: &Config) -> Result<Arc<dyn AccountStore>, ApiError> {
    match &config.account_backend {
        AccountBackend::Postgres { database_url } => {
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            let db_adapter = DbAdapter::new(db_pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Ok(Arc::new(db_adapter))
        }
        AccountBackend::Local { path } => {
            info!("Using local account store at {}", path.display());
            Ok(Arc::new(LocalStore::open(path).await?))
        }
    }
}

async fn shutdown_signal(token: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutdown signal received");
            token.cancel();
        }
        _ = token.cancelled() => {}
    }
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Account Storage ---
    let store = account_store(&config).await?;

    // --- 3. Initialize Service Adapters ---
    let content = QuranCloudAdapter::new(
        &config.quran_api_base_url,
        config.editions.clone(),
        config.http_timeout,
    )?;
    let chapters = Arc::new(ChapterLoader::new(Arc::new(content), config.merge_policy));

    let identity: Option<Arc<dyn IdentityProvider>> = match &config.google_client_id {
        Some(client_id) => Some(Arc::new(GoogleTokenVerifier::new(client_id, config.http_timeout)?)),
        None => {
            warn!("GOOGLE_CLIENT_ID is not set; Google sign-in is disabled");
            None
        }
    };

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        accounts: Accounts::new(store, identity),
        chapters,
    });

    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {}", e)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let public_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/surahs", get(list_surahs_handler))
        .route("/surahs/{number}", get(get_surah_handler))
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/google", post(google_login_handler))
        .route("/auth/logout", post(logout_handler));

    let protected_routes = Router::new()
        .route("/me", get(me_handler))
        .route("/me/history", post(record_history_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors)
        .with_state(app_state);

    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    info!("Server stopped");
    Ok(())
}
