//! Padharo webhook engine entry point.
//!
//! Wires configuration, the Postgres pool, and the external service
//! clients into the webhook router and serves it until SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use padharo::adapters::http::{health_router, webhook_router, HealthAppState, WebhookAppState};
use padharo::adapters::notifications::{HttpNotificationRelay, NotificationRelayConfig};
use padharo::adapters::postgres::{
    PostgresCatalogStore, PostgresPointsStore, PostgresProcessedEventStore, PostgresPromotionStore,
    PostgresSubscriptionStore,
};
use padharo::adapters::stripe::{StripeClient, StripeClientConfig};
use padharo::config::{AppConfig, ServerConfig};

#[tokio::main]
async fn main() {
    // Config (panics on missing required vars, fail-fast)
    let config = AppConfig::load().expect("failed to load configuration");

    init_tracing(&config);

    config.validate().expect("invalid configuration");

    // Database
    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .idle_timeout(config.database.idle_timeout())
        .max_lifetime(config.database.max_lifetime())
        .connect(&config.database.url)
        .await
        .expect("failed to connect to database");

    if config.database.run_migrations {
        info!("running pending database migrations");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("failed to run migrations");
    }

    // External services
    let stripe = StripeClient::new(StripeClientConfig::new(
        config.payment.stripe_api_key.clone(),
    ));
    let mut relay_config = NotificationRelayConfig::new(config.notifications.relay_url.clone());
    if let Some(token) = &config.notifications.relay_auth_token {
        relay_config = relay_config.with_auth_token(token.clone());
    }
    let relay = HttpNotificationRelay::new(relay_config);

    let webhook_state = WebhookAppState {
        processed_events: Arc::new(PostgresProcessedEventStore::new(pool.clone())),
        subscriptions: Arc::new(PostgresSubscriptionStore::new(pool.clone())),
        promotions: Arc::new(PostgresPromotionStore::new(pool.clone())),
        points: Arc::new(PostgresPointsStore::new(pool.clone())),
        catalog: Arc::new(PostgresCatalogStore::new(pool.clone())),
        payment_provider: Arc::new(stripe),
        notifications: Arc::new(relay),
        webhook_secret: config.payment.stripe_webhook_secret.clone(),
        features: config.features.clone(),
    };
    let health_state = HealthAppState { pool };

    // Router
    let app = axum::Router::new()
        .merge(webhook_router().with_state(webhook_state))
        .merge(health_router().with_state(health_state))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&config.server))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http());

    let addr = config.server.socket_addr().expect("invalid bind address");
    info!(environment = ?config.server.environment, "listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

/// Logging. `RUST_LOG` overrides the configured filter; production
/// environments emit JSON lines for the log pipeline.
fn init_tracing(config: &AppConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Specific origins when configured, permissive otherwise. The webhook
/// endpoint is server-to-server so CORS only matters for the health probe
/// and any dashboards pointed at it.
fn build_cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any)
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("received terminate signal, starting graceful shutdown");
        },
    }
}
