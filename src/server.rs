use std::sync::Arc;

use anyhow::Context;
use axum::{http::HeaderValue, middleware::from_fn_with_state, routing::get, Router};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{AppConfig, Environment};
use crate::handlers;
use crate::middleware::{gate_middleware, CookiePolicy, Gate};
use crate::routes::RouteTable;
use crate::validator::{HttpIdentityClient, TokenValidator};

/// Everything the router needs, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub gate: Arc<Gate>,
}

impl AppState {
    pub fn new(config: AppConfig, routes: RouteTable, validator: Arc<dyn TokenValidator>) -> Self {
        let gate = Gate::new(
            Arc::new(routes),
            validator,
            CookiePolicy::from_config(&config.gate),
            config.gate.login_path.clone(),
        );

        Self {
            config: Arc::new(config),
            gate: Arc::new(gate),
        }
    }

    /// Build the production wiring: route table from file or defaults, HTTP identity client.
    pub fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let routes = RouteTable::from_config(&config.gate).context("loading route table")?;

        let validator = HttpIdentityClient::from_config(&config.gate)
            .with_context(|| format!("invalid backend url '{}'", config.gate.backend_url))?;

        Ok(Self::new(config, routes, Arc::new(validator)))
    }
}

pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(handlers::public::root))
        .route("/health", get(handlers::public::health))
        // Authenticated
        .route("/api/session", get(handlers::protected::session))
        // Every other page goes through the gate to the page renderer
        .fallback(handlers::protected::page)
        .layer(from_fn_with_state(state.gate.clone(), gate_middleware));

    if state.config.server.enable_cors {
        router = router.layer(cors_layer(&state.config));
    }
    if state.config.server.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }

    router
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.environment == Environment::Development {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new().allow_origin(AllowOrigin::list(origins))
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let bind_addr = format!("0.0.0.0:{}", state.config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Booking gate listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server error")
}
