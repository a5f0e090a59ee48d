//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all gateway handler
//! - Wire up middleware (request id, tracing, request timeout)
//! - Resolve the path to a service and buffer the body
//! - Start the health prober and admin listener next to the main listener
//! - Stop everything on the shutdown broadcast

use std::sync::Arc;
use std::time::{Duration, Instant};
use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::GatewayConfig;
use crate::health::HealthProber;
use crate::http::request::{inbound_request, request_id, MakeRequestUuid};
use crate::observability::metrics;
use crate::proxy::Gateway;
use crate::routing::Router as ServiceRouter;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub router: Arc<ServiceRouter>,
    pub max_body_bytes: usize,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    gateway: Arc<Gateway>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let gateway = Arc::new(Gateway::from_config(&config));
        Self::with_gateway(config, gateway)
    }

    /// Create a server around an already built gateway.
    pub fn with_gateway(config: GatewayConfig, gateway: Arc<Gateway>) -> Self {
        let state = AppState {
            gateway: gateway.clone(),
            router: Arc::new(ServiceRouter::default()),
            max_body_bytes: config.listener.max_body_bytes,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            gateway,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(gateway_handler))
            .route("/", any(gateway_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TraceLayer::new_for_http())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let prober = if self.config.health_check.enabled {
            let prober = HealthProber::from_config(self.gateway.registry().clone(), &self.config);
            Some(prober.spawn(shutdown.resubscribe()))
        } else {
            tracing::info!("Health checks disabled");
            None
        };

        if self.config.admin.enabled {
            let admin_listener = TcpListener::bind(&self.config.admin.bind_address).await?;
            let admin_app = setup_admin_router(self.gateway.clone());
            let mut admin_shutdown = shutdown.resubscribe();
            tracing::info!(address = %self.config.admin.bind_address, "Admin API listening");
            tokio::spawn(async move {
                let result = axum::serve(admin_listener, admin_app)
                    .with_graceful_shutdown(async move {
                        let _ = admin_shutdown.recv().await;
                    })
                    .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Admin server failed");
                }
            });
        }

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        if let Some(handle) = prober {
            let _ = handle.await;
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    /// The router with all layers, for driving the server without a socket.
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Resolves the service, buffers the body and hands off to the gateway.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let request_id = request_id(&request).to_string();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        path = %path,
        "Gateway request"
    );

    let Some(route) = state.router.resolve(&path) else {
        tracing::warn!(request_id = %request_id, path = %path, "No route matched");
        metrics::record_request("none", 404, start);
        return (StatusCode::NOT_FOUND, "No matching route found").into_response();
    };

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id,
                limit = state.max_body_bytes,
                error = %e,
                "Failed to buffer request body"
            );
            metrics::record_request(route.route.name, 413, start);
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response();
        }
    };

    let inbound = inbound_request(&route, parts, body);
    state.gateway.handle(inbound).await.into_response()
}
