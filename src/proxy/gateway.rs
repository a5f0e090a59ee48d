//! Gateway entry point for resolved requests.
//!
//! # Data Flow
//! ```text
//! InboundRequest (service, method, path, query, body, headers)
//!     → method check (GET/POST/PUT/DELETE, else 405)
//!     → circuit breaker of the service
//!     → forwarder (select, forward, fail over)
//!     → ProxyResponse: backend response verbatim, or 503 fallback
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::load_balancer::{InstanceRegistry, Selector};
use crate::observability::metrics;
use crate::proxy::forwarder::Forwarder;
use crate::proxy::headers::forwardable_response_headers;
use crate::proxy::transport::{HyperTransport, Transport, UpstreamResponse};
use crate::resilience::{CircuitBreaker, CircuitBreakerPolicy, CircuitState};
use crate::routing::{ServiceRoute, SERVICE_ROUTES};

const FORWARDED_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

/// A request already resolved to a service.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub service: String,
    pub method: Method,
    /// Path after the service prefix, possibly empty.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    pub body: Option<Bytes>,
    pub headers: HeaderMap,
}

/// What the caller receives.
#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Set when the response was synthesized by the gateway.
    pub error: Option<String>,
}

impl ProxyResponse {
    fn synthetic(status: StatusCode, body: String, error: String) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        Self {
            status,
            headers,
            body: Bytes::from(body),
            error: Some(error),
        }
    }
}

impl From<UpstreamResponse> for ProxyResponse {
    fn from(response: UpstreamResponse) -> Self {
        Self {
            status: response.status,
            headers: forwardable_response_headers(&response.headers),
            body: response.body,
            error: None,
        }
    }
}

#[derive(Debug)]
struct ServiceHandle {
    forwarder: Forwarder,
    breaker: Option<CircuitBreaker>,
}

/// Routes resolved requests through breaker and forwarder of their service.
#[derive(Debug)]
pub struct Gateway {
    registry: Arc<InstanceRegistry>,
    selector: Arc<Selector>,
    services: HashMap<&'static str, ServiceHandle>,
}

impl Gateway {
    pub fn new(registry: Arc<InstanceRegistry>) -> Self {
        let selector = Arc::new(Selector::new(registry.clone()));
        Self {
            registry,
            selector,
            services: HashMap::new(),
        }
    }

    /// Build the gateway for every known service from configuration.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let registry = Arc::new(InstanceRegistry::new());
        let mut gateway = Self::new(registry.clone());
        let policy = config
            .circuit_breaker
            .enabled
            .then(|| CircuitBreakerPolicy::from(&config.circuit_breaker));

        for route in SERVICE_ROUTES {
            let Some(service) = config.services.get(route.name) else {
                continue;
            };
            registry.register_instances(route.name, service.instances_or_single());

            let transport = HyperTransport::new(
                Duration::from_millis(service.connect_timeout_ms),
                Duration::from_millis(service.response_timeout_ms),
            )
            .with_max_response_bytes(service.max_response_bytes);
            gateway.add_service(route, Arc::new(transport), policy.clone());
        }

        gateway
    }

    /// Register a service handled by this gateway.
    pub fn add_service(
        &mut self,
        route: ServiceRoute,
        transport: Arc<dyn Transport>,
        policy: Option<CircuitBreakerPolicy>,
    ) {
        let forwarder = Forwarder::new(route, self.registry.clone(), self.selector.clone(), transport);
        let breaker = policy.map(|p| CircuitBreaker::new(route.name, p));
        self.services.insert(route.name, ServiceHandle { forwarder, breaker });
    }

    pub fn registry(&self) -> &Arc<InstanceRegistry> {
        &self.registry
    }

    /// Breaker state per service, sorted by name. Services without a breaker report Closed.
    pub fn circuit_states(&self) -> Vec<(&'static str, CircuitState)> {
        let mut states: Vec<_> = self
            .services
            .iter()
            .map(|(name, handle)| {
                let state = handle
                    .breaker
                    .as_ref()
                    .map(CircuitBreaker::state)
                    .unwrap_or(CircuitState::Closed);
                (*name, state)
            })
            .collect();
        states.sort_by_key(|(name, _)| *name);
        states
    }

    /// Handle a resolved request. Always produces a response.
    pub async fn handle(&self, request: InboundRequest) -> ProxyResponse {
        let start = Instant::now();

        let response = if !FORWARDED_METHODS.contains(&request.method) {
            let err = GatewayError::MethodNotAllowed(request.method.clone());
            tracing::warn!(service = %request.service, method = %request.method, "Method not allowed");
            ProxyResponse::synthetic(
                StatusCode::METHOD_NOT_ALLOWED,
                "method is not allowed".to_string(),
                err.to_string(),
            )
        } else {
            match self.services.get(request.service.as_str()) {
                Some(handle) => self.dispatch(handle, &request).await,
                None => {
                    let err = GatewayError::NoInstances {
                        service: request.service.clone(),
                    };
                    fallback(&request.service, &request, err)
                }
            }
        };

        metrics::record_request(&request.service, response.status.as_u16(), start);
        response
    }

    async fn dispatch(&self, handle: &ServiceHandle, request: &InboundRequest) -> ProxyResponse {
        let forwarder = &handle.forwarder;
        let result = match &handle.breaker {
            Some(breaker) => breaker.call(|| forwarder.forward(request)).await,
            None => forwarder.forward(request).await,
        };

        match result {
            Ok(upstream) => ProxyResponse::from(upstream),
            Err(e) => fallback(forwarder.route().display_name, request, e),
        }
    }
}

/// The 503 response used whenever a service cannot be reached.
fn fallback(display_name: &str, request: &InboundRequest, err: GatewayError) -> ProxyResponse {
    tracing::warn!(
        service = %request.service,
        path = %request.path,
        reason = %err,
        "Serving fallback response"
    );
    ProxyResponse::synthetic(
        StatusCode::SERVICE_UNAVAILABLE,
        format!("{} is unavailable: {}", display_name, err),
        err.to_string(),
    )
}
