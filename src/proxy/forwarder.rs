//! Forward-with-failover.
//!
//! # Responsibilities
//! - Select an instance, forward, and return whatever the backend answered
//! - On transport failure mark the instance failed and try the next one
//! - Give up after one attempt per instance registered at call start
//!
//! # Design Decisions
//! - Any HTTP status is a valid result; only transport failures retry
//! - The attempt budget is snapshotted once: instances recovering mid-call
//!   do not extend it and a shrinking candidate pool does not shorten it
//! - No backoff between attempts; each attempt targets a different instance

use std::sync::Arc;

use crate::error::{GatewayError, TransportError};
use crate::load_balancer::{InstanceRegistry, Selector};
use crate::observability::metrics;
use crate::proxy::gateway::InboundRequest;
use crate::proxy::headers::forwardable_request_headers;
use crate::proxy::transport::{Transport, UpstreamRequest, UpstreamResponse};
use crate::routing::ServiceRoute;

/// Forwards requests for one service across its instances.
#[derive(Debug)]
pub struct Forwarder {
    route: ServiceRoute,
    registry: Arc<InstanceRegistry>,
    selector: Arc<Selector>,
    transport: Arc<dyn Transport>,
}

impl Forwarder {
    pub fn new(
        route: ServiceRoute,
        registry: Arc<InstanceRegistry>,
        selector: Arc<Selector>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            route,
            registry,
            selector,
            transport,
        }
    }

    pub fn route(&self) -> &ServiceRoute {
        &self.route
    }

    /// Forward `request` to an instance of this service.
    pub async fn forward(&self, request: &InboundRequest) -> Result<UpstreamResponse, GatewayError> {
        let service = self.route.name;
        let max_attempts = self.registry.all_instances(service).len();
        let headers = forwardable_request_headers(&request.headers);
        let mut last_error: Option<TransportError> = None;

        for attempt in 1..=max_attempts {
            let address = self.selector.select_next(service)?;
            let url = self.upstream_url(&address, request);

            tracing::info!(
                service = %service,
                method = %request.method,
                url = %url,
                attempt,
                "Forwarding request"
            );

            let upstream = UpstreamRequest {
                method: request.method.clone(),
                url,
                headers: headers.clone(),
                body: request.body.clone(),
            };

            match self.transport.send(upstream).await {
                Ok(response) => {
                    tracing::info!(
                        service = %service,
                        address = %address,
                        status = %response.status,
                        "Backend responded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    tracing::warn!(
                        service = %service,
                        address = %address,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Instance failed"
                    );
                    metrics::record_forward_failure(service, &address);
                    self.registry.mark_failed(service, &address);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(source) => Err(GatewayError::AllInstancesExhausted {
                service: service.to_string(),
                attempts: max_attempts,
                source,
            }),
            None => Err(GatewayError::NoInstances {
                service: service.to_string(),
            }),
        }
    }

    /// `address + prefix + path [+ "?" + query]`.
    fn upstream_url(&self, address: &str, request: &InboundRequest) -> String {
        let mut url = format!(
            "{}{}{}",
            address.trim_end_matches('/'),
            self.route.prefix,
            request.path
        );
        if let Some(query) = request.query.as_deref().filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
    use crate::load_balancer::InstanceState;
    use crate::proxy::transport::testing::ScriptedTransport;
    use crate::routing::USER;

    const A: &str = "http://a:8081";
    const B: &str = "http://b:8081";
    const C: &str = "http://c:8081";

    fn forwarder(addresses: &[&str], transport: Arc<ScriptedTransport>) -> (Arc<InstanceRegistry>, Forwarder) {
        let registry = Arc::new(InstanceRegistry::new());
        registry.register_instances("user", addresses.iter().copied());
        let selector = Arc::new(Selector::new(registry.clone()));
        let forwarder = Forwarder::new(USER, registry.clone(), selector, transport);
        (registry, forwarder)
    }

    fn get(path: &str) -> InboundRequest {
        InboundRequest {
            service: "user".into(),
            method: Method::GET,
            path: path.into(),
            query: None,
            body: None,
            headers: HeaderMap::new(),
        }
    }

    #[tokio::test]
    async fn test_failover_to_second_instance() {
        let transport = ScriptedTransport::new();
        transport.fail(A);
        transport.respond(B, 200, r#"{"id":42}"#);
        let (registry, forwarder) = forwarder(&[A, B], transport.clone());

        let response = forwarder.forward(&get("/42")).await.unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body, Bytes::from_static(br#"{"id":42}"#));
        assert_eq!(transport.urls(), vec![format!("{A}/users/42"), format!("{B}/users/42")]);
        assert_eq!(registry.available_instances("user"), vec![B]);
        assert_eq!(
            registry.instance("user", A).unwrap().state,
            InstanceState::Unavailable
        );
    }

    #[tokio::test]
    async fn test_error_status_is_not_a_failure() {
        let transport = ScriptedTransport::new();
        transport.respond(A, 404, "not found");
        transport.respond(B, 500, "boom");
        let (registry, forwarder) = forwarder(&[A, B], transport.clone());

        let first = forwarder.forward(&get("/1")).await.unwrap();
        let second = forwarder.forward(&get("/1")).await.unwrap();

        assert_eq!(first.status, StatusCode::NOT_FOUND);
        assert_eq!(second.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(registry.available_instances("user").len(), 2);
    }

    #[tokio::test]
    async fn test_exhausts_all_instances() {
        let transport = ScriptedTransport::new();
        let (registry, forwarder) = forwarder(&[A, B, C], transport.clone());

        let err = forwarder.forward(&get("/7")).await.unwrap_err();

        match err {
            GatewayError::AllInstancesExhausted { attempts, source, .. } => {
                assert_eq!(attempts, 3);
                assert!(matches!(source, TransportError::Connect(_)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let mut tried = transport.urls();
        tried.sort();
        assert_eq!(
            tried,
            vec![format!("{A}/users/7"), format!("{B}/users/7"), format!("{C}/users/7")]
        );
        assert!(registry.available_instances("user").is_empty());
    }

    #[tokio::test]
    async fn test_no_instances() {
        let transport = ScriptedTransport::new();
        let (_, forwarder) = forwarder(&[], transport.clone());

        let err = forwarder.forward(&get("/1")).await.unwrap_err();
        assert!(matches!(err, GatewayError::NoInstances { .. }));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_degraded_mode_still_forwards() {
        let transport = ScriptedTransport::new();
        transport.respond(A, 200, "ok");
        transport.respond(B, 200, "ok");
        let (registry, forwarder) = forwarder(&[A, B], transport.clone());
        registry.mark_failed("user", A);
        registry.mark_failed("user", B);

        let response = forwarder.forward(&get("")).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        // Success does not recover the instance; only the prober does.
        assert!(registry.available_instances("user").is_empty());
    }

    #[tokio::test]
    async fn test_request_shape() {
        let transport = ScriptedTransport::new();
        transport.respond(A, 201, "created");
        let (_, forwarder) = forwarder(&["http://a:8081/"], transport.clone());

        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("gateway"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("9"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let request = InboundRequest {
            service: "user".into(),
            method: Method::POST,
            path: "/42/orders".into(),
            query: Some("page=2&size=10".into()),
            body: Some(Bytes::from_static(b"{\"a\":1}")),
            headers,
        };

        forwarder.forward(&request).await.unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.method, Method::POST);
        assert_eq!(sent.url, "http://a:8081/users/42/orders?page=2&size=10");
        assert_eq!(sent.body.as_deref(), Some(&b"{\"a\":1}"[..]));
        assert!(!sent.headers.contains_key(header::HOST));
        assert!(!sent.headers.contains_key(header::CONTENT_LENGTH));
        assert_eq!(sent.headers.get(header::CONTENT_TYPE).unwrap(), "application/json");
    }
}
