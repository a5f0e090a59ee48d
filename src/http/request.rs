//! Request identification and conversion.
//!
//! # Responsibilities
//! - Generate a UUID v4 `x-request-id` when the client sent none
//! - Turn a matched axum request into an [`InboundRequest`]
//!
//! The id stays in the request headers, so it is forwarded upstream like
//! any other header and echoed back on the response.

use axum::body::Bytes;
use axum::http::request::Parts;
use axum::http::{HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};

use crate::proxy::InboundRequest;
use crate::routing::RouteMatch;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Generates UUID v4 request ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Read the request id set by the request-id layer.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Build the core request from the HTTP parts and the buffered body.
pub fn inbound_request(route: &RouteMatch<'_>, parts: Parts, body: Bytes) -> InboundRequest {
    InboundRequest {
        service: route.route.name.to_string(),
        method: parts.method,
        path: route.path.to_string(),
        query: parts.uri.query().map(str::to_string),
        body: (!body.is_empty()).then_some(body),
        headers: parts.headers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Method;
    use crate::routing::Router;

    #[test]
    fn test_make_request_id_is_uuid() {
        let request = Request::new(());
        let id = MakeRequestUuid.make_request_id(&request).unwrap();
        let text = id.header_value().to_str().unwrap();
        assert!(uuid::Uuid::parse_str(text).is_ok());
    }

    #[test]
    fn test_inbound_request_from_http() {
        let router = Router::default();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/users/42/orders?page=2")
            .header(X_REQUEST_ID, "abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_id(&request), "abc");

        let path = request.uri().path().to_string();
        let route = router.resolve(&path).unwrap();
        let (parts, _) = request.into_parts();
        let inbound = inbound_request(&route, parts, Bytes::from_static(b"{}"));

        assert_eq!(inbound.service, "user");
        assert_eq!(inbound.method, Method::POST);
        assert_eq!(inbound.path, "/42/orders");
        assert_eq!(inbound.query.as_deref(), Some("page=2"));
        assert_eq!(inbound.body.as_deref(), Some(&b"{}"[..]));
        assert_eq!(inbound.headers.get(X_REQUEST_ID).unwrap(), "abc");
    }

    #[test]
    fn test_empty_body_is_none() {
        let router = Router::default();
        let request = Request::builder().uri("/users").body(Body::empty()).unwrap();
        let route = router.resolve("/users").unwrap();
        let (parts, _) = request.into_parts();
        let inbound = inbound_request(&route, parts, Bytes::new());
        assert!(inbound.body.is_none());
        assert_eq!(inbound.path, "");
        assert!(inbound.query.is_none());
    }
}
