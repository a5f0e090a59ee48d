//! Response conversion.
//!
//! # Responsibilities
//! - Turn a [`ProxyResponse`] into the axum response sent to the client
//!
//! Backend status, headers and body pass through unchanged; framing headers
//! were already dropped by the proxy and hyper recomputes them.

use axum::body::Body;
use axum::response::{IntoResponse, Response};

use crate::proxy::ProxyResponse;

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
