//! Header handling between client and backend.
//!
//! Requests: every inbound header is forwarded except `Host` and
//! `Content-Length`, which belong to the inbound connection and are
//! recomputed by the transport.
//!
//! Responses: backend headers are returned except connection framing
//! headers, which the inbound server writes itself.

use axum::http::{header, HeaderMap, HeaderName};

const REQUEST_EXCLUDED: [HeaderName; 2] = [header::HOST, header::CONTENT_LENGTH];

const RESPONSE_EXCLUDED: [HeaderName; 4] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::CONTENT_LENGTH,
    HeaderName::from_static("keep-alive"),
];

/// Inbound headers to send upstream.
pub fn forwardable_request_headers(inbound: &HeaderMap) -> HeaderMap {
    filtered(inbound, &REQUEST_EXCLUDED)
}

/// Backend response headers to return to the client.
pub fn forwardable_response_headers(upstream: &HeaderMap) -> HeaderMap {
    filtered(upstream, &RESPONSE_EXCLUDED)
}

fn filtered(headers: &HeaderMap, excluded: &[HeaderName]) -> HeaderMap {
    let mut out = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        if !excluded.contains(name) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}
