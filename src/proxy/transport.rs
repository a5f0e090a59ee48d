//! Outbound HTTP transport.
//!
//! # Responsibilities
//! - Issue one upstream request and buffer the full response
//! - Enforce connect timeout (connector) and response deadline
//! - Report connect/timeout/IO problems as [`TransportError`], distinct
//!   from an HTTP error status, which is a normal response

use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use futures_util::future::BoxFuture;
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};

use crate::error::TransportError;
use crate::resilience::timeouts::with_deadline;

/// A request to a single backend instance.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// A complete backend response, whatever its status.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Something that can carry an upstream request to a backend.
pub trait Transport: Send + Sync + fmt::Debug {
    fn send(&self, request: UpstreamRequest) -> BoxFuture<'_, Result<UpstreamResponse, TransportError>>;
}

/// Transport backed by the hyper legacy client.
#[derive(Debug, Clone)]
pub struct HyperTransport {
    client: Client<HttpConnector, Body>,
    response_timeout: Duration,
    max_response_bytes: usize,
}

/// Response body cap used unless configured otherwise.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 10 * 1024 * 1024;

impl HyperTransport {
    pub fn new(connect_timeout: Duration, response_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            response_timeout,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }

    /// Fail responses whose body exceeds `limit` bytes.
    pub fn with_max_response_bytes(mut self, limit: usize) -> Self {
        self.max_response_bytes = limit;
        self
    }

    async fn exchange(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        let mut builder = Request::builder()
            .method(request.method)
            .uri(request.url.as_str());

        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.headers);
        }

        let body = request.body.map(Body::from).unwrap_or_else(Body::empty);
        let upstream = builder
            .body(body)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let response = self.client.request(upstream).await.map_err(classify)?;

        let (parts, body) = response.into_parts();
        let body = self.read_body(body).await?;

        Ok(UpstreamResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    async fn read_body(&self, body: Incoming) -> Result<Bytes, TransportError> {
        axum::body::to_bytes(Body::new(body), self.max_response_bytes)
            .await
            .map_err(|e| {
                TransportError::Io(format!(
                    "reading response body (limit {} bytes): {}",
                    self.max_response_bytes,
                    error_chain(&e)
                ))
            })
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: UpstreamRequest) -> BoxFuture<'_, Result<UpstreamResponse, TransportError>> {
        Box::pin(with_deadline(self.response_timeout, self.exchange(request)))
    }
}

fn classify(e: hyper_util::client::legacy::Error) -> TransportError {
    if e.is_connect() {
        TransportError::Connect(error_chain(&e))
    } else {
        TransportError::Io(error_chain(&e))
    }
}

/// Render an error with its sources, e.g. "client error (Connect): tcp connect error: Connection refused".
fn error_chain(e: &dyn StdError) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
