//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap outbound calls (forwards and probes) with a response deadline
//! - Surface expiry as a transport failure, never as a hang
//!
//! Connect timeouts are enforced by the connector; this deadline covers the
//! whole exchange including reading the response body.

use std::future::Future;
use std::time::Duration;

use crate::error::TransportError;

/// Run `call`, failing with [`TransportError::Timeout`] once `deadline` passes.
pub async fn with_deadline<F, T>(deadline: Duration, call: F) -> Result<T, TransportError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(deadline)),
    }
}
