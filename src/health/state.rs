//! Instance health state machine.
//!
//! # States
//! - Available: instance receives traffic
//! - Unavailable: instance excluded from selection
//!
//! # State Transitions (driven by probe outcomes)
//! ```text
//! probe 2xx,     unavailable → Recover
//! probe non-2xx, available   → MarkFailed
//! unreachable,   available   → MarkFailed
//! unreachable,   unavailable → Refresh, only once the failure is older than the cooldown
//! anything else              → None
//! ```
//!
//! There is no timer-based recovery; only a successful probe makes an
//! instance available again.

use std::time::Duration;
use axum::http::StatusCode;
use tokio::time::Instant;

use crate::error::TransportError;

/// Result of probing one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Health endpoint answered 2xx.
    Healthy,
    /// Health endpoint answered with another status.
    Unhealthy(StatusCode),
    /// The probe never got a response.
    Unreachable(TransportError),
}

/// What the prober should do with the registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Recover,
    MarkFailed,
    Refresh,
    None,
}

/// Decide the transition for an instance given its probe outcome.
pub fn next_transition(
    outcome: &ProbeOutcome,
    available: bool,
    last_failure: Option<Instant>,
    now: Instant,
    cooldown: Duration,
) -> Transition {
    match outcome {
        ProbeOutcome::Healthy if !available => Transition::Recover,
        ProbeOutcome::Healthy => Transition::None,
        ProbeOutcome::Unhealthy(_) if available => Transition::MarkFailed,
        ProbeOutcome::Unhealthy(_) => Transition::None,
        ProbeOutcome::Unreachable(_) if available => Transition::MarkFailed,
        ProbeOutcome::Unreachable(_) => {
            let stale = last_failure
                .map(|at| now.saturating_duration_since(at) > cooldown)
                .unwrap_or(true);
            if stale {
                Transition::Refresh
            } else {
                Transition::None
            }
        }
    }
}
