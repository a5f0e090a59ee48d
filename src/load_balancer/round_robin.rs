//! Round-robin instance selection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use dashmap::DashMap;

use crate::error::GatewayError;
use crate::load_balancer::registry::InstanceRegistry;

/// Round-robin selector over the instances of each service.
///
/// Keeps one cursor per service. The cursor only ever grows and wraps
/// modulo the number of candidates at selection time, so the wrap point
/// moves when availability changes.
#[derive(Debug)]
pub struct Selector {
    registry: Arc<InstanceRegistry>,
    cursors: DashMap<String, AtomicUsize>,
}

impl Selector {
    pub fn new(registry: Arc<InstanceRegistry>) -> Self {
        Self {
            registry,
            cursors: DashMap::new(),
        }
    }

    /// Pick the next instance of `service`.
    ///
    /// Prefers available instances; when none are available every registered
    /// instance becomes a candidate again. Fails only if the service has no
    /// registered instances at all.
    pub fn select_next(&self, service: &str) -> Result<String, GatewayError> {
        let mut candidates = self.registry.available_instances(service);

        if candidates.is_empty() {
            candidates = self.registry.all_instances(service);
            if candidates.is_empty() {
                return Err(GatewayError::NoInstances {
                    service: service.to_string(),
                });
            }
            tracing::warn!(
                service = %service,
                instances = candidates.len(),
                "All instances unavailable, selecting from full set"
            );
        }

        let cursor = self.advance(service);
        let index = cursor % candidates.len();
        let selected = candidates.swap_remove(index);

        tracing::debug!(service = %service, address = %selected, index, "Selected instance");
        Ok(selected)
    }

    fn advance(&self, service: &str) -> usize {
        if let Some(cursor) = self.cursors.get(service) {
            return cursor.fetch_add(1, Ordering::Relaxed);
        }
        self.cursors
            .entry(service.to_string())
            .or_default()
            .fetch_add(1, Ordering::Relaxed)
    }
}
