//! Instance registry.
//!
//! # Responsibilities
//! - Hold the instances of every service, grouped by service name
//! - Serialize availability updates per service
//! - Hand out consistent snapshots to the selector, the prober and the admin API
//!
//! Each service owns its own lock; no lock is ever held across an await.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;

use crate::load_balancer::instance::{Instance, InstanceState};
use crate::observability::metrics;

/// Instances of a single service, in registration order.
#[derive(Debug, Default)]
struct ServiceInstances {
    instances: RwLock<Vec<Instance>>,
}

impl ServiceInstances {
    fn read(&self) -> RwLockReadGuard<'_, Vec<Instance>> {
        self.instances.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Instance>> {
        self.instances.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Point-in-time view of one instance.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceSnapshot {
    pub address: String,
    pub state: InstanceState,
    /// Seconds elapsed since the recorded failure, if any.
    pub failed_for_secs: Option<f64>,
    #[serde(skip)]
    pub last_failure: Option<Instant>,
}

impl InstanceSnapshot {
    pub fn is_available(&self) -> bool {
        self.state == InstanceState::Available
    }
}

impl From<&Instance> for InstanceSnapshot {
    fn from(instance: &Instance) -> Self {
        Self {
            address: instance.address().to_string(),
            state: instance.state(),
            failed_for_secs: instance.last_failure().map(|t| t.elapsed().as_secs_f64()),
            last_failure: instance.last_failure(),
        }
    }
}

/// Registry of backend instances keyed by service name.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    services: DashMap<String, Arc<ServiceInstances>>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the instances of a service. Addresses start available;
    /// an address already known to the service is ignored.
    pub fn register_instances<I, S>(&self, service: &str, addresses: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entry = Arc::clone(&self.services.entry(service.to_string()).or_default());
        let mut instances = entry.write();

        for address in addresses {
            let address = address.into();
            if instances.iter().any(|i| i.address() == address) {
                tracing::warn!(service = %service, address = %address, "Duplicate instance ignored");
                continue;
            }
            tracing::info!(service = %service, address = %address, "Registered instance");
            metrics::record_instance_availability(service, &address, true);
            instances.push(Instance::new(address));
        }
    }

    /// Mark an instance as failed. No-op for unknown services or addresses.
    /// Returns true if the instance state changed.
    pub fn mark_failed(&self, service: &str, address: &str) -> bool {
        let changed = self.update(service, address, |i| i.mark_failed(Instant::now()));
        if changed {
            tracing::warn!(service = %service, address = %address, "Marked instance unavailable");
            metrics::record_instance_availability(service, address, false);
        }
        changed
    }

    /// Mark an instance as recovered. Returns true if it was unavailable.
    pub fn mark_recovered(&self, service: &str, address: &str) -> bool {
        let changed = self.update(service, address, |i| i.mark_recovered());
        if changed {
            tracing::info!(service = %service, address = %address, "Instance recovered");
            metrics::record_instance_availability(service, address, true);
        }
        changed
    }

    /// Re-stamp the failure time of an instance that is still unavailable.
    pub fn refresh_failure(&self, service: &str, address: &str) -> bool {
        self.update(service, address, |i| i.refresh_failure(Instant::now()))
    }

    /// Addresses currently flagged available, in registration order.
    pub fn available_instances(&self, service: &str) -> Vec<String> {
        self.get(service)
            .map(|entry| {
                entry
                    .read()
                    .iter()
                    .filter(|i| i.is_available())
                    .map(|i| i.address().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every registered address regardless of availability.
    pub fn all_instances(&self, service: &str) -> Vec<String> {
        self.get(service)
            .map(|entry| entry.read().iter().map(|i| i.address().to_string()).collect())
            .unwrap_or_default()
    }

    /// Snapshot of a single instance.
    pub fn instance(&self, service: &str, address: &str) -> Option<InstanceSnapshot> {
        let entry = self.get(service)?;
        let instances = entry.read();
        instances
            .iter()
            .find(|i| i.address() == address)
            .map(InstanceSnapshot::from)
    }

    /// Snapshot of every instance of a service.
    pub fn snapshot(&self, service: &str) -> Vec<InstanceSnapshot> {
        self.get(service)
            .map(|entry| entry.read().iter().map(InstanceSnapshot::from).collect())
            .unwrap_or_default()
    }

    /// Names of all registered services, sorted.
    pub fn services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    fn get(&self, service: &str) -> Option<Arc<ServiceInstances>> {
        // Clone the Arc so the shard lock is released before the service lock is taken.
        self.services.get(service).map(|e| Arc::clone(e.value()))
    }

    fn update<F>(&self, service: &str, address: &str, f: F) -> bool
    where
        F: FnOnce(&mut Instance) -> bool,
    {
        let Some(entry) = self.get(service) else {
            return false;
        };
        let mut instances = entry.write();
        match instances.iter_mut().find(|i| i.address() == address) {
            Some(instance) => f(instance),
            None => false,
        }
    }
}
