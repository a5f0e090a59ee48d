//! Backend instance abstraction.
//!
//! # Responsibilities
//! - Represent a single backend instance of a service
//! - Track availability and the time of the last failure
//!
//! # Invariants
//! - `available == false` implies `last_failure.is_some()`
//! - `available == true` implies `last_failure.is_none()`

use serde::Serialize;
use tokio::time::Instant;

/// Availability state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Available,
    Unavailable,
}

/// A single backend instance, identified by its base address.
#[derive(Debug, Clone)]
pub struct Instance {
    address: String,
    available: bool,
    last_failure: Option<Instant>,
}

impl Instance {
    /// Create a new instance. Instances start available.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            available: true,
            last_failure: None,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn last_failure(&self) -> Option<Instant> {
        self.last_failure
    }

    pub fn state(&self) -> InstanceState {
        if self.available {
            InstanceState::Available
        } else {
            InstanceState::Unavailable
        }
    }

    /// Flag the instance as failed.
    ///
    /// Only stamps when the instance was available or carries no failure
    /// time yet, so repeated failures do not push the timestamp forward.
    /// Returns true if anything changed.
    pub(crate) fn mark_failed(&mut self, now: Instant) -> bool {
        if self.available || self.last_failure.is_none() {
            self.available = false;
            self.last_failure = Some(now);
            true
        } else {
            false
        }
    }

    /// Flag the instance as recovered. Returns true if it was unavailable.
    pub(crate) fn mark_recovered(&mut self) -> bool {
        let was_unavailable = !self.available;
        self.available = true;
        self.last_failure = None;
        was_unavailable
    }

    /// Re-stamp the failure time of an unavailable instance.
    pub(crate) fn refresh_failure(&mut self, now: Instant) -> bool {
        if self.available {
            return false;
        }
        self.last_failure = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_new_instance_is_available() {
        let instance = Instance::new("http://10.0.0.1:8080");
        assert!(instance.is_available());
        assert_eq!(instance.state(), InstanceState::Available);
        assert!(instance.last_failure().is_none());
    }

    #[test]
    fn test_mark_failed_does_not_restamp() {
        let mut instance = Instance::new("http://10.0.0.1:8080");
        let t0 = Instant::now();
        assert!(instance.mark_failed(t0));
        assert!(!instance.is_available());

        let later = t0 + Duration::from_secs(5);
        assert!(!instance.mark_failed(later));
        assert_eq!(instance.last_failure(), Some(t0));
    }

    #[test]
    fn test_recover_clears_failure() {
        let mut instance = Instance::new("http://10.0.0.1:8080");
        instance.mark_failed(Instant::now());
        assert!(instance.mark_recovered());
        assert!(instance.is_available());
        assert!(instance.last_failure().is_none());
        assert!(!instance.mark_recovered());
    }

    #[test]
    fn test_refresh_only_applies_to_unavailable() {
        let mut instance = Instance::new("http://10.0.0.1:8080");
        let t0 = Instant::now();
        assert!(!instance.refresh_failure(t0));
        assert!(instance.last_failure().is_none());

        instance.mark_failed(t0);
        let later = t0 + Duration::from_secs(31);
        assert!(instance.refresh_failure(later));
        assert_eq!(instance.last_failure(), Some(later));
    }
}
