//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every registered instance, available or not
//! - Update instance availability in the registry based on results
//!
//! One task probes all services. Each service keeps its own interval with
//! fixed-delay semantics: the next cycle is scheduled when the previous one
//! finishes, so cycles never overlap.

use std::sync::Arc;
use std::time::Duration;
use axum::http::{header, HeaderMap, HeaderValue, Method};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::config::{GatewayConfig, ServiceConfig};
use crate::health::state::{next_transition, ProbeOutcome, Transition};
use crate::load_balancer::InstanceRegistry;
use crate::proxy::transport::{HyperTransport, Transport, UpstreamRequest};
use crate::routing::{ServiceRoute, SERVICE_ROUTES};

/// How to probe the instances of one service.
#[derive(Debug, Clone)]
pub struct ProbeTarget {
    service: &'static str,
    health_path: String,
    interval: Duration,
    transport: Arc<dyn Transport>,
}

impl ProbeTarget {
    pub fn new(
        service: &'static str,
        health_path: impl Into<String>,
        interval: Duration,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            service,
            health_path: health_path.into(),
            interval,
            transport,
        }
    }

    pub fn from_config(route: &ServiceRoute, config: &ServiceConfig) -> Self {
        let timeout = Duration::from_millis(config.health_check_timeout_ms);
        let transport =
            HyperTransport::new(timeout, timeout).with_max_response_bytes(config.max_response_bytes);
        let health_path = config
            .health_path
            .clone()
            .unwrap_or_else(|| route.default_health_path.to_string());

        Self::new(
            route.name,
            health_path,
            Duration::from_secs(config.health_check_interval_secs),
            Arc::new(transport),
        )
    }
}

/// Background prober keeping the registry in line with instance health.
pub struct HealthProber {
    registry: Arc<InstanceRegistry>,
    targets: Vec<ProbeTarget>,
    cooldown: Duration,
}

impl HealthProber {
    pub fn new(registry: Arc<InstanceRegistry>, targets: Vec<ProbeTarget>, cooldown: Duration) -> Self {
        Self {
            registry,
            targets,
            cooldown,
        }
    }

    pub fn from_config(registry: Arc<InstanceRegistry>, config: &GatewayConfig) -> Self {
        let targets = SERVICE_ROUTES
            .iter()
            .filter_map(|route| {
                config
                    .services
                    .get(route.name)
                    .map(|service| ProbeTarget::from_config(route, service))
            })
            .collect();

        Self::new(
            registry,
            targets,
            Duration::from_secs(config.health_check.failure_cooldown_secs),
        )
    }

    /// Start the probe loop on the runtime.
    pub fn spawn(self, shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Probe until the shutdown signal fires. The first cycle runs immediately.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if self.targets.is_empty() {
            tracing::info!("No services to health check");
            return;
        }

        for target in &self.targets {
            tracing::info!(
                service = target.service,
                path = %target.health_path,
                interval_secs = target.interval.as_secs_f64(),
                "Health prober starting"
            );
        }

        let mut next_due = vec![Instant::now(); self.targets.len()];

        loop {
            for (target, due) in self.targets.iter().zip(next_due.iter_mut()) {
                if *due <= Instant::now() {
                    self.probe_service(target).await;
                    *due = Instant::now() + target.interval;
                }
            }

            let Some(wake_at) = next_due.iter().min().copied() else {
                return;
            };

            tokio::select! {
                _ = time::sleep_until(wake_at) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Health prober received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one probe cycle over every service.
    pub async fn probe_all(&self) {
        for target in &self.targets {
            self.probe_service(target).await;
        }
    }

    /// Probe every registered instance of one service.
    pub async fn probe_service(&self, target: &ProbeTarget) {
        for address in self.registry.all_instances(target.service) {
            let outcome = self.probe_instance(target, &address).await;
            self.apply(target.service, &address, &outcome);
        }
    }

    async fn probe_instance(&self, target: &ProbeTarget, address: &str) -> ProbeOutcome {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, HeaderValue::from_static("api-gateway-health-check"));

        let request = UpstreamRequest {
            method: Method::GET,
            url: format!("{}{}", address.trim_end_matches('/'), target.health_path),
            headers,
            body: None,
        };

        match target.transport.send(request).await {
            Ok(response) if response.status.is_success() => ProbeOutcome::Healthy,
            Ok(response) => {
                tracing::warn!(
                    service = target.service,
                    address = %address,
                    status = %response.status,
                    "Health check failed: non-success status"
                );
                ProbeOutcome::Unhealthy(response.status)
            }
            Err(e) => {
                tracing::debug!(
                    service = target.service,
                    address = %address,
                    error = %e,
                    "Health check failed: unreachable"
                );
                ProbeOutcome::Unreachable(e)
            }
        }
    }

    fn apply(&self, service: &str, address: &str, outcome: &ProbeOutcome) {
        // Read the state after the probe; the forwarder may have changed it meanwhile.
        let Some(current) = self.registry.instance(service, address) else {
            return;
        };

        let transition = next_transition(
            outcome,
            current.is_available(),
            current.last_failure,
            Instant::now(),
            self.cooldown,
        );

        match transition {
            Transition::Recover => {
                self.registry.mark_recovered(service, address);
            }
            Transition::MarkFailed => {
                self.registry.mark_failed(service, address);
            }
            Transition::Refresh => {
                self.registry.refresh_failure(service, address);
            }
            Transition::None => {}
        }
    }
}
