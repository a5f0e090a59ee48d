use std::sync::Arc;
use axum::{extract::State, Json};
use serde::Serialize;

use crate::load_balancer::{InstanceSnapshot, InstanceState};
use crate::proxy::Gateway;
use crate::resilience::CircuitState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct InstanceStatus {
    pub address: String,
    pub state: InstanceState,
    pub available: bool,
    /// Seconds since the recorded failure, absent for healthy instances.
    pub failed_for_secs: Option<f64>,
}

impl From<InstanceSnapshot> for InstanceStatus {
    fn from(snapshot: InstanceSnapshot) -> Self {
        Self {
            available: snapshot.is_available(),
            address: snapshot.address,
            state: snapshot.state,
            failed_for_secs: snapshot.failed_for_secs,
        }
    }
}

#[derive(Serialize)]
pub struct ServiceStatus {
    pub service: String,
    pub instances: Vec<InstanceStatus>,
}

#[derive(Serialize)]
pub struct CircuitStatus {
    pub service: &'static str,
    pub state: CircuitState,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn get_instances(State(gateway): State<Arc<Gateway>>) -> Json<Vec<ServiceStatus>> {
    let registry = gateway.registry();
    let statuses = registry
        .services()
        .into_iter()
        .map(|service| ServiceStatus {
            instances: registry
                .snapshot(&service)
                .into_iter()
                .map(InstanceStatus::from)
                .collect(),
            service,
        })
        .collect();

    Json(statuses)
}

pub async fn get_circuits(State(gateway): State<Arc<Gateway>>) -> Json<Vec<CircuitStatus>> {
    Json(
        gateway
            .circuit_states()
            .into_iter()
            .map(|(service, state)| CircuitStatus { service, state })
            .collect(),
    )
}
