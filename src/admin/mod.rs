//! Read-only admin API, served on its own listener.

pub mod handlers;

use std::sync::Arc;
use axum::{routing::get, Router};

use crate::proxy::Gateway;
use self::handlers::*;

pub fn setup_admin_router(gateway: Arc<Gateway>) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/instances", get(get_instances))
        .route("/admin/circuits", get(get_circuits))
        .with_state(gateway)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::load_balancer::InstanceRegistry;
    use crate::proxy::transport::testing::ScriptedTransport;
    use crate::resilience::CircuitBreakerPolicy;
    use crate::routing::USER;

    fn admin() -> (Arc<InstanceRegistry>, Router) {
        let registry = Arc::new(InstanceRegistry::new());
        registry.register_instances("user", ["http://a:8081", "http://b:8081"]);
        let mut gateway = Gateway::new(registry.clone());
        gateway.add_service(USER, ScriptedTransport::new(), Some(CircuitBreakerPolicy::default()));
        (registry, setup_admin_router(Arc::new(gateway)))
    }

    async fn get_json(app: Router, uri: &str) -> serde_json::Value {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_status() {
        let (_, app) = admin();
        let json = get_json(app, "/admin/status").await;
        assert_eq!(json["status"], "operational");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn test_instances() {
        let (registry, app) = admin();
        registry.mark_failed("user", "http://b:8081");

        let json = get_json(app, "/admin/instances").await;
        let user = &json[0];
        assert_eq!(user["service"], "user");
        assert_eq!(user["instances"][0]["available"], true);
        assert!(user["instances"][0]["failed_for_secs"].is_null());
        assert_eq!(user["instances"][1]["available"], false);
        assert_eq!(user["instances"][1]["state"], "unavailable");
        assert!(user["instances"][1]["failed_for_secs"].is_number());
    }

    #[tokio::test]
    async fn test_circuits() {
        let (_, app) = admin();
        let json = get_json(app, "/admin/circuits").await;
        assert_eq!(json, serde_json::json!([{ "service": "user", "state": "closed" }]));
    }
}
