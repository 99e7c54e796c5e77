//! HTTP router for the status service

use std::sync::Arc;
use axum::{
    routing::get,
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use super::status::{list_groups, list_plugins, StatusState};

/// Create the Axum router with all status endpoints
pub fn create_router(state: Arc<StatusState>) -> Router {
    // CORS configuration - allow all origins for dashboards
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/groups", get(list_groups))
        .route("/api/plugins", get(list_plugins))
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{BroadcastHub, ConnectionHandle};
    use crate::types::PluginSummary;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::util::ServiceExt;

    fn state_with(hub: Arc<BroadcastHub>) -> Arc<StatusState> {
        Arc::new(StatusState {
            hub,
            plugins: vec![PluginSummary {
                name: "levels".into(),
                interval_secs: 60.0,
                target_group: "default".into(),
                producer: Some("price_levels".into()),
            }],
        })
    }

    async fn get_json(app: Router, uri: &str) -> Value {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = create_router(state_with(Arc::new(BroadcastHub::new())));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_groups_endpoint() {
        let hub = Arc::new(BroadcastHub::new());
        let (conn, _rx) = ConnectionHandle::new(1, 4);
        hub.join(&conn, "g1");

        let body = get_json(create_router(state_with(hub)), "/api/groups").await;
        assert_eq!(body["groups"][0]["name"], "g1");
        assert_eq!(body["groups"][0]["members"], 1);
        assert_eq!(body["stats"]["memberships"], 1);
    }

    #[tokio::test]
    async fn test_plugins_endpoint() {
        let body = get_json(create_router(state_with(Arc::new(BroadcastHub::new()))), "/api/plugins").await;
        assert_eq!(body["plugins"][0]["name"], "levels");
        assert_eq!(body["plugins"][0]["producer"], "price_levels");
    }
}
