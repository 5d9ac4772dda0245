//! HTTP input and status API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use blinkstick_node::{Message, NodeError};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::debug;

use crate::state::AppState;

/// Creates the web router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/nodes", get(nodes_list))
        .route("/nodes/:name", get(node_get))
        .route("/nodes/:name/input", post(node_input))
        .route("/devices", get(devices_list))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /nodes - Status of all nodes
async fn nodes_list(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.statuses())
}

/// GET /nodes/:name - Status of one node
async fn node_get(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    match state.node(&name) {
        Some(node) => Json(node.status()).into_response(),
        None => (StatusCode::NOT_FOUND, format!("No node named {}", name)).into_response(),
    }
}

/// POST /nodes/:name/input - Deliver a message
async fn node_input(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(msg): Json<Message>,
) -> Response {
    let Some(node) = state.node(&name) else {
        return (StatusCode::NOT_FOUND, format!("No node named {}", name)).into_response();
    };

    debug!("Input for {}: {}", name, msg.payload);
    match node.input(msg) {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e @ NodeError::Closed) => (StatusCode::GONE, e.to_string()).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

/// GET /devices - BlinkSticks on the bus
async fn devices_list(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.devices())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use blinkstick_hw::mock::{MockBus, Operation};
    use blinkstick_node::NodeConfig;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(bus: &MockBus) -> (Arc<AppState>, Router) {
        let configs = vec![NodeConfig {
            name: "desk".into(),
            ..Default::default()
        }];
        let state = Arc::new(AppState::start(&configs, bus.finder()));
        (state.clone(), create_router(state))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
    }

    fn input(name: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/nodes/{}/input", name))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_nodes() {
        let bus = MockBus::with_devices(&["A"]);
        let (_, app) = app(&bus);

        let (status, body) = get_json(app, "/nodes").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["name"], "desk");
        assert_eq!(body[0]["state"], "idle");
        assert_eq!(body[0]["device"], "A");
    }

    #[tokio::test]
    async fn test_unknown_node_is_not_found() {
        let bus = MockBus::new();
        let (_, app) = app(&bus);

        let (status, _) = get_json(app.clone(), "/nodes/shelf").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let response = app.oneshot(input("shelf", r#"{"payload":"red"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_input_starts_animation() {
        let bus = MockBus::with_devices(&["A"]);
        let (_, app) = app(&bus);

        let response = app
            .oneshot(input("desk", r#"{"payload":"0,255,0","topic":"x"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        while bus.in_flight() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(
            bus.operations(),
            vec![Operation::SetColor {
                color: "#00ff00".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_input_after_close_is_gone() {
        let bus = MockBus::with_devices(&["A"]);
        let (state, app) = app(&bus);
        state.close_all().await;

        let response = app.oneshot(input("desk", r#"{"payload":"red"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::GONE);
    }

    #[tokio::test]
    async fn test_list_devices() {
        let bus = MockBus::with_devices(&["A", "B"]);
        let (_, app) = app(&bus);

        let (status, body) = get_json(app, "/devices").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[1]["serial"], "B");
    }
}
