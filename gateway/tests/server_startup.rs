//! Server Startup Tests
//!
//! Tests for server lifecycle, configuration handling, and route setup.

use axum::{Router, body::Body, http::Request};
use tower::util::ServiceExt;

use voxrelay_gateway::{ServerConfig, routes, state::AppState};

/// Helper function to create a minimal test configuration
fn create_minimal_config(port: u16) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port,
        gemini_api_key: "test-api-key".to_string(),
        gemini_model: "gemini-live-2.5-flash-preview".to_string(),
        system_instruction: "You are a test assistant.".to_string(),
        manual_activity: false,
        cors_allowed_origins: None,
    }
}

/// Test that the health banner is served at the root
#[tokio::test]
async fn test_health_banner() {
    let config = create_minimal_config(3001);
    let app_state = AppState::new(config);

    let app = routes::create_api_router().with_state(app_state);

    let request = Request::builder().uri("/").body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    assert_eq!(&body[..], b"voxrelay gateway is running");
}

/// Test that the relay WebSocket route accepts an upgrade handshake
#[tokio::test]
async fn test_relay_route_setup() {
    let config = create_minimal_config(3001);
    let app_state = AppState::new(config);

    let relay_routes = routes::create_relay_router().with_state(app_state);

    let request = Request::builder()
        .uri("/relay")
        .header("upgrade", "websocket")
        .header("connection", "upgrade")
        .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
        .header("sec-websocket-version", "13")
        .body(Body::empty())
        .unwrap();

    let response = relay_routes.oneshot(request).await.unwrap();

    // Should get a response (either upgrade or bad request, not 404)
    assert_ne!(response.status(), axum::http::StatusCode::NOT_FOUND);
}

/// Test that a plain GET to the relay endpoint is rejected, not routed away
#[tokio::test]
async fn test_relay_route_requires_upgrade() {
    let config = create_minimal_config(3001);
    let app_state = AppState::new(config);

    let relay_routes = routes::create_relay_router().with_state(app_state);

    let request = Request::builder()
        .uri("/relay")
        .body(Body::empty())
        .unwrap();
    let response = relay_routes.oneshot(request).await.unwrap();

    assert_ne!(response.status(), axum::http::StatusCode::NOT_FOUND);
    assert_ne!(response.status(), axum::http::StatusCode::OK);
}

/// Test that CORS configuration is applied correctly
#[tokio::test]
async fn test_cors_configurations() {
    // Test with wildcard CORS
    let mut config = create_minimal_config(3001);
    config.cors_allowed_origins = Some("*".to_string());
    let app_state = AppState::new(config);
    assert_eq!(app_state.config.cors_allowed_origins, Some("*".to_string()));

    // Test with specific origins
    let mut config2 = create_minimal_config(3002);
    config2.cors_allowed_origins = Some("http://localhost:3000,http://localhost:8080".to_string());
    let app_state2 = AppState::new(config2);
    assert!(app_state2.config.cors_allowed_origins.is_some());
}

/// Test that the server correctly parses addresses
#[tokio::test]
async fn test_address_parsing() {
    let config = create_minimal_config(4242);

    let address = config.address();
    assert!(address.contains("127.0.0.1"));
    assert!(address.contains("4242"));
}

/// Test concurrent request handling capability
#[tokio::test]
async fn test_concurrent_request_handling() {
    let config = create_minimal_config(3001);
    let app_state = AppState::new(config);

    let app: Router = routes::create_api_router().with_state(app_state);

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let app = app.clone();
            tokio::spawn(async move {
                let request = Request::builder().uri("/").body(Body::empty()).unwrap();
                let response = app.oneshot(request).await.unwrap();
                response.status()
            })
        })
        .collect();

    for task in tasks {
        let status = task.await.expect("Task should complete");
        assert_eq!(status, axum::http::StatusCode::OK);
    }
}

/// Test that session configuration is stored per gateway
#[tokio::test]
async fn test_session_configuration_storage() {
    let mut config = create_minimal_config(3001);
    config.gemini_model = "custom-live-model".to_string();
    config.manual_activity = true;

    let app_state = AppState::new(config);

    assert_eq!(app_state.config.gemini_model, "custom-live-model");
    assert!(app_state.config.manual_activity);
}
