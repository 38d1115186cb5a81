#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response},
};
use starstudy::{
    ServerConfig, create_app, guard::RouteGuardConfig, jwt::JwtConfig, start_server,
    users::UserDirectory,
};
use std::net::SocketAddr;
use tower::ServiceExt;

/// Signing secret shared by the test server and tests that forge tokens.
pub const TEST_SECRET: &[u8] = b"test-jwt-secret-at-least-32-bytes-long";

pub fn test_config() -> ServerConfig {
    ServerConfig {
        jwt: JwtConfig::new(TEST_SECRET).expect("Failed to create JWT config"),
        users: UserDirectory::new(),
        secure_cookies: false,
        trust_proxy: false,
        guard: RouteGuardConfig::default(),
    }
}

pub fn test_app() -> axum::Router {
    create_app(&test_config())
}

/// Send one request through a fresh app.
pub async fn send(request: Request<Body>) -> Response<Body> {
    test_app()
        .oneshot(request)
        .await
        .expect("Failed to send request")
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&body).expect("Body is not JSON")
}

/// The refresh token set by a response, if any.
pub fn refresh_cookie_value(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| value.strip_prefix("starstudy_refresh="))
        .and_then(|rest| rest.split(';').next())
        .map(str::to_string)
}

pub fn set_cookie_header(response: &Response<Body>) -> String {
    response
        .headers()
        .get("set-cookie")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Start a real server on an ephemeral port.
pub async fn spawn_server() -> SocketAddr {
    let (_handle, addr) = start_server(test_config(), 0)
        .await
        .expect("Failed to start server");
    addr
}
