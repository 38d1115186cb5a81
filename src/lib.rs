pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod envelope;
pub mod error;
pub mod guard;
pub mod jwt;
pub mod pages;
pub mod rate_limit;
pub mod users;

use api::create_api_router;
use axum::{Router, middleware};
use guard::{RouteGuard, RouteGuardConfig, route_guard};
use jwt::JwtConfig;
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use users::UserDirectory;

/// Mount point of the JSON API.
pub const API_PREFIX: &str = "/api";

pub struct ServerConfig {
    /// Token signing configuration
    pub jwt: JwtConfig,
    /// User store (cloneable, shared between handlers)
    pub users: UserDirectory,
    /// Whether to set Secure flag on the refresh cookie (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Use X-Forwarded-For for client IPs (requires running behind a proxy)
    pub trust_proxy: bool,
    /// Protected / auth-only page paths
    pub guard: RouteGuardConfig,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(config.jwt.clone());
    let rate_limit = Arc::new(RateLimitConfig::new(config.trust_proxy));

    let api_router = create_api_router(
        jwt.clone(),
        config.users.clone(),
        config.secure_cookies,
        rate_limit,
    );

    let guard = Arc::new(RouteGuard::new(jwt, config.guard.clone()));
    let page_routes = pages::router().layer(middleware::from_fn_with_state(guard, route_guard));

    Router::new()
        .nest(API_PREFIX, api_router)
        .merge(page_routes)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
