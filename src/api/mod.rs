mod auth;
mod error;

use axum::Router;
use std::sync::Arc;

use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;
use crate::users::UserDirectory;

pub use auth::AuthState;
pub use error::ApiError;

/// Create the API router.
pub fn create_api_router(
    jwt: Arc<JwtConfig>,
    users: UserDirectory,
    secure_cookies: bool,
    rate_limit: Arc<RateLimitConfig>,
) -> Router {
    let auth_state = AuthState {
        jwt,
        users,
        secure_cookies,
    };

    Router::new().nest("/auth", auth::router(auth_state, rate_limit))
}
