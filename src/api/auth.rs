//! Session endpoints.
//!
//! - POST `/login` - Sign in by email, set refresh cookie
//! - POST `/register` - Create a user, set refresh cookie
//! - POST `/refresh` - Rotate the refresh cookie and mint a new access token
//! - POST `/logout` - Clear the refresh cookie
//! - GET `/me` - Current user (bearer access token)

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    middleware,
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::error::{ApiError, ResultExt};
use crate::auth::{BearerAuth, REFRESH_COOKIE_NAME, clear_refresh_cookie, get_cookie, refresh_cookie};
use crate::envelope::Envelope;
use crate::impl_has_auth_backend;
use crate::jwt::{JwtConfig, TokenType};
use crate::rate_limit::{RateLimitConfig, rate_limit_refresh, rate_limit_sign_in};
use crate::users::{User, UserDirectory};

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<JwtConfig>,
    pub users: UserDirectory,
    pub secure_cookies: bool,
}

impl_has_auth_backend!(AuthState);

pub fn router(state: AuthState, rate_limit: Arc<RateLimitConfig>) -> Router {
    let sign_in = Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            rate_limit.clone(),
            rate_limit_sign_in,
        ));

    let refresh = Router::new()
        .route("/refresh", post(refresh))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(rate_limit, rate_limit_refresh));

    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(state)
        .merge(sign_in)
        .merge(refresh)
}

#[derive(Deserialize, Default)]
struct LoginRequest {
    email: Option<String>,
}

#[derive(Deserialize, Default)]
struct RegisterRequest {
    name: Option<String>,
    email: Option<String>,
}

#[derive(Serialize)]
struct AuthPayload {
    user: User,
    token: String,
}

#[derive(Serialize)]
struct RefreshPayload {
    token: String,
}

#[derive(Serialize)]
struct LogoutPayload {
    success: bool,
}

/// Parse a JSON body leniently: a missing or malformed body reads as empty.
fn lenient_body<T: for<'de> Deserialize<'de> + Default>(body: &Bytes) -> T {
    serde_json::from_slice(body).unwrap_or_default()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Issue a token pair for `user` and build the success response.
fn start_session(state: &AuthState, user: User, message: &str) -> Result<Response, ApiError> {
    let access = state
        .jwt
        .issue_access(&user.id)
        .issue_err("Failed to issue access token")?;
    let refresh = state
        .jwt
        .issue_refresh(&user.id)
        .issue_err("Failed to issue refresh token")?;

    let cookie = refresh_cookie(&refresh.token, refresh.duration, state.secure_cookies);
    let payload = AuthPayload {
        user,
        token: access.token,
    };

    Ok((
        StatusCode::OK,
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(Envelope::ok(payload, message)),
    )
        .into_response())
}

async fn login(State(state): State<AuthState>, body: Bytes) -> Result<Response, ApiError> {
    let request: LoginRequest = lenient_body(&body);
    let email = non_empty(request.email).ok_or_else(|| ApiError::bad_request("Email is required"))?;

    let user = state.users.find_or_provision(&email);
    info!(user_id = %user.id, "User logged in");

    start_session(&state, user, "Login successful")
}

async fn register(State(state): State<AuthState>, body: Bytes) -> Result<Response, ApiError> {
    let request: RegisterRequest = lenient_body(&body);
    let (Some(name), Some(email)) = (non_empty(request.name), non_empty(request.email)) else {
        return Err(ApiError::bad_request("Name and email are required"));
    };

    let user = state
        .users
        .register(&name, &email)
        .map_err(|_| ApiError::conflict("Email is already registered"))?;
    info!(user_id = %user.id, "User registered");

    start_session(&state, user, "Registration successful")
}

/// Refresh failure: 401 envelope plus a cookie that clears the refresh token.
fn refresh_rejected(secure: bool) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        AppendHeaders([(SET_COOKIE, clear_refresh_cookie(secure))]),
        Json(Envelope::<()>::failure(
            StatusCode::UNAUTHORIZED.as_u16(),
            "Refresh token is invalid or expired",
        )),
    )
        .into_response()
}

/// Exchange the refresh cookie for a new access token, rotating the cookie.
/// Reads nothing but the cookie: no body, no bearer header.
///
/// Refresh tokens are not tracked server side, so a rotated-out token stays
/// valid until it expires. Two contexts racing on the same cookie both
/// succeed; neither is forced out.
async fn refresh(State(state): State<AuthState>, headers: HeaderMap) -> Result<Response, ApiError> {
    let subject = get_cookie(&headers, REFRESH_COOKIE_NAME)
        .filter(|token| !token.is_empty())
        .and_then(|token| state.jwt.verify(token, TokenType::Refresh).ok());

    let Some(subject) = subject else {
        warn!("Refresh rejected");
        return Ok(refresh_rejected(state.secure_cookies));
    };

    if state.users.get(&subject).is_none() {
        warn!(user_id = %subject, "Refresh for unknown user");
        return Ok(refresh_rejected(state.secure_cookies));
    }

    let access = state
        .jwt
        .issue_access(&subject)
        .issue_err("Failed to issue access token")?;
    let rotated = state
        .jwt
        .issue_refresh(&subject)
        .issue_err("Failed to issue refresh token")?;

    let cookie = refresh_cookie(&rotated.token, rotated.duration, state.secure_cookies);

    Ok((
        StatusCode::OK,
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(Envelope::ok(
            RefreshPayload {
                token: access.token,
            },
            "Token refreshed",
        )),
    )
        .into_response())
}

/// Clear the refresh cookie. Always succeeds.
async fn logout(State(state): State<AuthState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        AppendHeaders([(SET_COOKIE, clear_refresh_cookie(state.secure_cookies))]),
        Json(Envelope::ok(LogoutPayload { success: true }, "Logged out")),
    )
}

async fn me(BearerAuth(user): BearerAuth) -> impl IntoResponse {
    Json(Envelope::ok(user, "OK"))
}
