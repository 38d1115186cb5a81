//! Edge route guard for page routes.
//!
//! Runs before any page handler and decides from the refresh cookie alone.
//! The access token lives in client memory and is never visible here, so the
//! guard only ever receives a [`RefreshCredential`]. It is a routing
//! convenience: API endpoints enforce authentication on their own.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::debug;

use crate::auth::{REFRESH_COOKIE_NAME, get_cookie};
use crate::jwt::{JwtConfig, TokenType};

/// The refresh cookie value as presented by the browser.
#[derive(Debug, Clone, Copy)]
pub struct RefreshCredential<'a>(&'a str);

impl<'a> RefreshCredential<'a> {
    /// Read the credential from request headers. Only the refresh cookie is
    /// consulted.
    pub fn from_headers(headers: &'a axum::http::HeaderMap) -> Option<Self> {
        get_cookie(headers, REFRESH_COOKIE_NAME)
            .filter(|v| !v.is_empty())
            .map(RefreshCredential)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// Requires a session (e.g. the dashboard)
    Protected,
    /// Only for visitors without a session (login, register)
    AuthOnly,
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Send to the login page, remembering where the visitor was going
    RedirectToLogin { from: String },
    /// Already signed in, send to the dashboard
    RedirectToHome,
}

/// Which paths are protected or auth-only, and where to redirect.
#[derive(Debug, Clone)]
pub struct RouteGuardConfig {
    /// A path matches when equal to a prefix or nested below it
    pub protected_prefixes: Vec<String>,
    /// Exact matches only
    pub auth_only_paths: Vec<String>,
    pub login_path: String,
    pub home_path: String,
}

impl Default for RouteGuardConfig {
    fn default() -> Self {
        Self {
            protected_prefixes: vec!["/dashboard".to_string()],
            auth_only_paths: vec!["/login".to_string(), "/register".to_string()],
            login_path: "/login".to_string(),
            home_path: "/dashboard".to_string(),
        }
    }
}

pub struct RouteGuard {
    jwt: Arc<JwtConfig>,
    config: RouteGuardConfig,
}

impl RouteGuard {
    pub fn new(jwt: Arc<JwtConfig>, config: RouteGuardConfig) -> Self {
        Self { jwt, config }
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        let protected = self.config.protected_prefixes.iter().any(|prefix| {
            path.strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        });
        if protected {
            RouteClass::Protected
        } else if self.config.auth_only_paths.iter().any(|p| p == path) {
            RouteClass::AuthOnly
        } else {
            RouteClass::Public
        }
    }

    /// Apply the decision table for an already-classified request.
    pub fn decide(&self, path: &str, class: RouteClass, authenticated: bool) -> GuardDecision {
        match (class, authenticated) {
            (RouteClass::Protected, false) => GuardDecision::RedirectToLogin {
                from: path.to_string(),
            },
            (RouteClass::AuthOnly, true) => GuardDecision::RedirectToHome,
            _ => GuardDecision::Allow,
        }
    }

    /// Decide for `path` given the (optional) refresh credential.
    pub fn check(&self, path: &str, credential: Option<RefreshCredential<'_>>) -> GuardDecision {
        let class = self.classify(path);
        if class == RouteClass::Public {
            return GuardDecision::Allow;
        }

        let authenticated = credential
            .is_some_and(|RefreshCredential(token)| {
                self.jwt.verify(token, TokenType::Refresh).is_ok()
            });

        self.decide(path, class, authenticated)
    }

    /// Login URL carrying `from` as a single query value. Slashes stay
    /// literal; `&`, `=`, `+` and the like are percent-encoded.
    fn login_redirect(&self, from: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(from.as_bytes()).collect();
        format!(
            "{}?from={}",
            self.config.login_path,
            encoded.replace("%2F", "/")
        )
    }
}

/// Middleware applying the route guard to page routes.
pub async fn route_guard(
    State(guard): State<Arc<RouteGuard>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let credential = RefreshCredential::from_headers(request.headers());

    match guard.check(&path, credential) {
        GuardDecision::Allow => next.run(request).await,
        GuardDecision::RedirectToLogin { from } => {
            debug!(path = %path, "Guest on protected page, redirecting to login");
            Redirect::temporary(&guard.login_redirect(&from)).into_response()
        }
        GuardDecision::RedirectToHome => {
            debug!(path = %path, "Signed-in visitor on auth page, redirecting home");
            Redirect::temporary(&guard.config.home_path).into_response()
        }
    }
}
