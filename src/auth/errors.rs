//! Authentication error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::envelope::Envelope;

/// Why a bearer-authenticated request was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    MissingToken,
    InvalidToken,
    UserNotFound,
}

/// API authentication error. Always a 401 envelope with a fixed message so
/// the response never reveals which check failed. The refresh cookie is left
/// alone: the client needs it to recover.
#[derive(Debug)]
pub struct ApiAuthError(pub(super) AuthErrorKind);

impl From<AuthErrorKind> for ApiAuthError {
    fn from(kind: AuthErrorKind) -> Self {
        Self(kind)
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        tracing::debug!(kind = ?self.0, "Bearer authentication failed");
        (
            StatusCode::UNAUTHORIZED,
            Json(Envelope::<()>::failure(
                StatusCode::UNAUTHORIZED.as_u16(),
                "Token is invalid or expired",
            )),
        )
            .into_response()
    }
}
