//! Axum extractors for authentication.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use crate::jwt::TokenType;
use crate::users::User;

/// Read the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Extractor for endpoints that require a valid access token.
///
/// Only the bearer header is consulted. There is no silent fallback to the
/// refresh cookie here: recovering from an expired access token is the
/// client's job, through `/auth/refresh`.
pub struct BearerAuth(pub User);

impl<S> FromRequestParts<S> for BearerAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers).ok_or(AuthErrorKind::MissingToken)?;

        let subject = state
            .jwt()
            .verify(token, TokenType::Access)
            .map_err(|_| AuthErrorKind::InvalidToken)?;

        let user = state
            .users()
            .get(&subject)
            .ok_or(AuthErrorKind::UserNotFound)?;

        Ok(BearerAuth(user))
    }
}
