//! Signed access and refresh token issuing and verification.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::error::ConfigError;

/// Token type tag carried in the `typ` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived bearer credential, held in client memory only
    Access,
    /// Long-lived credential, transported as an HTTP-only cookie
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
        }
    }
}

/// JWT claims shared by both token types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Unique token id, so two tokens minted in the same second still differ
    pub jti: String,
    /// Subject (user id)
    pub sub: String,
    /// Token type
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Access token lifetime: 15 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 15 * 60;

/// Refresh token lifetime: 7 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT string
    pub token: String,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
    /// Lifetime in seconds
    pub duration: u64,
}

/// Signing keys and token lifetimes.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_duration: u64,
    refresh_duration: u64,
}

impl JwtConfig {
    /// Create a JWT configuration from a signing secret.
    /// An empty secret is a configuration error.
    pub fn new(secret: &[u8]) -> Result<Self, ConfigError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_duration: ACCESS_TOKEN_DURATION_SECS,
            refresh_duration: REFRESH_TOKEN_DURATION_SECS,
        })
    }

    /// Override the access token lifetime.
    pub fn with_access_duration(mut self, secs: u64) -> Self {
        self.access_duration = secs;
        self
    }

    /// Override the refresh token lifetime.
    pub fn with_refresh_duration(mut self, secs: u64) -> Self {
        self.refresh_duration = secs;
        self
    }

    pub fn refresh_duration(&self) -> u64 {
        self.refresh_duration
    }

    /// Sign a short-lived access token for `subject`.
    pub fn issue_access(&self, subject: &str) -> Result<IssuedToken, IssueError> {
        self.issue(subject, TokenType::Access, self.access_duration)
    }

    /// Sign a long-lived refresh token for `subject`.
    pub fn issue_refresh(&self, subject: &str) -> Result<IssuedToken, IssueError> {
        self.issue(subject, TokenType::Refresh, self.refresh_duration)
    }

    fn issue(
        &self,
        subject: &str,
        token_type: TokenType,
        duration: u64,
    ) -> Result<IssuedToken, IssueError> {
        let now = unix_now().ok_or(IssueError::Time)?;
        let exp = now + duration;

        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: subject.to_string(),
            token_type,
            iat: now,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(IssueError::Encoding)?;

        Ok(IssuedToken {
            token,
            issued_at: now,
            expires_at: exp,
            duration,
        })
    }

    /// Verify signature, expiry and type tag, returning the subject.
    ///
    /// Every failure collapses to [`Unauthorized`]; the underlying reason is
    /// only logged.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<String, Unauthorized> {
        self.verify_claims(token, expected)
            .map(|claims| claims.sub)
            .map_err(|reason| {
                debug!(%reason, expected = %expected, "Token rejected");
                Unauthorized
            })
    }

    fn verify_claims(&self, token: &str, expected: TokenType) -> Result<Claims, VerifyFailure> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => VerifyFailure::Expired,
                _ => VerifyFailure::InvalidToken,
            })?;

        if data.claims.token_type != expected {
            return Err(VerifyFailure::WrongType);
        }

        Ok(data.claims)
    }
}

fn unix_now() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}

/// Internal verification failure kinds. Never surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
enum VerifyFailure {
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    Expired,
    #[error("wrong token type")]
    WrongType,
}

/// The only verification error callers see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unauthorized")]
pub struct Unauthorized;

/// Errors while signing a token.
#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("failed to encode token: {0}")]
    Encoding(jsonwebtoken::errors::Error),
    #[error("system time error")]
    Time,
}
