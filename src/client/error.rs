//! Errors surfaced to callers of the request gateway.

use super::transport::TransportError;

/// Failure of a gateway call. A bare 401 is never among them: expired
/// access tokens are recovered internally or end as `SessionExpired`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// Refresh failed or a replayed call was rejected again. The session is
    /// gone and the user has to sign in.
    #[error("session expired, please sign in again")]
    SessionExpired,
    /// Transport failure (connection, timeout). No effect on the session.
    #[error("network error: {0}")]
    Network(String),
    /// Non-200 business code; `message` is meant for display.
    #[error("{message}")]
    Business { code: u16, message: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("failed to encode request body: {0}")]
    InvalidBody(String),
}

impl From<TransportError> for GatewayError {
    fn from(e: TransportError) -> Self {
        GatewayError::Network(e.to_string())
    }
}
