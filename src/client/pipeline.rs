//! Pure request/response transform steps of the gateway.
//!
//! The gateway is `stamp → send → classify → (recover → stamp → send →
//! classify) → decode`. Everything here is free of I/O so each stage can be
//! tested on plain values.

use serde::de::DeserializeOwned;

use super::error::GatewayError;
use super::transport::{ApiRequest, RawResponse, StatusCode};
use crate::envelope::Envelope;

/// Result of classifying a raw response.
#[derive(Debug)]
pub enum Outcome {
    /// HTTP 401: the access token was rejected
    Unauthorized,
    Completed(RawResponse),
}

/// Attach `Authorization: Bearer` from `token`, or strip it when absent.
pub fn stamp(request: &ApiRequest, token: Option<String>) -> ApiRequest {
    ApiRequest {
        bearer: token,
        ..request.clone()
    }
}

pub fn classify(response: RawResponse) -> Outcome {
    if response.status == StatusCode::UNAUTHORIZED {
        Outcome::Unauthorized
    } else {
        Outcome::Completed(response)
    }
}

/// Unwrap the envelope: `data` on business code 200, a business error
/// otherwise. The HTTP status only matters when the body is no envelope.
pub fn decode<T: DeserializeOwned>(response: &RawResponse) -> Result<T, GatewayError> {
    let envelope: Envelope<serde_json::Value> = match serde_json::from_slice(&response.body) {
        Ok(envelope) => envelope,
        Err(e) if response.status.is_success() => {
            return Err(GatewayError::MalformedResponse(e.to_string()));
        }
        Err(_) => {
            return Err(GatewayError::Business {
                code: response.status.as_u16(),
                message: format!("Request failed with status {}", response.status),
            });
        }
    };

    if !envelope.is_success() {
        return Err(GatewayError::Business {
            code: envelope.code,
            message: envelope.message,
        });
    }

    serde_json::from_value(envelope.data.unwrap_or(serde_json::Value::Null))
        .map_err(|e| GatewayError::MalformedResponse(e.to_string()))
}

#[derive(serde::Deserialize)]
struct RefreshData {
    token: String,
}

/// The new access token from a refresh response, if the refresh succeeded.
/// Like any other call, success is the envelope's code, not the HTTP status.
pub fn refreshed_token(response: &RawResponse) -> Option<String> {
    decode::<RefreshData>(response)
        .ok()
        .map(|data| data.token)
        .filter(|token| !token.is_empty())
}
