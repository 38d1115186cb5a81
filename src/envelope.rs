//! The `{code, data, message}` response envelope.
//!
//! Every API response uses this shape. `code == 200` means success no matter
//! what HTTP status carried it; any other code is a business failure whose
//! `message` is meant for display.

use serde::{Deserialize, Serialize};

/// Business code that marks success.
pub const SUCCESS_CODE: u16 = 200;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: u16,
    pub data: Option<T>,
    pub message: String,
}

impl<T> Envelope<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self {
            code: SUCCESS_CODE,
            data: Some(data),
            message: message.into(),
        }
    }

    pub fn failure(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            data: None,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_serializes_null_data() {
        let envelope = Envelope::<()>::failure(401, "Unauthorized");
        let json = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "code": 401, "data": null, "message": "Unauthorized" })
        );
        assert!(!envelope.is_success());
    }

    #[test]
    fn test_parses_success_payload() {
        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"code":200,"data":{"token":"abc"},"message":"ok"}"#)
                .unwrap();

        assert!(envelope.is_success());
        assert_eq!(envelope.data.unwrap()["token"], "abc");
    }
}
