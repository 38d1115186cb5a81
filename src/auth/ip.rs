//! Client IP extraction utilities.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request};

/// Key used when no client address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Extract the client IP address for rate limiting.
///
/// With `trust_proxy` the first `X-Forwarded-For` entry wins. Otherwise the
/// socket address from `ConnectInfo` is used. Requests with neither share the
/// [`UNKNOWN_CLIENT`] key.
pub fn extract_client_ip<B>(request: &Request<B>, trust_proxy: bool) -> String {
    if trust_proxy {
        let forwarded = request
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_forwarded(value: &str) -> Request<Body> {
        Request::builder()
            .header("x-forwarded-for", value)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_forwarded_for_used_when_trusted() {
        let request = request_with_forwarded("10.0.0.1, 192.168.1.1");
        assert_eq!(extract_client_ip(&request, true), "10.0.0.1");
    }

    #[test]
    fn test_forwarded_for_ignored_when_untrusted() {
        let request = request_with_forwarded("10.0.0.1");
        assert_eq!(extract_client_ip(&request, false), UNKNOWN_CLIENT);
    }

    #[test]
    fn test_connect_info_fallback() {
        let mut request = Request::builder().body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));
        assert_eq!(extract_client_ip(&request, true), "127.0.0.1");
    }
}
