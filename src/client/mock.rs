//! Scripted in-process transport for client tests.

use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::transport::{ApiRequest, Method, RawResponse, StatusCode, Transport, TransportError};

/// Pretends to be the auth API. Accepts exactly one access token at a time;
/// a successful refresh replaces it with `fresh-<n>`.
pub(crate) struct MockTransport {
    valid_token: Mutex<String>,
    refresh_ok: bool,
    refresh_delay: Duration,
    sign_in_delay: Duration,
    logout_ok: AtomicBool,
    refresh_calls: AtomicUsize,
    log: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub(crate) const INITIAL_TOKEN: &'static str = "access-0";

    pub(crate) fn new() -> Self {
        Self {
            valid_token: Mutex::new(Self::INITIAL_TOKEN.to_string()),
            refresh_ok: true,
            refresh_delay: Duration::from_millis(20),
            sign_in_delay: Duration::ZERO,
            logout_ok: AtomicBool::new(true),
            refresh_calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_refresh(mut self) -> Self {
        self.refresh_ok = false;
        self
    }

    /// Delay login and register responses, keeping them in flight.
    pub(crate) fn slow_sign_in(mut self, delay: Duration) -> Self {
        self.sign_in_delay = delay;
        self
    }

    pub(crate) fn failing_logout(self) -> Self {
        self.logout_ok.store(false, Ordering::SeqCst);
        self
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// Bearer tokens of every request sent to `path`, in send order.
    pub(crate) fn bearers_for(&self, path: &str) -> Vec<Option<String>> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.path == path)
            .map(|request| request.bearer.clone())
            .collect()
    }

    pub(crate) fn user() -> Value {
        json!({
            "id": "u1",
            "name": "Chen",
            "email": "chen@university.edu",
            "avatar": "https://picsum.photos/200",
        })
    }

    fn authorized(&self, request: &ApiRequest) -> bool {
        request.bearer.as_deref() == Some(self.valid_token.lock().unwrap().as_str())
    }

    async fn refresh(&self) -> RawResponse {
        let n = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.refresh_delay).await;

        if !self.refresh_ok {
            return unauthorized();
        }
        let token = format!("fresh-{}", n);
        *self.valid_token.lock().unwrap() = token.clone();
        ok(json!({ "token": token }))
    }
}

fn envelope(status: StatusCode, body: Value) -> RawResponse {
    RawResponse {
        status,
        body: serde_json::to_vec(&body).unwrap(),
    }
}

fn ok(data: Value) -> RawResponse {
    envelope(
        StatusCode::OK,
        json!({ "code": 200, "data": data, "message": "ok" }),
    )
}

fn unauthorized() -> RawResponse {
    envelope(
        StatusCode::UNAUTHORIZED,
        json!({ "code": 401, "data": null, "message": "Token is invalid or expired" }),
    )
}

impl Transport for MockTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse, TransportError> {
        self.log.lock().unwrap().push(request.clone());

        let post = request.method == Method::POST;
        let response = match request.path.as_str() {
            "/auth/refresh" if post => self.refresh().await,
            "/auth/login" | "/auth/register" if post => {
                if !self.sign_in_delay.is_zero() {
                    tokio::time::sleep(self.sign_in_delay).await;
                }
                let token = self.valid_token.lock().unwrap().clone();
                ok(json!({ "user": Self::user(), "token": token }))
            }
            "/auth/logout" if post => {
                if !self.logout_ok.load(Ordering::SeqCst) {
                    return Err(TransportError::Connection("connection refused".to_string()));
                }
                ok(json!({ "success": true }))
            }
            "/offline" => return Err(TransportError::Timeout),
            "/always-401" => unauthorized(),
            "/business" => envelope(
                StatusCode::OK,
                json!({ "code": 409, "data": null, "message": "Slot already booked" }),
            ),
            "/auth/me" if self.authorized(request) => ok(Self::user()),
            path if self.authorized(request) => ok(json!({ "path": path })),
            _ => unauthorized(),
        };
        Ok(response)
    }
}
