//! The request gateway: every API call of the client goes through here.
//!
//! Calls are stamped with the current access token. A 401 starts (or joins)
//! the single refresh cycle, after which the call is replayed exactly once.
//! Callers never see a bare 401.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::error::GatewayError;
use super::pipeline::{Outcome, classify, decode, refreshed_token, stamp};
use super::refresh::{RefreshCoordinator, RefreshLease, RefreshOutcome, Ticket};
use super::snapshot::SnapshotCache;
use super::token_store::TokenStore;
use super::transport::{ApiRequest, Method, RawResponse, Transport};

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Path of the refresh endpoint, relative to the API base.
    pub refresh_path: String,
    /// Login entry point the application should navigate to on expiry.
    pub login_path: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            refresh_path: "/auth/refresh".to_string(),
            login_path: "/login".to_string(),
        }
    }
}

/// Signals the gateway raises outside of the call that triggered them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session is gone; the application should navigate to `login_path`.
    Expired { login_path: String },
}

pub struct Gateway<T> {
    transport: T,
    tokens: TokenStore,
    snapshot: SnapshotCache,
    refresh: RefreshCoordinator,
    events: broadcast::Sender<SessionEvent>,
    config: GatewayConfig,
}

impl<T: Transport> Gateway<T> {
    pub fn new(transport: T, snapshot: SnapshotCache) -> Self {
        Self::with_config(transport, snapshot, GatewayConfig::default())
    }

    pub fn with_config(transport: T, snapshot: SnapshotCache, config: GatewayConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport,
            tokens: TokenStore::new(),
            snapshot,
            refresh: RefreshCoordinator::new(),
            events,
            config,
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn snapshot(&self) -> &SnapshotCache {
        &self.snapshot
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn request<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<R, GatewayError> {
        let mut request = ApiRequest::new(method, path);
        request.body = body;
        let response = self.execute(request).await?;
        decode(&response)
    }

    pub async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, GatewayError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post<R, B>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(encode(body)?)).await
    }

    pub async fn put<R, B>(&self, path: &str, body: &B) -> Result<R, GatewayError>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, path, Some(encode(body)?)).await
    }

    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R, GatewayError> {
        self.request(Method::DELETE, path, None).await
    }

    async fn execute(&self, request: ApiRequest) -> Result<RawResponse, GatewayError> {
        let sent_with = self.tokens.get();
        let response = self
            .transport
            .send(&stamp(&request, sent_with.clone()))
            .await?;
        if let Outcome::Completed(response) = classify(response) {
            return Ok(response);
        }

        let token = self.recover(sent_with.as_deref()).await?;

        let replayed = self.transport.send(&stamp(&request, Some(token))).await?;
        match classify(replayed) {
            Outcome::Completed(response) => Ok(response),
            Outcome::Unauthorized => {
                warn!(path = %request.path, "Replayed request rejected again");
                self.expire_session();
                Err(GatewayError::SessionExpired)
            }
        }
    }

    /// Obtain the token to replay with after a 401.
    async fn recover(&self, sent_with: Option<&str>) -> Result<String, GatewayError> {
        loop {
            match self.refresh.begin(sent_with, || self.tokens.get()) {
                Ticket::Current(token) => return Ok(token),
                Ticket::Leader(lease) => return self.lead_refresh(lease).await,
                Ticket::Waiter(rx) => match rx.await {
                    Ok(RefreshOutcome::Refreshed(token)) => return Ok(token),
                    Ok(RefreshOutcome::Failed) => return Err(GatewayError::SessionExpired),
                    // Leader was cancelled before settling
                    Err(_) => continue,
                },
            }
        }
    }

    async fn lead_refresh(&self, lease: RefreshLease) -> Result<String, GatewayError> {
        debug!("Access token rejected, refreshing");

        // The refresh credential travels as a cookie; no bearer, no body
        let request = ApiRequest::new(Method::POST, self.config.refresh_path.clone());
        let token = match self.transport.send(&request).await {
            Ok(response) => refreshed_token(&response),
            Err(e) => {
                warn!(reason = %e, "Refresh request failed");
                None
            }
        };

        match token {
            Some(token) => {
                self.tokens.set(token.clone());
                let resumed = lease.settle(RefreshOutcome::Refreshed(token.clone()));
                debug!(resumed, "Access token refreshed");
                Ok(token)
            }
            None => {
                warn!("Refresh rejected, session expired");
                self.expire_session();
                lease.settle(RefreshOutcome::Failed);
                Err(GatewayError::SessionExpired)
            }
        }
    }

    fn expire_session(&self) {
        self.tokens.clear();
        self.snapshot.clear();
        // No subscribers is fine
        let _ = self.events.send(SessionEvent::Expired {
            login_path: self.config.login_path.clone(),
        });
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<serde_json::Value, GatewayError> {
    serde_json::to_value(body).map_err(|e| GatewayError::InvalidBody(e.to_string()))
}
