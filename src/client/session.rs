//! Session context: who is signed in, as the rest of the app sees it.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::error::GatewayError;
use super::gateway::{Gateway, SessionEvent};
use super::transport::Transport;
use crate::users::User;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    /// Message of the last failed login/register/restore
    pub error: Option<String>,
}

impl SessionState {
    fn signed_in(user: User) -> Self {
        Self {
            user: Some(user),
            is_authenticated: true,
            is_loading: false,
            error: None,
        }
    }

    fn signed_out() -> Self {
        Self {
            user: None,
            is_authenticated: false,
            is_loading: false,
            error: None,
        }
    }
}

/// `data` of a successful login or register call.
#[derive(Debug, Deserialize)]
struct AuthPayload {
    user: User,
    token: String,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    name: &'a str,
    email: &'a str,
}

pub struct Session<T> {
    gateway: Arc<Gateway<T>>,
    state: Arc<watch::Sender<SessionState>>,
}

impl<T> Clone for Session<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            state: self.state.clone(),
        }
    }
}

impl<T: Transport + 'static> Session<T> {
    /// A stored snapshot renders as signed in right away; `restore` then
    /// confirms or revokes it.
    pub fn new(gateway: Arc<Gateway<T>>) -> Self {
        let initial = match gateway.snapshot().load() {
            Some(user) => SessionState::signed_in(user),
            None => SessionState {
                is_loading: true,
                ..SessionState::default()
            },
        };
        let (state, _) = watch::channel(initial);
        Self {
            gateway,
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn gateway(&self) -> &Arc<Gateway<T>> {
        &self.gateway
    }

    /// Revalidate against the server. With no access token in memory the
    /// first call 401s and rides the refresh cookie.
    pub async fn restore(&self) -> Result<User, GatewayError> {
        match self.gateway.get::<User>("/auth/me").await {
            Ok(user) => {
                self.gateway.snapshot().save(&user);
                self.state.send_replace(SessionState::signed_in(user.clone()));
                Ok(user)
            }
            Err(e) => {
                info!(reason = %e, "No session to restore");
                self.forget();
                self.state.send_replace(SessionState::signed_out());
                Err(e)
            }
        }
    }

    pub async fn login(&self, email: &str) -> Result<User, GatewayError> {
        self.mark_loading();
        let result = self
            .gateway
            .post::<AuthPayload, _>("/auth/login", &LoginBody { email })
            .await;
        self.start(result)
    }

    pub async fn register(&self, name: &str, email: &str) -> Result<User, GatewayError> {
        self.mark_loading();
        let result = self
            .gateway
            .post::<AuthPayload, _>("/auth/register", &RegisterBody { name, email })
            .await;
        self.start(result)
    }

    /// Sign out. Local state is cleared even when the server call fails.
    pub async fn logout(&self) {
        if let Err(e) = self
            .gateway
            .post::<serde_json::Value, _>("/auth/logout", &json!({}))
            .await
        {
            warn!(reason = %e, "Logout request failed, clearing local session anyway");
        }
        self.forget();
        self.state.send_replace(SessionState::signed_out());
    }

    /// Drop to signed out whenever the gateway reports an expired session.
    pub fn spawn_expiry_listener(&self) -> JoinHandle<()> {
        let mut events = self.gateway.subscribe();
        let state = self.state.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::Expired { login_path }) => {
                        info!(login_path = %login_path, "Session expired");
                        state.send_replace(SessionState::signed_out());
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    fn mark_loading(&self) {
        self.state.send_modify(|state| {
            state.is_loading = true;
            state.error = None;
        });
    }

    fn start(&self, result: Result<AuthPayload, GatewayError>) -> Result<User, GatewayError> {
        match result {
            Ok(AuthPayload { user, token }) => {
                self.gateway.tokens().set(token);
                self.gateway.snapshot().save(&user);
                info!(user_id = %user.id, "Signed in");
                self.state.send_replace(SessionState::signed_in(user.clone()));
                Ok(user)
            }
            Err(e) => {
                self.state.send_modify(|state| {
                    state.is_loading = false;
                    state.error = Some(e.to_string());
                });
                Err(e)
            }
        }
    }

    fn forget(&self) {
        self.gateway.tokens().clear();
        self.gateway.snapshot().clear();
    }
}
