//! In-memory user directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Public profile of a user. Also the client-side display snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: String,
}

/// Id of the user every fresh directory starts with.
pub const SEED_USER_ID: &str = "u1";
/// Email of the seed user.
pub const SEED_USER_EMAIL: &str = "chen@university.edu";

fn seed_user() -> User {
    User {
        id: SEED_USER_ID.to_string(),
        name: "Chen".to_string(),
        email: SEED_USER_EMAIL.to_string(),
        avatar: "https://picsum.photos/200".to_string(),
    }
}

fn avatar_for(seed: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(seed.as_bytes()).collect();
    format!("https://api.dicebear.com/7.x/avataaars/svg?seed={}", encoded)
}

/// Error when registering an email that is already known.
#[derive(Debug, thiserror::Error)]
#[error("email is already registered")]
pub struct EmailTaken;

/// Shared, cloneable user store.
#[derive(Clone)]
pub struct UserDirectory {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl UserDirectory {
    /// Create a directory holding only the seed user.
    pub fn new() -> Self {
        let seed = seed_user();
        let mut users = HashMap::new();
        users.insert(seed.id.clone(), seed);
        Self {
            users: Arc::new(RwLock::new(users)),
        }
    }

    pub fn get(&self, id: &str) -> Option<User> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        users.get(id).cloned()
    }

    /// Return the user with this email, provisioning one named after the
    /// email's local part if none exists.
    pub fn find_or_provision(&self, email: &str) -> User {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(user) = by_email(&users, email) {
            return user.clone();
        }
        let name = email.split('@').next().unwrap_or(email).to_string();
        let user = User {
            id: new_user_id(),
            avatar: avatar_for(&name),
            name,
            email: email.to_string(),
        };
        users.insert(user.id.clone(), user.clone());
        user
    }

    /// Register a new user. Fails if the email is taken.
    pub fn register(&self, name: &str, email: &str) -> Result<User, EmailTaken> {
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if by_email(&users, email).is_some() {
            return Err(EmailTaken);
        }
        let user = User {
            id: new_user_id(),
            name: name.to_string(),
            email: email.to_string(),
            avatar: avatar_for(name),
        };
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }
}

fn by_email<'a>(users: &'a HashMap<String, User>, email: &str) -> Option<&'a User> {
    users.values().find(|u| u.email == email)
}

fn new_user_id() -> String {
    format!("u_{}", uuid::Uuid::new_v4().simple())
}
