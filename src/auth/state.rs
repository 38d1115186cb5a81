//! Authentication state traits and macro.

use crate::jwt::JwtConfig;
use crate::users::UserDirectory;

/// Trait for state types that provide token verification and user lookup.
pub trait HasAuthBackend {
    fn jwt(&self) -> &JwtConfig;
    fn users(&self) -> &UserDirectory;
}

/// Implement `HasAuthBackend` for a state struct with `jwt: Arc<JwtConfig>`
/// and `users: UserDirectory` fields.
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn jwt(&self) -> &$crate::jwt::JwtConfig {
                &self.jwt
            }
            fn users(&self) -> &$crate::users::UserDirectory {
                &self.users
            }
        }
    };
}
