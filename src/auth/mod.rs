//! Server-side session credentials.
//!
//! Dual-token system: short-lived access tokens travel as bearer headers and
//! are never stored server side; long-lived refresh tokens travel only as an
//! HTTP-only cookie and are rotated on every refresh.

mod cookie;
mod errors;
mod extractors;
mod ip;
mod state;

pub use cookie::{REFRESH_COOKIE_NAME, clear_refresh_cookie, get_cookie, refresh_cookie};
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{BearerAuth, bearer_token};
pub use ip::{UNKNOWN_CLIENT, extract_client_ip};
pub use state::HasAuthBackend;
