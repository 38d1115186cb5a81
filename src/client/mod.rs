//! Client side of the session: token store, request gateway with silent
//! refresh, and the session context built on top of it.

mod error;
mod gateway;
mod pipeline;
mod refresh;
mod session;
mod snapshot;
mod token_store;
mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use error::GatewayError;
pub use gateway::{Gateway, GatewayConfig, SessionEvent};
pub use pipeline::{Outcome, classify, decode, refreshed_token, stamp};
pub use refresh::{RefreshCoordinator, RefreshLease, RefreshOutcome, Ticket};
pub use session::{Session, SessionState};
pub use snapshot::SnapshotCache;
pub use token_store::TokenStore;
pub use transport::{
    ApiRequest, HttpTransport, Method, REQUEST_TIMEOUT, RawResponse, StatusCode, Transport,
    TransportError,
};
