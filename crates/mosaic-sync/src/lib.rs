//! Mosaic client synchronization.
//!
//! Keeps a locally held, optimistically edited game state consistent with
//! a remote authoritative copy:
//! - [`store`]: session and sync state machine, edit/draft arbitration
//! - [`runtime`]: tokio event loop that runs the store's effects
//! - [`remote`]: the remote game service seam and an in-process implementation
//! - [`protocol`]: request/response types exchanged with the service
//! - [`config`]: poll, inactivity, and grace timing

pub mod config;
pub mod protocol;
pub mod remote;
pub mod runtime;
pub mod store;

pub use config::{GraceRelease, SyncConfig};
pub use protocol::{MoveRequest, MoveResponse, StateVariant};
pub use remote::{fetch_with_fallback, InMemoryRemote, RemoteError, RemoteGame};
pub use runtime::{spawn, SyncHandle};
pub use store::{
    should_sync, ConnectionState, Effect, FetchPurpose, GameStateStore, StatusLevel,
    StatusMessage, StoreEvent, StoreSnapshot, SyncError, SyncGate,
};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a `RUST_LOG`-filtered fmt subscriber.
///
/// Returns false if a global subscriber was already set.
pub fn init_tracing() -> bool {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
