//! # pavilion-client
//!
//! Session facade of the Pavilion sync core.  Wires the REST client, the
//! identity cache and the push connection together for one authenticated
//! user, keeps the reconciliation state (`pavilion-sync`) current, and
//! notifies the UI layer through a [`ClientEvent`] channel.  The UI never
//! mutates state directly; it calls session operations and re-reads
//! snapshots when events arrive.

mod bridge;

pub mod events;
pub mod identity;
pub mod session;
pub mod state;

use tracing_subscriber::{fmt, EnvFilter};

pub use events::ClientEvent;
pub use identity::{IdentityCache, ProfileFetchFn};
pub use session::{Session, SessionConfig};
pub use state::SessionState;

/// Initialise tracing for binaries and examples embedding the client.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("pavilion_client=debug,pavilion_api=debug,pavilion_sync=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
