//! Optional process-wide [`EventStore`].
//!
//! Prefer passing an `EventStore` explicitly. For code that cannot, one
//! store may be installed once at startup and read from anywhere after.
//! The slot is written only by [`install`]; reads never block.

use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::store::EventStore;

static SHARED: OnceLock<EventStore> = OnceLock::new();

/// Install the process-wide store.
///
/// # Errors
///
/// Returns [`Error::AlreadyInitialized`] if a store was already installed;
/// the existing store is kept.
pub fn install(store: EventStore) -> Result<()> {
    SHARED.set(store).map_err(|_| Error::AlreadyInitialized)?;
    tracing::debug!("shared event store installed");
    Ok(())
}

/// The process-wide store, if one was installed.
pub fn shared() -> Option<&'static EventStore> {
    SHARED.get()
}
