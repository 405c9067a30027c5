//! Session persistence and re-authentication
//!
//! Owns the lifecycle of a browser authentication session: load the
//! persisted cookie artifact for an identity, inject it into a fresh
//! browser context, validate with a bounded probe, and fall back to an
//! interactive login (persisting the fresh cookies afterwards).

mod cookies;
mod errors;
mod manager;
mod store;

pub use cookies::{storage_key, CookieDefect, CookieRecord, SameSite, SessionArtifact};
pub use errors::SessionError;
pub use manager::{AuthenticatedSession, Credentials, SessionManager, SiteConfig};
pub use store::{ArtifactStore, FsArtifactStore, MemoryArtifactStore, StoreError};
