//! Authentication module for managing user sessions.
//!
//! This module provides:
//! - `SessionStore`: the session lifecycle owner (login, register, logout,
//!   profile updates) synchronized with a persisted on-disk mirror
//! - `Session`: the identity/token pair itself
//!
//! Restored sessions are trusted optimistically; the first request the API
//! rejects with a 401 tears them down.

pub mod session;

pub use session::{Session, SessionStore};
