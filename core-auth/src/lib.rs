//! # Authentication Module
//!
//! Token storage and session ownership for the HTTP client core.
//!
//! ## Overview
//!
//! - [`TokenStore`] holds the access/refresh pair read by every request, with
//!   an in-memory backing ([`InMemoryTokenStore`]) and a secure-store backing
//!   ([`SecureTokenStore`]) that survives restarts.
//! - [`SessionManager`] owns the single [`AuthSession`], persists it in the
//!   settings store, drops it at startup once expired and publishes changes
//!   through a `watch` channel and the event bus.

pub mod error;
pub mod session;
pub mod token_store;
pub mod types;

pub use error::{AuthError, Result};
pub use session::SessionManager;
pub use token_store::{InMemoryTokenStore, SecureTokenStore, TokenStore};
pub use types::{AuthSession, Tokens, User, SESSION_LIFETIME_SECS, SESSION_STORAGE_KEY};
