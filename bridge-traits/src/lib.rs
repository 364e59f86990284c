//! # Host Bridge Traits
//!
//! Capability contracts the networking core requires from its host.
//!
//! ## Overview
//!
//! This crate defines the contract between the core library and
//! platform-specific implementations. Each trait represents a capability that
//! the core requires but that is implemented differently per platform.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Single-shot execution plus streamed
//!   upload and download
//! - [`RetryPolicy`](http::RetryPolicy) - Backoff computation used by the
//!   transfer engine
//!
//! ### Security & Storage
//! - [`SecureStore`](storage::SecureStore) - Credential persistence (Keychain/Keystore)
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//! | Mobile   | injected by host    |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! let http_client = config.http_client
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "HttpClient".to_string(),
//!         message: "No HTTP client implementation provided.".to_string(),
//!     })?;
//! ```
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so adapters can be shared
//! behind `Arc` across async tasks.

pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{
    ByteStream, DownloadResponse, HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy,
};
pub use storage::{SecureStore, SettingsStore};
pub use time::{Clock, FixedClock, LogLevel, SystemClock};
