//! Workspace umbrella crate.
//!
//! Re-exports the `core-service` façade behind the workspace feature flags
//! (`desktop-shims`, `secure-store`) so host applications can depend on a
//! single crate.

#[cfg(any(feature = "desktop-shims", feature = "secure-store"))]
pub use core_service::*;
