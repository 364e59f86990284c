//! # Repositories
//!
//! One repository per backend feature. Request/response features are traits
//! with an [`ApiClient`](core_network::ApiClient)-backed implementation so
//! hosts and tests can substitute their own; the transfer-backed document and
//! download repositories are concrete.
//!
//! - `AuthRepository` - OTP sign-in, logout and explicit token refresh
//! - `GymsRepository` / `SubscriptionsRepository` - catalog listings
//! - `CheckInRepository` - QR check-in
//! - `DocumentRepository` - multipart document uploads
//! - `DownloadRepository` - file downloads with progress

pub mod auth;
pub mod catalog;
pub mod check_in;
pub mod documents;

pub use auth::{ApiAuthRepository, AuthRepository};
pub use catalog::{ApiGymsRepository, ApiSubscriptionsRepository, GymsRepository, SubscriptionsRepository};
pub use check_in::{ApiCheckInRepository, CheckInRepository};
pub use documents::{DocumentRepository, DownloadRepository};
