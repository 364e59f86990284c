//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the networking core:
//! - Logging and tracing setup
//! - Configuration (`CoreConfig`, API environments, app metadata)
//! - Event bus for session and transfer lifecycle events
//!
//! Every other workspace crate depends on this one for its logging
//! conventions and shared configuration.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{ApiEnvironment, AppMetadata, CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use events::{AuthEvent, CoreEvent, EventBus, TransferEvent, TransferKind};
