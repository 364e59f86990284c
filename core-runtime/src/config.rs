//! # Core Configuration Module
//!
//! Provides configuration management for the networking core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds every dependency and setting the core needs. It
//! enforces fail-fast validation so that a missing bridge is reported at
//! startup rather than on the first request.
//!
//! ## Required Dependencies
//!
//! - `SettingsStore` - Persists the serialized session record
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest)
//! - `SecureStore` - Durable token storage, only when
//!   [`persist_tokens_securely`](CoreConfigBuilder::persist_tokens_securely)
//!   is enabled (desktop default: OS keychain)
//! - `Clock` - Time source (default: system clock)
//!
//! When the `desktop-shims` feature is enabled, desktop-ready defaults are
//! injected automatically if not provided. The default `SettingsStore` lives
//! in `settings.db` under [`data_dir`](CoreConfigBuilder::data_dir).
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{ApiEnvironment, CoreConfig};
//!
//! let config = CoreConfig::builder()
//!     .environment(ApiEnvironment::Staging)
//!     .data_dir("/path/to/app-data")
//!     .build()?;
//! ```
//!
//! ```ignore
//! let config = CoreConfig::builder()
//!     .base_url("http://localhost:3000/api/v1/")
//!     .http_client(Arc::new(MyHttpClient))
//!     .settings_store(Arc::new(MySettingsStore))
//!     .retry_policy(RetryPolicy::new(5, Duration::from_millis(250)))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::logging::Redactor;
use bridge_traits::{Clock, HttpClient, RetryPolicy, SecureStore, SettingsStore, SystemClock};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default timeout applied by the transport to every request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default capacity of the event bus.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

/// Locale reported when the host environment does not provide one.
pub const FALLBACK_LOCALE: &str = "en_US";

/// Deployment target of the backend API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiEnvironment {
    #[default]
    Production,
    Staging,
    Development,
}

impl ApiEnvironment {
    /// Base address that endpoint paths are resolved against.
    pub fn base_url(&self) -> &'static str {
        match self {
            ApiEnvironment::Production => "https://api.onepazz.com",
            ApiEnvironment::Staging => "https://staging-api.onepazz.com",
            ApiEnvironment::Development => "http://178.128.62.16:3000/api/v1",
        }
    }
}

/// Client identity sent in the `base` block of every JSON request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMetadata {
    pub app_version: String,
    pub platform: String,
    pub locale: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            platform: std::env::consts::OS.to_string(),
            locale: locale_from_env(std::env::var("LANG").ok().as_deref()),
        }
    }
}

impl AppMetadata {
    pub fn new(
        app_version: impl Into<String>,
        platform: impl Into<String>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            app_version: app_version.into(),
            platform: platform.into(),
            locale: locale.into(),
        }
    }
}

/// Derive a locale identifier from a POSIX `LANG` value such as
/// `de_DE.UTF-8`.
pub fn locale_from_env(lang: Option<&str>) -> String {
    lang.and_then(|value| value.split(['.', '@']).next())
        .map(str::trim)
        .filter(|locale| !locale.is_empty() && *locale != "C" && *locale != "POSIX")
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_LOCALE.to_string())
}

/// Core configuration for the networking core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Base address endpoints are resolved against
    pub base_url: Url,

    /// Environment the base address came from, if it was not set explicitly
    pub environment: Option<ApiEnvironment>,

    /// Identity sent with every JSON request
    pub app_metadata: AppMetadata,

    /// Transport-level timeout for each request
    pub request_timeout: Duration,

    /// Backoff used by the transfer engine
    pub retry_policy: RetryPolicy,

    /// HTTP client for making API requests
    pub http_client: Arc<dyn HttpClient>,

    /// Durable secret storage; present whenever tokens are persisted securely
    pub secure_store: Option<Arc<dyn SecureStore>>,

    /// Key-value storage for the session record (required)
    pub settings_store: Arc<dyn SettingsStore>,

    /// Time source for session expiry
    pub clock: Arc<dyn Clock>,

    /// Capacity of the event bus
    pub event_buffer_size: usize,

    /// Keep tokens in the secure store instead of process memory
    pub persist_tokens_securely: bool,

    /// Redaction applied to request details in debug logs
    pub log_redaction: Redactor,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("base_url", &self.base_url.as_str())
            .field("environment", &self.environment)
            .field("app_metadata", &self.app_metadata)
            .field("request_timeout", &self.request_timeout)
            .field("retry_policy", &self.retry_policy)
            .field("http_client", &"HttpClient { ... }")
            .field(
                "secure_store",
                &self.secure_store.as_ref().map(|_| "SecureStore { ... }"),
            )
            .field("settings_store", &"SettingsStore { ... }")
            .field("event_buffer_size", &self.event_buffer_size)
            .field("persist_tokens_securely", &self.persist_tokens_securely)
            .field("log_redaction", &self.log_redaction)
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - The base URL is an absolute http(s) URL that can carry a path
    /// - Timeout and event buffer are non-zero
    /// - A secure store exists when secure token persistence is requested
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.base_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Base URL must use http or https, got '{}'",
                self.base_url.scheme()
            )));
        }

        if self.base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Base URL '{}' cannot have paths appended",
                self.base_url
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        if self.persist_tokens_securely && self.secure_store.is_none() {
            return Err(secure_store_missing_error());
        }

        Ok(())
    }
}

fn secure_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SecureStore".to_string(),
        message: "SecureStore implementation is required when tokens are persisted securely. \
                 Desktop: enable the 'desktop-shims' feature to use the default KeyringSecureStore. \
                 Mobile: inject platform-native secure storage (Keychain/Keystore)."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client implementation provided. \
                 Desktop: enable the 'desktop-shims' feature to use the default ReqwestHttpClient. \
                 Mobile: inject platform-native adapter."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for session persistence. \
                 Desktop: enable the 'desktop-shims' feature and set a data directory to use the default SqliteSettingsStore. \
                 Mobile: inject platform-native settings (UserDefaults/DataStore)."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::with_timeout(timeout).map_err(|e| Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: e.to_string(),
    })?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_timeout: Duration) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(all(feature = "desktop-shims", feature = "secure-store"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    use bridge_desktop::KeyringSecureStore;

    Ok(Arc::new(KeyringSecureStore::new()))
}

#[cfg(not(all(feature = "desktop-shims", feature = "secure-store")))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(secure_store_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(data_dir: Option<&Path>) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;
    use std::thread;
    use tokio::runtime::{Builder, Handle};

    let data_dir = data_dir.ok_or_else(|| {
        Error::Config(
            "A data directory is required for the default SettingsStore. \
             Use .data_dir() or inject a SettingsStore."
                .to_string(),
        )
    })?;
    let path = data_dir.join("settings.db");

    let init_store = |path: PathBuf| -> Result<SqliteSettingsStore> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                Error::Internal(format!(
                    "Failed to create Tokio runtime for default settings store: {}",
                    e
                ))
            })?;

        runtime
            .block_on(SqliteSettingsStore::new(path))
            .map_err(|e| {
                Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
            })
    };

    // block_on panics inside a runtime, so hop to a plain thread there
    let store = match Handle::try_current() {
        Ok(_) => thread::spawn(move || init_store(path)).join().map_err(|_| {
            Error::Internal("Thread panicked while creating default SettingsStore".to_string())
        })??,
        Err(_) => init_store(path)?,
    };

    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_data_dir: Option<&Path>) -> Result<Arc<dyn SettingsStore>> {
    Err(settings_store_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Call [`build()`](CoreConfigBuilder::build) once every option is set. The
/// builder fills platform defaults where allowed and reports missing
/// capabilities with actionable messages.
#[derive(Default)]
pub struct CoreConfigBuilder {
    environment: Option<ApiEnvironment>,
    base_url: Option<String>,
    app_metadata: Option<AppMetadata>,
    request_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    clock: Option<Arc<dyn Clock>>,
    data_dir: Option<PathBuf>,
    event_buffer_size: Option<usize>,
    persist_tokens_securely: bool,
    log_redaction: Option<Redactor>,
}

impl CoreConfigBuilder {
    /// Selects one of the known backend deployments.
    ///
    /// Ignored when [`base_url`](Self::base_url) is also set.
    pub fn environment(mut self, environment: ApiEnvironment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Sets an explicit base address, overriding the environment.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the identity sent in the `base` block of JSON bodies.
    ///
    /// Default: crate version, host OS, locale from `LANG`
    pub fn app_metadata(mut self, metadata: AppMetadata) -> Self {
        self.app_metadata = Some(metadata);
        self
    }

    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Default: 3 retries, 500 ms base delay
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be used when
    /// the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the secure store implementation.
    ///
    /// Only consulted when tokens are persisted securely.
    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    /// Sets the settings store implementation (required unless the desktop
    /// default can be created).
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Overrides the time source. Tests use this to control session expiry.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Directory for the default SQLite settings database.
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Default: 100 events
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Keep access and refresh tokens in the secure store so they survive a
    /// restart.
    ///
    /// Default: false (tokens live in process memory)
    pub fn persist_tokens_securely(mut self, enabled: bool) -> Self {
        self.persist_tokens_securely = enabled;
        self
    }

    /// Sets how request details are redacted in logs, usually
    /// [`LoggingConfig::redactor`](crate::logging::LoggingConfig::redactor).
    ///
    /// Default: PII redacted
    pub fn log_redaction(mut self, redactor: Redactor) -> Self {
        self.log_redaction = Some(redactor);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when the base URL does not parse or a value is
    ///   out of range
    /// - [`Error::CapabilityMissing`] when a required bridge is absent and no
    ///   platform default is available
    pub fn build(self) -> Result<CoreConfig> {
        let base_url = match &self.base_url {
            Some(raw) => Url::parse(raw)
                .map_err(|e| Error::Config(format!("Invalid base URL '{}': {}", raw, e)))?,
            None => {
                let environment = self.environment.unwrap_or_default();
                Url::parse(environment.base_url()).map_err(|e| {
                    Error::Internal(format!("Invalid built-in URL for {:?}: {}", environment, e))
                })?
            }
        };
        let environment = match self.base_url {
            Some(_) => None,
            None => Some(self.environment.unwrap_or_default()),
        };

        let request_timeout = self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(request_timeout)?,
        };

        let secure_store = match (self.secure_store, self.persist_tokens_securely) {
            (Some(store), _) => Some(store),
            (None, true) => Some(provide_default_secure_store()?),
            (None, false) => None,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(self.data_dir.as_deref())?,
        };

        let config = CoreConfig {
            base_url,
            environment,
            app_metadata: self.app_metadata.unwrap_or_default(),
            request_timeout,
            retry_policy: self.retry_policy.unwrap_or_default(),
            http_client,
            secure_store,
            settings_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            persist_tokens_securely: self.persist_tokens_securely,
            log_redaction: self.log_redaction.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}
